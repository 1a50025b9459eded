use std::{collections::BTreeMap, fmt::Display};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::object_id::ObjectId;

/// Message of the commit every repository starts from.
pub const INITIAL_MESSAGE: &str = "initial commit";

/// A full snapshot of the tracked files at one point in history.
///
/// Commits are immutable: the [`ObjectId`] is computed once from the other
/// fields in [`Commit::new`]. The parent is only ever looked up by id, never
/// owned, so history forms an append-only arena keyed by id.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    id: ObjectId,
    /// The message added with the commit.
    message: String,
    timestamp: DateTime<Utc>,
    /// The previous [`Commit`]'s [`ObjectId`], absent only for the root.
    parent: Option<ObjectId>,
    /// File name to blob id, for every file in the snapshot.
    tracked: BTreeMap<String, ObjectId>,
}

impl Commit {
    /// The parentless commit created by `init`, stamped with the Unix epoch.
    pub fn root() -> Self {
        Self::new(
            INITIAL_MESSAGE,
            DateTime::<Utc>::from(std::time::UNIX_EPOCH),
            None,
            BTreeMap::new(),
        )
    }

    pub fn new(
        message: &str,
        timestamp: DateTime<Utc>,
        parent: Option<ObjectId>,
        tracked: BTreeMap<String, ObjectId>,
    ) -> Self {
        let id = Self::compute_id(message, &timestamp, parent, &tracked);
        Commit {
            id,
            message: String::from(message),
            timestamp,
            parent,
            tracked,
        }
    }

    /// `H(message ‖ timestamp ‖ parent ‖ blob ids in file name order)`.
    pub fn compute_id(
        message: &str,
        timestamp: &DateTime<Utc>,
        parent: Option<ObjectId>,
        tracked: &BTreeMap<String, ObjectId>,
    ) -> ObjectId {
        let timestamp = timestamp.to_rfc3339();
        let parent = parent.map(|p| p.to_string()).unwrap_or_default();
        let blobs: Vec<String> = tracked.values().map(|id| id.to_string()).collect();
        ObjectId::from_parts(
            [message.as_bytes(), timestamp.as_bytes(), parent.as_bytes()]
                .into_iter()
                .chain(blobs.iter().map(|b| b.as_bytes())),
        )
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn tracked(&self) -> &BTreeMap<String, ObjectId> {
        &self.tracked
    }

    /// The blob id recorded for `filename`, if this snapshot tracks it.
    pub fn blob_id(&self, filename: &str) -> Option<ObjectId> {
        self.tracked.get(filename).copied()
    }

    pub fn log_entry(&self) -> LogEntry {
        LogEntry {
            id: self.id,
            timestamp: self.timestamp,
            message: self.message.clone(),
        }
    }
}

/// What `log`, `global-log` show about a single commit.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: ObjectId,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let date = self
            .timestamp
            .with_timezone(&Local)
            .format("%a %b %-d %H:%M:%S %Y %z");
        writeln!(f, "===")?;
        writeln!(f, "commit {}", self.id)?;
        writeln!(f, "Date: {}", date)?;
        writeln!(f, "{}", self.message)
    }
}

#[cfg(test)]
fn at(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from(std::time::UNIX_EPOCH) + chrono::Duration::seconds(secs)
}

#[test]
fn test_root_is_fixed() {
    let root = Commit::root();
    assert_eq!(root, Commit::root());
    assert_eq!(root.parent(), None);
    assert_eq!(root.timestamp().timestamp(), 0);
    assert!(root.tracked().is_empty());
}

#[test]
fn test_id_is_a_function_of_fields() {
    let root = Commit::root();
    let mut tracked = BTreeMap::new();
    tracked.insert(String::from("b"), ObjectId::for_blob("b", b"2"));
    tracked.insert(String::from("a"), ObjectId::for_blob("a", b"1"));
    let commit = Commit::new("m1", at(60), Some(root.id()), tracked.clone());
    assert_eq!(
        commit.id(),
        Commit::compute_id("m1", &at(60), Some(root.id()), &tracked)
    );
    assert_ne!(commit.id(), Commit::new("m2", at(60), Some(root.id()), tracked.clone()).id());
    assert_ne!(commit.id(), Commit::new("m1", at(61), Some(root.id()), tracked.clone()).id());
    assert_ne!(commit.id(), Commit::new("m1", at(60), None, tracked).id());
}

#[test]
fn test_id_survives_serde() {
    let mut tracked = BTreeMap::new();
    tracked.insert(String::from("f"), ObjectId::for_blob("f", b"x"));
    let commit = Commit::new("m", Utc::now(), Some(Commit::root().id()), tracked);
    let json = serde_json::to_vec_pretty(&commit).unwrap();
    let commit_: Commit = serde_json::from_slice(&json).unwrap();
    assert_eq!(commit, commit_);
    assert_eq!(
        commit_.id(),
        Commit::compute_id(
            commit_.message(),
            &commit_.timestamp(),
            commit_.parent(),
            commit_.tracked()
        )
    );
}

#[test]
fn test_log_entry_format() {
    let text = Commit::root().log_entry().to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "===");
    assert_eq!(lines[1], format!("commit {}", Commit::root().id()));
    assert!(lines[2].starts_with("Date: "));
    assert_eq!(lines[3], INITIAL_MESSAGE);
}
