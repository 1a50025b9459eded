use serde::{Deserialize, Serialize};

use crate::{
    blob::Blob,
    commit::{Commit, LogEntry},
    error::{Error, Result},
    object_id::ObjectId,
    object_store::ObjectStore,
};

/// A convenience trait for writing and reading JSON records from any [`ObjectStore`].
pub trait InsertJson {
    /// Inserts a pretty JSON encoded version of the thing into the store under `id`.
    fn insert_json<A: Serialize>(&mut self, id: ObjectId, thing: &A) -> Result<()>;

    /// Reads a JSON encoded thing of the given type from the store at that given [`ObjectId`].
    fn read_json<A: for<'de> Deserialize<'de>>(&self, id: ObjectId) -> Result<A>;
}

impl<S> InsertJson for S
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    fn insert_json<A: Serialize>(&mut self, id: ObjectId, thing: &A) -> Result<()> {
        if self.has(id)? {
            log::debug!("{} is already stored", id);
            return Ok(());
        }
        Ok(self.insert(id, &serde_json::to_vec_pretty(thing)?)?)
    }

    fn read_json<A: for<'de> Deserialize<'de>>(&self, id: ObjectId) -> Result<A> {
        match self.read(id)? {
            None => Err(Error::MissingObject(id)),
            Some(obj) => Ok(serde_json::from_slice(&obj)?),
        }
    }
}

/// Blobs and commits, each in their own keyed store.
#[derive(Debug)]
pub struct Objects<S> {
    blobs: S,
    commits: S,
}

impl<S> Objects<S>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    pub fn new(blobs: S, commits: S) -> Self {
        Objects { blobs, commits }
    }

    pub fn put_blob(&mut self, blob: &Blob) -> Result<()> {
        self.blobs.insert_json(blob.id(), blob)
    }

    pub fn blob(&self, id: ObjectId) -> Result<Blob> {
        self.blobs.read_json(id)
    }

    pub fn put_commit(&mut self, commit: &Commit) -> Result<()> {
        self.commits.insert_json(commit.id(), commit)
    }

    pub fn commit(&self, id: ObjectId) -> Result<Commit> {
        self.commits.read_json(id)
    }

    pub fn has_commit(&self, id: ObjectId) -> Result<bool> {
        Ok(self.commits.has(id)?)
    }

    /// Every commit ever stored, in no particular order.
    pub fn commit_ids(&self) -> Result<Vec<ObjectId>> {
        Ok(self.commits.ids()?)
    }

    /// Walks parent links from `from` back to the root, reading each commit
    /// only when the iterator reaches it.
    pub fn history(&self, from: ObjectId) -> History<'_, S> {
        History {
            objects: self,
            next: Some(from),
        }
    }

    /// Whether `ancestor` is reachable from `from` by following parents.
    pub fn is_ancestor(&self, ancestor: ObjectId, from: ObjectId) -> Result<bool> {
        let mut next = Some(from);
        while let Some(id) = next {
            if id == ancestor {
                return Ok(true);
            }
            next = self.commit(id)?.parent();
        }
        Ok(false)
    }
}

/// Iterator returned by [`Objects::history`].
#[derive(Debug)]
pub struct History<'a, S> {
    objects: &'a Objects<S>,
    next: Option<ObjectId>,
}

impl<'a, S> Iterator for History<'a, S>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        Some(self.objects.commit(id).map(|commit| {
            self.next = commit.parent();
            commit.log_entry()
        }))
    }
}

#[cfg(test)]
use crate::object_store::in_memory::InMemoryObjectStore;

#[cfg(test)]
fn in_memory() -> Objects<InMemoryObjectStore> {
    Objects::new(InMemoryObjectStore::new(), InMemoryObjectStore::new())
}

#[test]
fn test_put_then_get() {
    let mut objects = in_memory();
    let blob = Blob::new("f", b"x".to_vec());
    objects.put_blob(&blob).unwrap();
    objects.put_blob(&blob).unwrap();
    assert_eq!(objects.blob(blob.id()).unwrap(), blob);

    let root = Commit::root();
    objects.put_commit(&root).unwrap();
    assert_eq!(objects.commit(root.id()).unwrap(), root);
    assert_eq!(objects.commit_ids().unwrap(), vec![root.id()]);
}

#[test]
fn test_missing_object() {
    let objects = in_memory();
    let id = ObjectId::for_blob("nope", b"");
    assert!(matches!(objects.blob(id), Err(Error::MissingObject(i)) if i == id));
    assert!(matches!(objects.commit(id), Err(Error::MissingObject(_))));
    assert!(!objects.has_commit(id).unwrap());
}

#[test]
fn test_blobs_and_commits_are_separate() {
    let mut objects = in_memory();
    let root = Commit::root();
    objects.put_commit(&root).unwrap();
    assert!(objects.blob(root.id()).is_err());
}

#[test]
fn test_is_ancestor() {
    let mut objects = in_memory();
    let root = Commit::root();
    let child = Commit::new("m1", chrono::Utc::now(), Some(root.id()), Default::default());
    let other = Commit::new("m2", chrono::Utc::now(), Some(root.id()), Default::default());
    for c in [&root, &child, &other] {
        objects.put_commit(c).unwrap();
    }
    assert!(objects.is_ancestor(root.id(), child.id()).unwrap());
    assert!(objects.is_ancestor(child.id(), child.id()).unwrap());
    assert!(!objects.is_ancestor(other.id(), child.id()).unwrap());
    assert!(!objects.is_ancestor(child.id(), root.id()).unwrap());
}

#[test]
fn test_history_walks_to_root() {
    let mut objects = in_memory();
    let root = Commit::root();
    let c1 = Commit::new("m1", chrono::Utc::now(), Some(root.id()), Default::default());
    let c2 = Commit::new("m2", chrono::Utc::now(), Some(c1.id()), Default::default());
    for c in [&root, &c1, &c2] {
        objects.put_commit(c).unwrap();
    }
    let messages: Vec<String> = objects
        .history(c2.id())
        .map(|entry| entry.unwrap().message)
        .collect();
    assert_eq!(messages, vec!["m2", "m1", crate::commit::INITIAL_MESSAGE]);
    // Restartable: a second walk sees the same thing.
    assert_eq!(objects.history(c2.id()).count(), 3);
}

#[test]
fn test_history_reports_missing_parent() {
    let mut objects = in_memory();
    let orphan = Commit::new("m", chrono::Utc::now(), Some(Commit::root().id()), Default::default());
    objects.put_commit(&orphan).unwrap();
    let entries: Vec<Result<LogEntry>> = objects.history(orphan.id()).collect();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].is_ok());
    assert!(matches!(entries[1], Err(Error::MissingObject(_))));
}
