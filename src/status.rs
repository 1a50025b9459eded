use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
};

use crate::{commit::Commit, object_id::ObjectId};

/// How a file differs from what is tracked or staged for it.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Modification {
    Modified,
    Deleted,
}

impl Display for Modification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modification::Modified => write!(f, "modified"),
            Modification::Deleted => write!(f, "deleted"),
        }
    }
}

/// Everything `status` reports.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct Status {
    pub current_branch: String,
    /// Every branch name, sorted.
    pub branches: Vec<String>,
    pub staged: BTreeSet<String>,
    /// Staged removals together with tracked files missing from disk.
    pub removed: BTreeSet<String>,
    pub modified: BTreeMap<String, Modification>,
    pub untracked: BTreeSet<String>,
}

/// Inputs for [`Status::compute`], all keyed by file name.
#[derive(Debug)]
pub struct StatusInputs<'a> {
    pub head: &'a Commit,
    /// Blob id each file on disk would get.
    pub disk: &'a BTreeMap<String, ObjectId>,
    /// Blob id each staged copy has.
    pub staged: &'a BTreeMap<String, ObjectId>,
    pub pending_removal: &'a BTreeSet<String>,
}

impl Status {
    pub fn compute(current_branch: &str, branches: Vec<String>, inputs: StatusInputs<'_>) -> Self {
        let StatusInputs {
            head,
            disk,
            staged,
            pending_removal,
        } = inputs;

        let mut removed = pending_removal.clone();
        removed.extend(
            head.tracked()
                .keys()
                .filter(|name| !disk.contains_key(*name))
                .cloned(),
        );

        let mut modified = BTreeMap::new();
        for (name, tracked_id) in head.tracked() {
            if staged.contains_key(name) {
                continue;
            }
            if matches!(disk.get(name), Some(id) if id != tracked_id) {
                modified.insert(name.clone(), Modification::Modified);
            }
        }
        for (name, staged_id) in staged {
            match disk.get(name) {
                None => {
                    modified.insert(name.clone(), Modification::Deleted);
                }
                Some(id) if id != staged_id => {
                    modified.insert(name.clone(), Modification::Modified);
                }
                Some(_) => {}
            }
        }

        let untracked = disk
            .keys()
            .filter(|name| {
                let unknown = head.blob_id(name).is_none() && !staged.contains_key(*name);
                unknown || pending_removal.contains(*name)
            })
            .cloned()
            .collect();

        Status {
            current_branch: String::from(current_branch),
            branches,
            staged: staged.keys().cloned().collect(),
            removed,
            modified,
            untracked,
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Branches ===")?;
        for branch in &self.branches {
            if *branch == self.current_branch {
                writeln!(f, "*{}", branch)?;
            } else {
                writeln!(f, "{}", branch)?;
            }
        }
        writeln!(f)?;
        writeln!(f, "=== Staged Files ===")?;
        for name in &self.staged {
            writeln!(f, "{}", name)?;
        }
        writeln!(f)?;
        writeln!(f, "=== Removed Files ===")?;
        for name in &self.removed {
            writeln!(f, "{}", name)?;
        }
        writeln!(f)?;
        writeln!(f, "=== Modifications Not Staged For Commit ===")?;
        for (name, modification) in &self.modified {
            writeln!(f, "{} ({})", name, modification)?;
        }
        writeln!(f)?;
        writeln!(f, "=== Untracked Files ===")?;
        for name in &self.untracked {
            writeln!(f, "{}", name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
fn ids(files: &[(&str, &str)]) -> BTreeMap<String, ObjectId> {
    files
        .iter()
        .map(|(name, content)| (name.to_string(), ObjectId::for_blob(name, content.as_bytes())))
        .collect()
}

#[test]
fn test_compute() {
    let head = Commit::new(
        "m",
        chrono::Utc::now(),
        None,
        ids(&[("kept", "k"), ("edited", "e"), ("gone", "g"), ("rmd", "r")]),
    );
    let disk = ids(&[
        ("kept", "k"),
        ("edited", "e2"),
        ("new", "n"),
        ("added", "a2"),
        ("rmd", "back"),
    ]);
    let staged = ids(&[("added", "a"), ("vanished", "v")]);
    let pending_removal: BTreeSet<String> = [String::from("rmd")].into_iter().collect();

    let status = Status::compute(
        "master",
        vec![String::from("master"), String::from("other")],
        StatusInputs {
            head: &head,
            disk: &disk,
            staged: &staged,
            pending_removal: &pending_removal,
        },
    );

    assert_eq!(
        status.staged.iter().collect::<Vec<_>>(),
        vec!["added", "vanished"]
    );
    assert_eq!(status.removed.iter().collect::<Vec<_>>(), vec!["gone", "rmd"]);
    assert_eq!(status.modified.get("edited"), Some(&Modification::Modified));
    assert_eq!(status.modified.get("added"), Some(&Modification::Modified));
    assert_eq!(status.modified.get("vanished"), Some(&Modification::Deleted));
    assert_eq!(status.modified.get("kept"), None);
    assert_eq!(status.untracked.iter().collect::<Vec<_>>(), vec!["new", "rmd"]);
}

#[test]
fn test_display_marks_current_branch() {
    let status = Status {
        current_branch: String::from("master"),
        branches: vec![String::from("b1"), String::from("master")],
        staged: [String::from("f")].into_iter().collect(),
        ..Default::default()
    };
    let text = status.to_string();
    assert!(text.starts_with("=== Branches ===\nb1\n*master\n\n=== Staged Files ===\nf\n"));
    assert!(text.contains("=== Modifications Not Staged For Commit ==="));
    assert!(text.ends_with("=== Untracked Files ===\n"));
}
