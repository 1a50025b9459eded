use std::{
    collections::BTreeSet,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};

use crate::{
    blob::Blob,
    commit::Commit,
    dot_rev::DotRev,
    error::{Error, Result},
    object_store::ObjectStore,
    objects::Objects,
    worktree::WorkTree,
};

/// Changes waiting for the next commit.
///
/// Files staged for addition are kept as raw copies taken at `add` time;
/// files staged for removal are kept as the copy that was deleted from the
/// working tree.
#[derive(Debug, Clone)]
pub struct Stage {
    staged_dir: PathBuf,
    removed_dir: PathBuf,
}

fn names_in(dir: &Path) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(dir)? {
        if let Ok(name) = entry?.file_name().into_string() {
            names.insert(name);
        }
    }
    Ok(names)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}

impl Stage {
    pub fn new(dot_rev: &DotRev) -> Self {
        Stage {
            staged_dir: dot_rev.staged_dir(),
            removed_dir: dot_rev.removed_dir(),
        }
    }

    /// File names staged for addition.
    pub fn staged(&self) -> Result<BTreeSet<String>> {
        names_in(&self.staged_dir)
    }

    /// File names staged for removal.
    pub fn removed(&self) -> Result<BTreeSet<String>> {
        names_in(&self.removed_dir)
    }

    pub fn staged_content(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        match std::fs::read(self.staged_dir.join(filename)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn clear(&self) -> Result<()> {
        for name in self.staged()? {
            remove_if_exists(&self.staged_dir.join(name))?;
        }
        for name in self.removed()? {
            remove_if_exists(&self.removed_dir.join(name))?;
        }
        log::debug!("cleared stage");
        Ok(())
    }

    /// Stages the current contents of `filename`, or unstages it when those
    /// contents are exactly what `head` already tracks.
    pub fn add(&self, worktree: &WorkTree, filename: &str, head: &Commit) -> Result<()> {
        if !worktree.exists(filename) {
            return Err(Error::not_found("File does not exist."));
        }
        let content = worktree.read(filename)?;
        let blob = Blob::new(filename, content);
        let staged_path = self.staged_dir.join(filename);
        if head.blob_id(filename) == Some(blob.id()) {
            log::info!("{} is unchanged since {}", filename, head.id().short());
            remove_if_exists(&staged_path)?;
        } else {
            log::info!("staging {} as {}", filename, blob.id());
            std::fs::write(&staged_path, blob.content())?;
        }
        remove_if_exists(&self.removed_dir.join(filename))
    }

    /// Unstages `filename` and, if `head` tracks it, stages its removal and
    /// deletes it from the working tree.
    pub fn remove(&self, worktree: &WorkTree, filename: &str, head: &Commit) -> Result<()> {
        let staged_path = self.staged_dir.join(filename);
        let tracked = head.blob_id(filename).is_some();
        if !tracked && !staged_path.try_exists()? {
            return Err(Error::state("No reason to remove the file."));
        }
        remove_if_exists(&staged_path)?;
        if tracked {
            log::info!("staging removal of {}", filename);
            let last_copy = worktree.read_if_exists(filename)?.unwrap_or_default();
            std::fs::write(self.removed_dir.join(filename), last_copy)?;
            worktree.delete(filename)?;
        }
        Ok(())
    }

    /// Writes a blob for every staged file and a commit on top of `head`
    /// recording the staged changes. The stage itself is left untouched.
    pub fn commit<S>(
        &self,
        message: &str,
        timestamp: DateTime<Utc>,
        head: &Commit,
        objects: &mut Objects<S>,
    ) -> Result<Commit>
    where
        S: ObjectStore,
        Error: From<S::Error>,
    {
        if message.is_empty() {
            return Err(Error::state("Please enter a commit message."));
        }
        let staged = self.staged()?;
        let removed = self.removed()?;
        if staged.is_empty() && removed.is_empty() {
            return Err(Error::state("No changes added to the commit."));
        }
        let mut tracked = head.tracked().clone();
        for name in &removed {
            tracked.remove(name);
        }
        for name in staged {
            let content = std::fs::read(self.staged_dir.join(&name))?;
            let blob = Blob::new(&name, content);
            objects.put_blob(&blob)?;
            tracked.insert(name, blob.id());
        }
        let commit = Commit::new(message, timestamp, Some(head.id()), tracked);
        objects.put_commit(&commit)?;
        log::info!("wrote commit {} ({:?})", commit.id(), commit.message());
        Ok(commit)
    }
}

#[cfg(test)]
struct Fixture {
    _tempdir: tempfile::TempDir,
    worktree: WorkTree,
    stage: Stage,
    objects: Objects<crate::object_store::in_memory::InMemoryObjectStore>,
}

#[cfg(test)]
fn fixture() -> Fixture {
    use crate::object_store::in_memory::InMemoryObjectStore;
    let tempdir = tempfile::tempdir().unwrap();
    let dot_rev = DotRev::init(tempdir.path()).unwrap();
    Fixture {
        worktree: WorkTree::new(tempdir.path().into(), Default::default()),
        stage: Stage::new(&dot_rev),
        objects: Objects::new(InMemoryObjectStore::new(), InMemoryObjectStore::new()),
        _tempdir: tempdir,
    }
}

#[cfg(test)]
fn is_clear(stage: &Stage) -> bool {
    stage.staged().unwrap().is_empty() && stage.removed().unwrap().is_empty()
}

#[test]
fn test_add_missing_file() {
    let f = fixture();
    let err = f.stage.add(&f.worktree, "nope", &Commit::root()).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_add_then_commit() {
    let mut f = fixture();
    let root = Commit::root();
    f.worktree.write("f", b"x").unwrap();
    f.stage.add(&f.worktree, "f", &root).unwrap();
    // Later edits do not change what was staged.
    f.worktree.write("f", b"changed").unwrap();
    assert_eq!(f.stage.staged_content("f").unwrap(), Some(b"x".to_vec()));

    let commit = f.stage.commit("m1", Utc::now(), &root, &mut f.objects).unwrap();
    assert_eq!(commit.parent(), Some(root.id()));
    let blob_id = commit.blob_id("f").unwrap();
    assert_eq!(f.objects.blob(blob_id).unwrap().content(), b"x");
    assert_eq!(f.objects.commit(commit.id()).unwrap(), commit);
    assert!(!is_clear(&f.stage));
}

#[test]
fn test_add_unchanged_file_unstages() {
    let mut f = fixture();
    let root = Commit::root();
    f.worktree.write("f", b"x").unwrap();
    f.stage.add(&f.worktree, "f", &root).unwrap();
    let head = f.stage.commit("m1", Utc::now(), &root, &mut f.objects).unwrap();
    f.stage.clear().unwrap();

    f.worktree.write("f", b"y").unwrap();
    f.stage.add(&f.worktree, "f", &head).unwrap();
    assert!(f.stage.staged().unwrap().contains("f"));
    f.worktree.write("f", b"x").unwrap();
    f.stage.add(&f.worktree, "f", &head).unwrap();
    assert!(is_clear(&f.stage));
}

#[test]
fn test_empty_commit_changes_nothing() {
    let mut f = fixture();
    let root = Commit::root();
    let err = f.stage.commit("m", Utc::now(), &root, &mut f.objects).unwrap_err();
    assert!(matches!(err, Error::State(_)));
    assert!(f.objects.commit_ids().unwrap().is_empty());

    f.worktree.write("f", b"x").unwrap();
    f.stage.add(&f.worktree, "f", &root).unwrap();
    let err = f.stage.commit("", Utc::now(), &root, &mut f.objects).unwrap_err();
    assert_eq!(err.to_string(), "Please enter a commit message.");
}

#[test]
fn test_remove() {
    let mut f = fixture();
    let root = Commit::root();
    f.worktree.write("f", b"x").unwrap();
    f.worktree.write("g", b"g").unwrap();
    assert!(matches!(
        f.stage.remove(&f.worktree, "f", &root),
        Err(Error::State(_))
    ));

    // Staged but untracked: only unstaged, the file stays.
    f.stage.add(&f.worktree, "g", &root).unwrap();
    f.stage.remove(&f.worktree, "g", &root).unwrap();
    assert!(f.worktree.exists("g"));
    assert!(is_clear(&f.stage));

    f.stage.add(&f.worktree, "f", &root).unwrap();
    let head = f.stage.commit("m1", Utc::now(), &root, &mut f.objects).unwrap();
    f.stage.clear().unwrap();
    f.stage.remove(&f.worktree, "f", &head).unwrap();
    assert!(!f.worktree.exists("f"));
    assert!(f.stage.removed().unwrap().contains("f"));

    let next = f.stage.commit("rm f", Utc::now(), &head, &mut f.objects).unwrap();
    assert_eq!(next.blob_id("f"), None);
}

#[test]
fn test_add_cancels_removal() {
    let mut f = fixture();
    let root = Commit::root();
    f.worktree.write("f", b"x").unwrap();
    f.stage.add(&f.worktree, "f", &root).unwrap();
    let head = f.stage.commit("m1", Utc::now(), &root, &mut f.objects).unwrap();
    f.stage.clear().unwrap();
    f.stage.remove(&f.worktree, "f", &head).unwrap();
    f.worktree.write("f", b"x").unwrap();
    f.stage.add(&f.worktree, "f", &head).unwrap();
    assert!(is_clear(&f.stage));
}
