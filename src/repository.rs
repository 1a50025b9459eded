use std::{collections::BTreeMap, path::Path};

use chrono::Utc;

use crate::{
    blob::Blob,
    branches::{validate_branch_name, Branches},
    commit::{Commit, LogEntry},
    config::Config,
    dot_rev::DotRev,
    error::{Error, Result},
    object_id::ObjectId,
    object_store::directory::DirectoryObjectStore,
    objects::{History, Objects},
    stage::Stage,
    status::{Status, StatusInputs},
    worktree::{validate_name, WorkTree},
};

/// A working tree together with its `.rev` directory.
///
/// Every command opens one of these, runs one operation and drops it; branch
/// state is read on open and written back by the operations that change it.
#[derive(Debug)]
pub struct Repository {
    worktree: WorkTree,
    dot_rev: DotRev,
    objects: Objects<DirectoryObjectStore>,
    branches: Branches,
    stage: Stage,
}

impl Repository {
    /// Creates a repository in `root` with a single branch holding the
    /// initial commit.
    pub fn init(root: &Path, config: Config) -> Result<Self> {
        validate_branch_name(&config.initial_branch)?;
        let dot_rev = DotRev::init(root)?;
        config.save(&dot_rev)?;
        let mut objects = dot_rev.objects()?;
        let initial = Commit::root();
        objects.put_commit(&initial)?;
        let branches = Branches::init(&config.initial_branch, &initial);
        branches.save(&dot_rev)?;
        log::info!(
            "initialized {:?} on branch {}",
            dot_rev.root(),
            config.initial_branch
        );
        Ok(Repository {
            worktree: WorkTree::new(root.into(), config),
            stage: Stage::new(&dot_rev),
            objects,
            branches,
            dot_rev,
        })
    }

    pub fn open(root: &Path) -> Result<Self> {
        let dot_rev = DotRev::existing(root)?;
        let config = Config::load(&dot_rev)?;
        Ok(Repository {
            worktree: WorkTree::new(root.into(), config),
            objects: dot_rev.objects()?,
            branches: Branches::load(&dot_rev)?,
            stage: Stage::new(&dot_rev),
            dot_rev,
        })
    }

    pub fn branches(&self) -> &Branches {
        &self.branches
    }

    /// The commit the current branch points at.
    pub fn head(&self) -> Result<Commit> {
        self.objects.commit(self.branches.current().head())
    }

    pub fn add(&mut self, filename: &str) -> Result<()> {
        self.worktree.validate(filename)?;
        self.stage.add(&self.worktree, filename, &self.head()?)
    }

    pub fn commit(&mut self, message: &str) -> Result<Commit> {
        let head = self.head()?;
        let commit = self
            .stage
            .commit(message, Utc::now(), &head, &mut self.objects)?;
        self.branches.advance(&commit);
        self.branches.save(&self.dot_rev)?;
        self.stage.clear()?;
        Ok(commit)
    }

    pub fn remove(&mut self, filename: &str) -> Result<()> {
        validate_name(filename)?;
        self.stage.remove(&self.worktree, filename, &self.head()?)
    }

    /// The current branch's history, newest first, down to the initial commit.
    pub fn log(&self) -> History<'_, DirectoryObjectStore> {
        self.objects.history(self.branches.current().head())
    }

    /// Every commit ever made, in no particular order.
    pub fn global_log(&self) -> Result<Vec<LogEntry>> {
        self.objects
            .commit_ids()?
            .into_iter()
            .map(|id| Ok(self.objects.commit(id)?.log_entry()))
            .collect()
    }

    /// Ids of every commit whose message is exactly `message`.
    pub fn find(&self, message: &str) -> Result<Vec<ObjectId>> {
        let mut found = Vec::new();
        for id in self.objects.commit_ids()? {
            if self.objects.commit(id)?.message() == message {
                found.push(id);
            }
        }
        if found.is_empty() {
            return Err(Error::not_found("Found no commit with that message."));
        }
        Ok(found)
    }

    pub fn status(&self) -> Result<Status> {
        let head = self.head()?;
        let disk = self.worktree.snapshot()?;
        let mut staged = BTreeMap::new();
        for name in self.stage.staged()? {
            let content = self.stage.staged_content(&name)?.unwrap_or_default();
            let id = ObjectId::for_blob(&name, &content);
            staged.insert(name, id);
        }
        let pending_removal = self.stage.removed()?;
        Ok(Status::compute(
            self.branches.current_name(),
            self.branches.names().map(String::from).collect(),
            StatusInputs {
                head: &head,
                disk: &disk,
                staged: &staged,
                pending_removal: &pending_removal,
            },
        ))
    }

    /// Resolves a full or abbreviated commit id.
    pub fn resolve(&self, id: &str) -> Result<Commit> {
        if let Some(found) = self.branches.resolve(id) {
            return self.objects.commit(found);
        }
        // Commits no longer on any branch are still reachable by full id.
        let missing = || Error::not_found("No commit with that id exists.");
        let full: ObjectId = id.parse().map_err(|_| missing())?;
        if !self.objects.has_commit(full)? {
            return Err(missing());
        }
        self.objects.commit(full)
    }

    /// Restores `filename` as the current head has it.
    pub fn checkout_file(&self, filename: &str) -> Result<()> {
        validate_name(filename)?;
        self.restore_file(&self.head()?, filename)
    }

    /// Restores `filename` as the commit `id` has it.
    pub fn checkout_file_at(&self, id: &str, filename: &str) -> Result<()> {
        validate_name(filename)?;
        let commit = self.resolve(id)?;
        self.restore_file(&commit, filename)
    }

    fn restore_file(&self, commit: &Commit, filename: &str) -> Result<()> {
        let Some(blob_id) = commit.blob_id(filename) else {
            return Err(Error::not_found("File does not exist in that commit."));
        };
        let blob = self.objects.blob(blob_id)?;
        log::info!("restoring {} from {}", blob.filename(), commit.id().short());
        self.worktree.write(filename, blob.content())
    }

    /// Makes `name` the current branch, replacing the working tree with its
    /// head's snapshot.
    pub fn checkout_branch(&mut self, name: &str) -> Result<()> {
        let Some(branch) = self.branches.get(name) else {
            return Err(Error::not_found("No such branch exists."));
        };
        if name == self.branches.current_name() {
            return Err(Error::state("No need to check out the current branch."));
        }
        let target = self.objects.commit(branch.head())?;
        self.replace_worktree(&self.head()?, &target)?;
        self.branches.switch_current(name)?;
        self.branches.save(&self.dot_rev)
    }

    pub fn branch(&mut self, name: &str) -> Result<()> {
        validate_branch_name(name)?;
        let head = self.head()?;
        self.branches.create(name, &head)?;
        self.branches.save(&self.dot_rev)
    }

    pub fn remove_branch(&mut self, name: &str) -> Result<()> {
        self.branches.delete(name)?;
        self.branches.save(&self.dot_rev)
    }

    /// Moves the current branch to commit `id` and replaces the working tree
    /// with its snapshot.
    pub fn reset(&mut self, id: &str) -> Result<()> {
        let target = self.resolve(id)?;
        let head = self.head()?;
        if !self.objects.is_ancestor(target.id(), head.id())? {
            log::warn!(
                "{} is not in the history of {}; resetting anyway",
                target.id(),
                self.branches.current_name()
            );
        }
        self.replace_worktree(&head, &target)?;
        self.branches.advance(&target);
        self.branches.save(&self.dot_rev)
    }

    /// Checks that `branch` could be merged, then reports that merging is
    /// not supported.
    pub fn merge(&mut self, branch: &str) -> Result<()> {
        if self.branches.get(branch).is_none() {
            return Err(Error::not_found("A branch with that name does not exist."));
        }
        if branch == self.branches.current_name() {
            return Err(Error::state("Cannot merge a branch with itself."));
        }
        Err(Error::state("Merging is not supported."))
    }

    /// Working files that `current` does not track but `target` would
    /// overwrite with different content.
    fn untracked_conflicts(&self, current: &Commit, target: &Commit) -> Result<Vec<String>> {
        Ok(self
            .worktree
            .snapshot()?
            .into_iter()
            .filter(|(name, on_disk)| {
                current.blob_id(name).is_none()
                    && matches!(target.blob_id(name), Some(wanted) if wanted != *on_disk)
            })
            .map(|(name, _)| name)
            .collect())
    }

    /// Swaps the working tree from `current`'s snapshot to `target`'s and
    /// clears the stage. Nothing is touched if an untracked file is in the way.
    fn replace_worktree(&self, current: &Commit, target: &Commit) -> Result<()> {
        let conflicts = self.untracked_conflicts(current, target)?;
        if !conflicts.is_empty() {
            log::warn!("untracked files in the way: {:?}", conflicts);
            return Err(Error::Conflict(conflicts));
        }
        let blobs: Vec<(&String, Blob)> = target
            .tracked()
            .iter()
            .map(|(name, id)| Ok((name, self.objects.blob(*id)?)))
            .collect::<Result<_>>()?;

        for name in current.tracked().keys() {
            if target.blob_id(name).is_none() {
                self.worktree.delete(name)?;
            }
        }
        for (name, blob) in &blobs {
            self.worktree.write(name, blob.content())?;
        }
        log::info!(
            "working tree now matches {} ({} files)",
            target.id().short(),
            blobs.len()
        );
        self.stage.clear()
    }
}

#[cfg(test)]
fn scratch() -> (tempfile::TempDir, Repository) {
    let tempdir = tempfile::tempdir().unwrap();
    let repo = Repository::init(tempdir.path(), Config::default()).unwrap();
    (tempdir, repo)
}

#[cfg(test)]
fn commit_file(repo: &mut Repository, name: &str, content: &str, message: &str) -> Commit {
    repo.worktree.write(name, content.as_bytes()).unwrap();
    repo.add(name).unwrap();
    repo.commit(message).unwrap()
}

#[cfg(test)]
fn read(repo: &Repository, name: &str) -> String {
    String::from_utf8(repo.worktree.read(name).unwrap()).unwrap()
}

#[test]
fn test_commit_log_checkout_reset() {
    let (_tempdir, mut repo) = scratch();
    let m1 = commit_file(&mut repo, "f", "x", "m1");
    let m2 = commit_file(&mut repo, "f", "y", "m2");
    assert_eq!(m2.parent(), Some(m1.id()));

    let log: Vec<LogEntry> = repo.log().collect::<Result<_>>().unwrap();
    let messages: Vec<&str> = log.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["m2", "m1", crate::commit::INITIAL_MESSAGE]);
    assert_eq!(log[0].id, m2.id());

    repo.worktree.write("f", b"scribble").unwrap();
    repo.checkout_file("f").unwrap();
    assert_eq!(read(&repo, "f"), "y");

    repo.reset(&m1.id().to_string()).unwrap();
    assert_eq!(repo.head().unwrap(), m1);
    repo.worktree.write("f", b"scribble").unwrap();
    repo.checkout_file("f").unwrap();
    assert_eq!(read(&repo, "f"), "x");
}

#[test]
fn test_state_survives_reopen() {
    let (tempdir, mut repo) = scratch();
    let m1 = commit_file(&mut repo, "f", "x", "m1");
    repo.branch("side").unwrap();
    drop(repo);
    let repo = Repository::open(tempdir.path()).unwrap();
    assert_eq!(repo.head().unwrap(), m1);
    assert_eq!(repo.branches().names().collect::<Vec<_>>(), vec!["master", "side"]);
    assert!(matches!(
        Repository::init(tempdir.path(), Config::default()),
        Err(Error::State(_))
    ));
}

#[test]
fn test_empty_commit_leaves_everything() {
    let (_tempdir, mut repo) = scratch();
    let before = repo.head().unwrap();
    let err = repo.commit("nothing").unwrap_err();
    assert_eq!(err.to_string(), "No changes added to the commit.");
    assert_eq!(repo.head().unwrap(), before);
    assert_eq!(repo.global_log().unwrap().len(), 1);
}

#[test]
fn test_checkout_branch_swaps_files() {
    let (_tempdir, mut repo) = scratch();
    commit_file(&mut repo, "shared", "1", "m1");
    repo.branch("other").unwrap();
    commit_file(&mut repo, "only_master", "m", "m2");
    repo.worktree.write("pending", b"p").unwrap();
    repo.add("pending").unwrap();

    repo.checkout_branch("other").unwrap();
    assert_eq!(repo.branches().current_name(), "other");
    assert!(!repo.worktree.exists("only_master"));
    assert_eq!(read(&repo, "shared"), "1");
    assert!(repo.status().unwrap().staged.is_empty());

    repo.checkout_branch("master").unwrap();
    assert_eq!(read(&repo, "only_master"), "m");

    assert!(matches!(repo.checkout_branch("master"), Err(Error::State(_))));
    assert!(matches!(repo.checkout_branch("nope"), Err(Error::NotFound(_))));
}

#[test]
fn test_checkout_branch_conflict_mutates_nothing() {
    let (_tempdir, mut repo) = scratch();
    repo.branch("other").unwrap();
    commit_file(&mut repo, "g", "1", "add g");
    repo.worktree.write("keep", b"k").unwrap();
    repo.add("keep").unwrap();
    repo.commit("add keep").unwrap();
    repo.checkout_branch("other").unwrap();
    assert!(!repo.worktree.exists("g"));

    repo.worktree.write("g", b"2").unwrap();
    repo.worktree.write("p", b"p").unwrap();
    repo.add("p").unwrap();
    let err = repo.checkout_branch("master").unwrap_err();
    assert!(matches!(&err, Error::Conflict(files) if files == &vec![String::from("g")]));
    assert_eq!(repo.branches().current_name(), "other");
    assert_eq!(read(&repo, "g"), "2");
    assert!(!repo.worktree.exists("keep"));
    assert_eq!(repo.status().unwrap().staged.iter().collect::<Vec<_>>(), vec!["p"]);

    // The same content is not in the way.
    repo.worktree.write("g", b"1").unwrap();
    repo.checkout_branch("master").unwrap();
    assert_eq!(read(&repo, "keep"), "k");
}

#[test]
fn test_branch_and_rm_branch() {
    let (_tempdir, mut repo) = scratch();
    repo.branch("b1").unwrap();
    assert!(matches!(repo.branch("b1"), Err(Error::State(_))));
    repo.remove_branch("b1").unwrap();
    assert!(matches!(repo.remove_branch("b1"), Err(Error::NotFound(_))));
    let err = repo.remove_branch("master").unwrap_err();
    assert_eq!(err.to_string(), "Cannot remove the current branch.");
    assert!(matches!(repo.branch("a/b"), Err(Error::Validation(_))));
}

#[test]
fn test_find() {
    let (_tempdir, mut repo) = scratch();
    let m1 = commit_file(&mut repo, "f", "x", "same");
    let m2 = commit_file(&mut repo, "f", "y", "same");
    let mut found = repo.find("same").unwrap();
    found.sort();
    let mut expected = vec![m1.id(), m2.id()];
    expected.sort();
    assert_eq!(found, expected);
    let err = repo.find("nope").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(err.to_string(), "Found no commit with that message.");
}

#[test]
fn test_checkout_file_at() {
    let (_tempdir, mut repo) = scratch();
    let m1 = commit_file(&mut repo, "f", "x", "m1");
    commit_file(&mut repo, "f", "y", "m2");
    repo.checkout_file_at(&m1.id().short(), "f").unwrap();
    assert_eq!(read(&repo, "f"), "x");

    let err = repo.checkout_file_at("deadbeef", "f").unwrap_err();
    assert_eq!(err.to_string(), "No commit with that id exists.");
    let err = repo.checkout_file_at(&m1.id().short(), "g").unwrap_err();
    assert_eq!(err.to_string(), "File does not exist in that commit.");
    let err = repo.checkout_file("g").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_reset_by_short_id() {
    let (_tempdir, mut repo) = scratch();
    let m1 = commit_file(&mut repo, "f", "x", "m1");
    commit_file(&mut repo, "g", "g", "m2");
    repo.reset(&m1.id().short()).unwrap();
    assert!(!repo.worktree.exists("g"));
    assert_eq!(repo.head().unwrap(), m1);
    assert!(matches!(repo.reset("0123"), Err(Error::NotFound(_))));

    let root = repo.resolve(&Commit::root().id().short()).unwrap();
    repo.worktree.write("untracked", b"u").unwrap();
    repo.reset(&root.id().to_string()).unwrap();
    assert!(!repo.worktree.exists("f"));
    assert!(repo.worktree.exists("untracked"));
}

#[test]
fn test_reset_conflict_mutates_nothing() {
    let (_tempdir, mut repo) = scratch();
    let m1 = commit_file(&mut repo, "f", "x", "m1");
    let m2 = commit_file(&mut repo, "g", "1", "m2");
    repo.reset(&m1.id().short()).unwrap();

    repo.worktree.write("g", b"2").unwrap();
    repo.worktree.write("p", b"p").unwrap();
    repo.add("p").unwrap();
    let err = repo.reset(&m2.id().short()).unwrap_err();
    assert!(matches!(&err, Error::Conflict(files) if files == &vec![String::from("g")]));
    assert_eq!(repo.head().unwrap(), m1);
    assert_eq!(read(&repo, "g"), "2");
    assert_eq!(repo.status().unwrap().staged.iter().collect::<Vec<_>>(), vec!["p"]);

    repo.worktree.delete("g").unwrap();
    repo.reset(&m2.id().short()).unwrap();
    assert_eq!(repo.head().unwrap(), m2);
    assert_eq!(read(&repo, "g"), "1");
    assert!(repo.status().unwrap().staged.is_empty());
    assert!(repo.worktree.exists("p"));
}

#[test]
fn test_ignored_files_cannot_be_added() {
    let tempdir = tempfile::tempdir().unwrap();
    let config = Config {
        ignores: [String::from("scratch")].into(),
        ..Config::default()
    };
    let mut repo = Repository::init(tempdir.path(), config).unwrap();
    repo.worktree.write("scratch", b"1").unwrap();
    assert!(matches!(repo.add("scratch"), Err(Error::Validation(_))));
    assert!(matches!(repo.commit("m1"), Err(Error::State(_))));

    let status = repo.status().unwrap();
    assert!(status.staged.is_empty());
    assert!(status.removed.is_empty());
    assert!(status.untracked.is_empty());

    // Never tracked, so a checkout leaves it alone.
    repo.branch("other").unwrap();
    repo.checkout_branch("other").unwrap();
    repo.worktree.write("scratch", b"mine").unwrap();
    repo.checkout_branch("master").unwrap();
    assert_eq!(read(&repo, "scratch"), "mine");
}

#[test]
fn test_commit_from_deleted_branch_resolves_by_full_id() {
    let (_tempdir, mut repo) = scratch();
    repo.branch("side").unwrap();
    repo.checkout_branch("side").unwrap();
    let lost = commit_file(&mut repo, "f", "x", "on side");
    repo.checkout_branch("master").unwrap();
    repo.remove_branch("side").unwrap();

    assert!(repo.resolve(&lost.id().short()).is_err());
    assert_eq!(repo.resolve(&lost.id().to_string()).unwrap(), lost);
    assert!(repo
        .global_log()
        .unwrap()
        .iter()
        .any(|entry| entry.id == lost.id()));
}

#[test]
fn test_status() {
    let (_tempdir, mut repo) = scratch();
    commit_file(&mut repo, "a", "1", "m1");
    commit_file(&mut repo, "b", "2", "m2");
    repo.remove("a").unwrap();
    repo.worktree.delete("b").unwrap();
    repo.worktree.write("c", b"3").unwrap();
    repo.worktree.write("d", b"4").unwrap();
    repo.add("d").unwrap();
    repo.branch("z").unwrap();

    let status = repo.status().unwrap();
    assert_eq!(status.branches, vec!["master", "z"]);
    assert_eq!(status.current_branch, "master");
    assert_eq!(status.staged.iter().collect::<Vec<_>>(), vec!["d"]);
    assert_eq!(status.removed.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(status.untracked.iter().collect::<Vec<_>>(), vec!["c"]);
    assert!(status.modified.is_empty());
}

#[test]
fn test_rm_then_commit() {
    let (_tempdir, mut repo) = scratch();
    commit_file(&mut repo, "f", "x", "m1");
    assert!(matches!(repo.remove("never"), Err(Error::State(_))));
    repo.remove("f").unwrap();
    assert!(!repo.worktree.exists("f"));
    let commit = repo.commit("drop f").unwrap();
    assert!(commit.tracked().is_empty());
}

#[test]
fn test_merge_is_a_stub() {
    let (_tempdir, mut repo) = scratch();
    repo.branch("other").unwrap();
    assert!(matches!(repo.merge("nope"), Err(Error::NotFound(_))));
    assert!(matches!(repo.merge("master"), Err(Error::State(_))));
    let err = repo.merge("other").unwrap_err();
    assert_eq!(err.to_string(), "Merging is not supported.");
}
