use std::{
    collections::{BTreeMap, BTreeSet},
    io::ErrorKind,
    path::PathBuf,
};

use crate::{
    config::Config,
    dot_rev::DOT_REV,
    error::{Error, Result},
    object_id::ObjectId,
};

/// The user's files: every regular file directly inside the working tree
/// root, minus the configured ignores.
#[derive(Debug, Clone)]
pub struct WorkTree {
    root: PathBuf,
    config: Config,
}

/// Rejects anything that is not a plain file or branch name.
pub fn validate_name(name: &str) -> Result<()> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && name != DOT_REV
        && !name.contains(['/', '\\']);
    if plain {
        Ok(())
    } else {
        Err(Error::validation())
    }
}

impl WorkTree {
    pub fn new(root: PathBuf, config: Config) -> Self {
        WorkTree { root, config }
    }

    /// Rejects names [`validate_name`] rejects, and configured ignores.
    pub fn validate(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        if self.config.is_ignored(name) {
            log::info!("{} is ignored", name);
            return Err(Error::validation());
        }
        Ok(())
    }

    /// Names of the versionable files currently on disk.
    pub fn files(&self) -> Result<BTreeSet<String>> {
        let mut files = BTreeSet::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                log::warn!("skipping non UTF-8 file name {:?}", entry.file_name());
                continue;
            };
            if self.config.is_ignored(&name) || !entry.file_type()?.is_file() {
                continue;
            }
            files.insert(name);
        }
        Ok(files)
    }

    /// The blob id each file on disk would get if it were added right now.
    pub fn snapshot(&self) -> Result<BTreeMap<String, ObjectId>> {
        let mut ids = BTreeMap::new();
        for name in self.files()? {
            let content = self.read(&name)?;
            ids.insert(name.clone(), ObjectId::for_blob(&name, &content));
        }
        Ok(ids)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.root.join(name).is_file()
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.root.join(name))?)
    }

    pub fn read_if_exists(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match std::fs::read(self.root.join(name)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn write(&self, name: &str, content: &[u8]) -> Result<()> {
        log::debug!("writing {} ({} bytes)", name, content.len());
        Ok(std::fs::write(self.root.join(name), content)?)
    }

    /// Deletes `name` if present.
    pub fn delete(&self, name: &str) -> Result<()> {
        log::debug!("deleting {}", name);
        match std::fs::remove_file(self.root.join(name)) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
fn worktree_with(files: &[(&str, &str)]) -> (tempfile::TempDir, WorkTree) {
    let tempdir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        std::fs::write(tempdir.path().join(name), content).unwrap();
    }
    let worktree = WorkTree::new(tempdir.path().into(), Config::default());
    (tempdir, worktree)
}

#[test]
fn test_files_skips_dirs_and_ignores() {
    let (tempdir, mut worktree) = worktree_with(&[("a.txt", "a"), ("b.txt", "b")]);
    std::fs::create_dir(tempdir.path().join(".rev")).unwrap();
    std::fs::create_dir(tempdir.path().join("sub")).unwrap();
    std::fs::write(tempdir.path().join("sub").join("c.txt"), "c").unwrap();
    worktree.config.ignores.insert(String::from("b.txt"));
    let files: Vec<String> = worktree.files().unwrap().into_iter().collect();
    assert_eq!(files, vec![String::from("a.txt")]);
}

#[test]
fn test_read_write_delete() {
    let (_tempdir, worktree) = worktree_with(&[]);
    assert_eq!(worktree.read_if_exists("f").unwrap(), None);
    worktree.write("f", b"x").unwrap();
    assert!(worktree.exists("f"));
    assert_eq!(worktree.read("f").unwrap(), b"x");
    assert_eq!(
        worktree.snapshot().unwrap().get("f"),
        Some(&ObjectId::for_blob("f", b"x"))
    );
    worktree.delete("f").unwrap();
    worktree.delete("f").unwrap();
    assert!(!worktree.exists("f"));
}

#[test]
fn test_validate_name() {
    assert!(validate_name("notes.txt").is_ok());
    for bad in ["", ".", "..", ".rev", "a/b", "a\\b"] {
        assert!(matches!(validate_name(bad), Err(Error::Validation(_))), "{}", bad);
    }
}

#[test]
fn test_validate_rejects_ignored() {
    let (_tempdir, mut worktree) = worktree_with(&[("scratch", "s")]);
    worktree.config.ignores.insert(String::from("scratch"));
    assert!(worktree.validate("notes.txt").is_ok());
    assert!(matches!(worktree.validate("scratch"), Err(Error::Validation(_))));
    assert!(matches!(worktree.validate("a/b"), Err(Error::Validation(_))));
}
