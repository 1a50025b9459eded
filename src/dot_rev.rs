use std::{
    fs::{create_dir, create_dir_all, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{
    error::{Error, Result},
    object_store::directory::DirectoryObjectStore,
    objects::Objects,
};

/// Name of the metadata directory inside a working tree.
pub const DOT_REV: &str = ".rev";

/// A wrapper for the path of the .rev directory which has a number of utilities defined on it.
#[derive(Debug, Clone)]
pub struct DotRev {
    root: PathBuf,
}

impl DotRev {
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Lays out an empty `.rev` directory inside `worktree`.
    pub fn init(worktree: &Path) -> Result<Self> {
        let root = worktree.join(DOT_REV);
        if root.try_exists()? {
            return Err(Error::state(
                "A revision store already exists in the current directory.",
            ));
        }
        log::info!("creating {:?}", root);
        create_dir(&root)?;
        let dot_rev = DotRev { root };
        for dir in [
            dot_rev.branches_dir(),
            dot_rev.blobs_dir(),
            dot_rev.commits_dir(),
            dot_rev.staged_dir(),
            dot_rev.removed_dir(),
        ] {
            create_dir_all(dir)?;
        }
        Ok(dot_rev)
    }

    pub fn existing(worktree: &Path) -> Result<Self> {
        let root = worktree.join(DOT_REV);
        if !root.is_dir() {
            return Err(Error::state("Not in an initialized .rev directory."));
        }
        Ok(DotRev { root })
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config")
    }

    /// The single record naming the current branch.
    pub fn branch_path(&self) -> PathBuf {
        self.root.join("branch")
    }

    pub fn branches_dir(&self) -> PathBuf {
        self.root.join("branches")
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.root.join("store").join("blobs")
    }

    pub fn commits_dir(&self) -> PathBuf {
        self.root.join("store").join("commits")
    }

    /// Raw copies of files staged for addition.
    pub fn staged_dir(&self) -> PathBuf {
        self.root.join("stage").join("add")
    }

    /// Raw copies of files staged for removal.
    pub fn removed_dir(&self) -> PathBuf {
        self.root.join("stage").join("remove")
    }

    pub fn objects(&self) -> Result<Objects<DirectoryObjectStore>> {
        Ok(Objects::new(
            DirectoryObjectStore::new(self.blobs_dir())?,
            DirectoryObjectStore::new(self.commits_dir())?,
        ))
    }
}

pub fn read_json<A: for<'de> Deserialize<'de>>(path: &Path) -> Result<A> {
    Ok(serde_json::from_reader(File::options().read(true).open(path)?)?)
}

/// Replaces the record at `path` in one rename, so readers see either the
/// old or the new contents.
pub fn write_json<A: Serialize>(thing: &A, path: &Path) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, thing)?;
        writer.flush()?;
    }
    tmp.persist(path)?;
    Ok(())
}

#[test]
fn test_init_then_existing() {
    let tempdir = tempfile::tempdir().unwrap();
    assert!(matches!(
        DotRev::existing(tempdir.path()),
        Err(Error::State(_))
    ));
    let dot_rev = DotRev::init(tempdir.path()).unwrap();
    assert!(dot_rev.staged_dir().is_dir());
    assert!(dot_rev.commits_dir().is_dir());
    assert!(matches!(DotRev::init(tempdir.path()), Err(Error::State(_))));
    let again = DotRev::existing(tempdir.path()).unwrap();
    assert_eq!(again.root(), dot_rev.root());
}

#[test]
fn test_write_json_replaces() {
    let tempdir = tempfile::tempdir().unwrap();
    let path = tempdir.path().join("record");
    write_json(&vec![1, 2, 3], &path).unwrap();
    write_json(&vec![4], &path).unwrap();
    let back: Vec<u32> = read_json(&path).unwrap();
    assert_eq!(back, vec![4]);
}
