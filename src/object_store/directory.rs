use std::{
    fs::{create_dir_all, read_dir},
    io::{ErrorKind, Write},
    path::PathBuf,
};

use tempfile::NamedTempFile;

use crate::object_id::ObjectId;

use super::ObjectStore;

/// A persistent [`ObjectStore`] stored in a directory,
/// using the first two hexadecimal characters of the [`ObjectId`]
/// to determine which directory to place the binary object in
/// and creating a file with the rest of the hexadecimal characters
/// as the file name.
#[derive(Debug, Clone)]
pub struct DirectoryObjectStore {
    root: PathBuf,
}

impl DirectoryObjectStore {
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        if !root.try_exists()? {
            log::info!("creating directory store root: {:?}", root);
            create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    fn path(&self, id: ObjectId) -> (PathBuf, PathBuf) {
        let s: String = id.to_string();
        let subdir_path = self.root.join(&s[0..2]);
        let path = subdir_path.join(&s[2..]);
        (subdir_path, path)
    }
}

impl ObjectStore for DirectoryObjectStore {
    type Error = std::io::Error;

    fn has(&self, id: ObjectId) -> Result<bool, Self::Error> {
        log::debug!("checking whether {} is contained in {:?}", id, self.root);
        let (_, path) = self.path(id);
        path.try_exists()
    }

    fn read(&self, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error> {
        log::debug!("reading {} from {:?}", id, self.root);
        let (_, path) = self.path(id);
        match std::fs::read(path) {
            Ok(v) => Ok(Some(v)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn insert(&mut self, id: ObjectId, object: &[u8]) -> Result<(), Self::Error> {
        log::info!("inserting {} into {:?}", id, self.root);
        let (subdir_path, path) = self.path(id);
        if path.try_exists()? {
            log::info!("{:?} already exists", path);
            return Ok(());
        }
        if !subdir_path.try_exists()? {
            log::info!("creating subdir path {:?} in {:?}", subdir_path, self.root);
            create_dir_all(&subdir_path)?;
        }
        let mut f = NamedTempFile::new_in(&subdir_path)?;
        f.write_all(object)?;
        f.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn ids(&self) -> Result<Vec<ObjectId>, Self::Error> {
        let mut ids = Vec::new();
        for subdir in read_dir(&self.root)? {
            let subdir = subdir?;
            if !subdir.file_type()?.is_dir() {
                continue;
            }
            let prefix = subdir.file_name().to_string_lossy().into_owned();
            for entry in read_dir(subdir.path())? {
                let rest = entry?.file_name().to_string_lossy().into_owned();
                match format!("{}{}", prefix, rest).parse::<ObjectId>() {
                    Ok(id) => ids.push(id),
                    Err(err) => log::warn!("skipping {}/{} in {:?}: {}", prefix, rest, self.root, err),
                }
            }
        }
        Ok(ids)
    }
}

#[test]
fn test_directory_object_store() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().into()).unwrap();
    let b: &[u8] = b"hello, world";
    let id: ObjectId = b.into();
    assert!(!store.has(id).unwrap());
    assert_eq!(store.read(id).unwrap(), None);
    store.insert(id, b).unwrap();
    assert!(store.has(id).unwrap());
    assert_eq!(store.read(id).unwrap(), Some(Vec::from(b)));
    store.insert(id, b).unwrap();
    assert_eq!(store.ids().unwrap(), vec![id]);
}

#[test]
fn test_directory_object_store_lists_every_id() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().join("nested")).unwrap();
    let mut expected = Vec::new();
    for i in 0..20u8 {
        let bytes = [i; 4];
        let id: ObjectId = (&bytes[..]).into();
        store.insert(id, &bytes).unwrap();
        expected.push(id);
    }
    let mut ids = store.ids().unwrap();
    ids.sort();
    expected.sort();
    assert_eq!(ids, expected);
}
