use std::{collections::BTreeMap, convert::Infallible};

use crate::object_id::ObjectId;

use super::ObjectStore;

#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: BTreeMap<ObjectId, Vec<u8>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
        }
    }
}

impl ObjectStore for InMemoryObjectStore {
    type Error = Infallible;

    fn has(&self, id: ObjectId) -> Result<bool, Self::Error> {
        Ok(self.objects.contains_key(&id))
    }

    fn read(&self, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.objects.get(&id).cloned())
    }

    fn insert(&mut self, id: ObjectId, object: &[u8]) -> Result<(), Self::Error> {
        self.objects
            .entry(id)
            .or_insert_with(|| Vec::from(object));
        Ok(())
    }

    fn ids(&self) -> Result<Vec<ObjectId>, Self::Error> {
        Ok(self.objects.keys().copied().collect())
    }
}

#[test]
fn test_in_memory_object_store() {
    let mut store = InMemoryObjectStore::new();
    let b: &[u8] = b"hello, world";
    let id: ObjectId = b.into();
    store.insert(id, b).unwrap();
    assert!(store.has(id).unwrap());
    assert_eq!(store.read(id).unwrap(), Some(Vec::from(b)));
    assert_eq!(store.ids().unwrap(), vec![id]);
}

#[test]
fn test_in_memory_insert_is_idempotent() {
    let mut store = InMemoryObjectStore::new();
    let id: ObjectId = (&b"key"[..]).into();
    store.insert(id, b"first").unwrap();
    store.insert(id, b"second").unwrap();
    assert_eq!(store.read(id).unwrap(), Some(Vec::from(&b"first"[..])));
}
