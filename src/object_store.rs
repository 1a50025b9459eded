use crate::object_id::ObjectId;

pub mod directory;
pub mod in_memory;

/// A keyed store of immutable binary records.
///
/// Keys are content hashes computed by the caller, so writing the same key
/// twice is a no-op. Reads trust the key and never re-hash what they return.
pub trait ObjectStore {
    type Error;

    fn has(&self, id: ObjectId) -> Result<bool, Self::Error>;

    fn read(&self, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error>;

    fn insert(&mut self, id: ObjectId, object: &[u8]) -> Result<(), Self::Error>;

    /// Every key ever inserted, in no particular order.
    fn ids(&self) -> Result<Vec<ObjectId>, Self::Error>;
}
