use serde::{Deserialize, Serialize};

use crate::object_id::ObjectId;

/// The bytes of one file, captured under its name when it was staged.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Blob {
    id: ObjectId,
    filename: String,
    #[serde(with = "crate::hex::bytes")]
    content: Vec<u8>,
}

impl Blob {
    pub fn new(filename: &str, content: Vec<u8>) -> Self {
        Blob {
            id: ObjectId::for_blob(filename, &content),
            filename: String::from(filename),
            content,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

#[test]
fn test_blob_dedups_by_name_and_content() {
    let a = Blob::new("notes.txt", b"x".to_vec());
    let b = Blob::new("notes.txt", b"x".to_vec());
    let c = Blob::new("other.txt", b"x".to_vec());
    assert_eq!(a.id(), b.id());
    assert_ne!(a.id(), c.id());
}

#[test]
fn test_blob_json_keeps_bytes() {
    let blob = Blob::new("bin", vec![0, 159, 146, 150, 255]);
    let json = serde_json::to_string(&blob).unwrap();
    let blob_: Blob = serde_json::from_str(&json).unwrap();
    assert_eq!(blob, blob_);
    assert_eq!(blob_.content(), &[0, 159, 146, 150, 255]);
}
