use derive_more::{Display, From};

use crate::object_id::ObjectId;

/// Everything that can go wrong while operating on a repository.
///
/// The first five variants are the user-facing outcomes of a command; the
/// rest are failures of the underlying storage.
#[derive(Debug, Display, From)]
pub enum Error {
    /// Malformed operands.
    #[display(fmt = "{}", _0)]
    Validation(String),
    /// A file, commit or branch that the command needs does not exist.
    #[display(fmt = "{}", _0)]
    NotFound(String),
    /// Checkout or reset would overwrite these untracked working files.
    #[display(fmt = "There is an untracked file in the way; delete it, or add and commit it first.")]
    Conflict(Vec<String>),
    /// The repository is not in a state where the command makes sense.
    #[display(fmt = "{}", _0)]
    State(String),
    #[display(fmt = "missing object {}", _0)]
    MissingObject(ObjectId),
    #[from]
    #[display(fmt = "i/o error: {}", _0)]
    IO(std::io::Error),
    #[from]
    #[display(fmt = "malformed record: {}", _0)]
    Serde(serde_json::Error),
    #[from]
    #[display(fmt = "could not persist record: {}", _0)]
    Persist(tempfile::PersistError),
}

impl std::error::Error for Error {}

impl From<std::convert::Infallible> for Error {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

impl Error {
    pub fn validation() -> Self {
        Error::Validation(String::from("Incorrect operands."))
    }

    pub fn not_found(msg: &str) -> Self {
        Error::NotFound(String::from(msg))
    }

    pub fn state(msg: &str) -> Self {
        Error::State(String::from(msg))
    }

    /// Whether this error is an ordinary outcome reported to the user, as
    /// opposed to a failure of the repository's storage.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::NotFound(_)
                | Error::Conflict(_)
                | Error::State(_)
                | Error::MissingObject(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[test]
fn test_display_is_one_line() {
    let conflict = Error::Conflict(vec![String::from("a.txt")]);
    assert_eq!(
        conflict.to_string(),
        "There is an untracked file in the way; delete it, or add and commit it first."
    );
    assert_eq!(Error::validation().to_string(), "Incorrect operands.");
    assert!(conflict.is_user_facing());
    let io: Error = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
    assert!(!io.is_user_facing());
}
