//! # Revision Control
//!
//! This is an implementation of a basic revision control system: files are
//! staged, committed as full snapshots into a content addressed store, and
//! the working tree is moved between snapshots through branches.

mod hex;

/// Immutable snapshot of one file's bytes.
pub mod blob;
/// Named pointers to head commits, and which one is current.
pub mod branches;
/// Immutable full-tree snapshots linked to their parent by id.
pub mod commit;
/// Per-repository settings.
pub mod config;
/// Layout of the `.rev` metadata directory.
pub mod dot_rev;
pub mod error;
/// Hash-based binary object identifier.
pub mod object_id;
/// Content addressible store API using the [`object_id::ObjectId`].
pub mod object_store;
/// Typed blob and commit storage on top of [`object_store::ObjectStore`].
pub mod objects;
/// All repository commands.
pub mod repository;
/// Pending changes between the working tree and the next commit.
pub mod stage;
pub mod status;
/// The versioned files in the working directory.
pub mod worktree;
