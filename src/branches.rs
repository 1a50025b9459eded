use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    commit::{Commit, LogEntry},
    dot_rev::{read_json, write_json, DotRev},
    error::{Error, Result},
    object_id::{ObjectId, SHORT_ID_LEN},
    worktree::validate_name,
};

/// Branch names are plain names that are also not hidden files.
pub fn validate_branch_name(name: &str) -> Result<()> {
    validate_name(name)?;
    if name.starts_with('.') {
        return Err(Error::validation());
    }
    Ok(())
}

/// A named pointer to a head [`Commit`], with indices of the commits that
/// have been added to it so ids can be looked up without the object store.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    name: String,
    head: ObjectId,
    commits: BTreeMap<ObjectId, LogEntry>,
    short_ids: BTreeMap<String, ObjectId>,
}

impl Branch {
    pub fn new(name: &str, head: &Commit) -> Self {
        let mut branch = Branch {
            name: String::from(name),
            head: head.id(),
            commits: BTreeMap::new(),
            short_ids: BTreeMap::new(),
        };
        branch.index(head);
        branch
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn head(&self) -> ObjectId {
        self.head
    }

    /// Moves the head to `commit`, indexing it.
    pub fn set_head(&mut self, commit: &Commit) {
        self.index(commit);
        self.head = commit.id();
    }

    fn index(&mut self, commit: &Commit) {
        self.commits.insert(commit.id(), commit.log_entry());
        // An earlier commit keeps an abbreviation it already owns.
        self.short_ids.entry(commit.id().short()).or_insert(commit.id());
    }

    /// Looks up a full id or an abbreviated one among the indexed commits.
    pub fn resolve(&self, id: &str) -> Option<ObjectId> {
        if id.len() == SHORT_ID_LEN {
            return self.short_ids.get(id).copied();
        }
        let id: ObjectId = id.parse().ok()?;
        self.commits.contains_key(&id).then_some(id)
    }
}

/// All branches, and which one is current.
///
/// Loaded once per command and written back with [`Branches::save`].
#[derive(Debug, Clone)]
pub struct Branches {
    current: String,
    branches: BTreeMap<String, Branch>,
    removed: BTreeSet<String>,
}

impl Branches {
    pub fn init(initial: &str, root: &Commit) -> Self {
        let mut branches = BTreeMap::new();
        branches.insert(String::from(initial), Branch::new(initial, root));
        Branches {
            current: String::from(initial),
            branches,
            removed: BTreeSet::new(),
        }
    }

    pub fn load(dot_rev: &DotRev) -> Result<Self> {
        let current: String = read_json(&dot_rev.branch_path())?;
        let mut branches = BTreeMap::new();
        for entry in std::fs::read_dir(dot_rev.branches_dir())? {
            let entry = entry?;
            // Interrupted writes leave hidden temp files behind.
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let branch: Branch = read_json(&entry.path())?;
            branches.insert(branch.name.clone(), branch);
        }
        if !branches.contains_key(&current) {
            return Err(Error::NotFound(format!(
                "The current branch {} has no record.",
                current
            )));
        }
        Ok(Branches {
            current,
            branches,
            removed: BTreeSet::new(),
        })
    }

    pub fn save(&self, dot_rev: &DotRev) -> Result<()> {
        let dir = dot_rev.branches_dir();
        for branch in self.branches.values() {
            write_json(branch, &dir.join(&branch.name))?;
        }
        for name in &self.removed {
            log::info!("deleting branch record {}", name);
            match std::fs::remove_file(dir.join(name)) {
                Err(err) if err.kind() != std::io::ErrorKind::NotFound => return Err(err.into()),
                _ => {}
            }
        }
        write_json(&self.current, &dot_rev.branch_path())
    }

    pub fn current(&self) -> &Branch {
        &self.branches[&self.current]
    }

    pub fn current_name(&self) -> &str {
        &self.current
    }

    pub fn get(&self, name: &str) -> Option<&Branch> {
        self.branches.get(name)
    }

    /// Branch names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.branches.keys().map(String::as_str)
    }

    /// Creates `name` at `start`, sharing the current branch's indices.
    pub fn create(&mut self, name: &str, start: &Commit) -> Result<()> {
        if self.branches.contains_key(name) {
            return Err(Error::state("A branch with that name already exists."));
        }
        let mut branch = self.current().clone();
        branch.name = String::from(name);
        branch.set_head(start);
        log::info!("creating branch {} at {}", name, start.id());
        self.removed.remove(name);
        self.branches.insert(String::from(name), branch);
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        if !self.branches.contains_key(name) {
            return Err(Error::not_found("A branch with that name does not exist."));
        }
        if name == self.current {
            return Err(Error::state("Cannot remove the current branch."));
        }
        self.branches.remove(name);
        self.removed.insert(String::from(name));
        Ok(())
    }

    pub fn switch_current(&mut self, name: &str) -> Result<()> {
        if !self.branches.contains_key(name) {
            return Err(Error::not_found("No such branch exists."));
        }
        log::info!("switching current branch from {} to {}", self.current, name);
        self.current = String::from(name);
        Ok(())
    }

    /// Points the current branch at `commit`.
    pub fn advance(&mut self, commit: &Commit) {
        log::info!("moving {} to {}", self.current, commit.id());
        if let Some(branch) = self.branches.get_mut(&self.current) {
            branch.set_head(commit);
        }
    }

    /// Resolves a full or abbreviated commit id against every branch's
    /// indices, the current branch first. The first match wins.
    pub fn resolve(&self, id: &str) -> Option<ObjectId> {
        std::iter::once(self.current())
            .chain(self.branches.values().filter(|b| b.name != self.current))
            .find_map(|branch| branch.resolve(id))
    }
}

#[cfg(test)]
fn child_of(parent: &Commit, message: &str) -> Commit {
    Commit::new(message, chrono::Utc::now(), Some(parent.id()), BTreeMap::new())
}

#[test]
fn test_validate_branch_name() {
    assert!(validate_branch_name("feature-1").is_ok());
    assert!(matches!(validate_branch_name(".hidden"), Err(Error::Validation(_))));
    assert!(matches!(validate_branch_name("a/b"), Err(Error::Validation(_))));
}

#[test]
fn test_create_and_delete() {
    let root = Commit::root();
    let mut branches = Branches::init("master", &root);
    branches.create("b1", &root).unwrap();
    assert!(matches!(branches.create("b1", &root), Err(Error::State(_))));
    assert_eq!(branches.names().collect::<Vec<_>>(), vec!["b1", "master"]);
    branches.delete("b1").unwrap();
    assert!(matches!(branches.delete("b1"), Err(Error::NotFound(_))));
    assert!(matches!(branches.delete("master"), Err(Error::State(_))));
}

#[test]
fn test_switch_keeps_one_current() {
    let root = Commit::root();
    let mut branches = Branches::init("master", &root);
    branches.create("other", &root).unwrap();
    branches.switch_current("other").unwrap();
    assert_eq!(branches.current_name(), "other");
    assert!(matches!(branches.switch_current("nope"), Err(Error::NotFound(_))));
    assert_eq!(branches.current_name(), "other");
}

#[test]
fn test_resolve_full_and_short() {
    let root = Commit::root();
    let c1 = child_of(&root, "m1");
    let mut branches = Branches::init("master", &root);
    branches.advance(&c1);
    assert_eq!(branches.current().head(), c1.id());
    assert_eq!(branches.resolve(&c1.id().to_string()), Some(c1.id()));
    assert_eq!(branches.resolve(&c1.id().short()), Some(c1.id()));
    assert_eq!(branches.resolve(&root.id().short()), Some(root.id()));
    assert_eq!(branches.resolve(&c1.id().to_string()[..6]), None);
    assert_eq!(branches.resolve("00000000"), None);
}

#[test]
fn test_resolve_searches_other_branches() {
    let root = Commit::root();
    let c1 = child_of(&root, "on side");
    let mut branches = Branches::init("master", &root);
    branches.create("side", &root).unwrap();
    branches.switch_current("side").unwrap();
    branches.advance(&c1);
    branches.switch_current("master").unwrap();
    assert_eq!(branches.current().resolve(&c1.id().short()), None);
    assert_eq!(branches.resolve(&c1.id().short()), Some(c1.id()));
}

#[test]
fn test_save_load() {
    let tempdir = tempfile::tempdir().unwrap();
    let dot_rev = DotRev::init(tempdir.path()).unwrap();
    let root = Commit::root();
    let mut branches = Branches::init("master", &root);
    branches.create("gone", &root).unwrap();
    branches.create("kept", &root).unwrap();
    branches.save(&dot_rev).unwrap();
    branches.delete("gone").unwrap();
    branches.switch_current("kept").unwrap();
    branches.advance(&child_of(&root, "m"));
    branches.save(&dot_rev).unwrap();

    let loaded = Branches::load(&dot_rev).unwrap();
    assert_eq!(loaded.current_name(), "kept");
    assert_eq!(loaded.names().collect::<Vec<_>>(), vec!["kept", "master"]);
    assert_eq!(loaded.current(), branches.current());
}
