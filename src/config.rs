use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    dot_rev::{read_json, write_json, DotRev, DOT_REV},
    error::Result,
};

/// Per-repository settings, stored as JSON in `.rev/config`.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Branch created by `init`.
    pub initial_branch: String,
    /// File names in the working tree that are never versioned.
    pub ignores: BTreeSet<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            initial_branch: String::from("master"),
            ignores: BTreeSet::new(),
        }
    }
}

impl Config {
    pub fn load(dot_rev: &DotRev) -> Result<Self> {
        read_json(&dot_rev.config_path())
    }

    pub fn save(&self, dot_rev: &DotRev) -> Result<()> {
        write_json(self, &dot_rev.config_path())
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        name == DOT_REV || self.ignores.contains(name)
    }
}

#[test]
fn test_missing_fields_take_defaults() {
    let config: Config = serde_json::from_str(r#"{"ignores": ["target"]}"#).unwrap();
    assert_eq!(config.initial_branch, "master");
    assert!(config.is_ignored("target"));
    assert!(config.is_ignored(".rev"));
    assert!(!config.is_ignored("src.txt"));
}

#[test]
fn test_save_load() {
    let tempdir = tempfile::tempdir().unwrap();
    let dot_rev = DotRev::init(tempdir.path()).unwrap();
    let config = Config {
        initial_branch: String::from("main"),
        ignores: [String::from("scratch")].into_iter().collect(),
    };
    config.save(&dot_rev).unwrap();
    assert_eq!(Config::load(&dot_rev).unwrap(), config);
}
