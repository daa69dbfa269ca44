//! System Filter - restrict deployment to an allow-list

use serde::{Deserialize, Serialize};

use crate::descriptor::SystemEntry;

/// One system name or several
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemSelection {
    One(String),
    Many(Vec<String>),
}

impl SystemSelection {
    pub fn names(&self) -> &[String] {
        match self {
            Self::One(name) => std::slice::from_ref(name),
            Self::Many(names) => names,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().iter().any(|n| n == name)
    }
}

impl From<&str> for SystemSelection {
    fn from(name: &str) -> Self {
        Self::One(name.to_string())
    }
}

impl From<String> for SystemSelection {
    fn from(name: String) -> Self {
        Self::One(name)
    }
}

impl From<Vec<String>> for SystemSelection {
    fn from(names: Vec<String>) -> Self {
        Self::Many(names)
    }
}

impl From<&[&str]> for SystemSelection {
    fn from(names: &[&str]) -> Self {
        Self::Many(names.iter().map(|s| s.to_string()).collect())
    }
}

/// Keeps allow-listed systems in their original order. Unknown names are ignored.
pub fn filter_systems(systems: Vec<SystemEntry>, selection: Option<&SystemSelection>) -> Vec<SystemEntry> {
    match selection {
        None => systems,
        Some(selection) => systems
            .into_iter()
            .filter(|s| selection.contains(&s.name))
            .collect(),
    }
}
