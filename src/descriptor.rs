//! Descriptor System - deploy.json Loader

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::pipeline::PipelineError;
use crate::SUBSYSTEM_SUFFIX;

pub type Name = String;

/// Classification of a declared system
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemKind {
    #[default]
    System,
    Subsystem,
}

impl SystemKind {
    /// Suffix rule kept byte-for-byte compatible with existing descriptor files
    pub fn classify(name: &str) -> Self {
        if name.ends_with(SUBSYSTEM_SUFFIX) {
            Self::Subsystem
        } else {
            Self::System
        }
    }
}

/// Classification of any declared name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Component,
    System,
    Subsystem,
}

impl From<SystemKind> for Kind {
    fn from(kind: SystemKind) -> Self {
        match kind {
            SystemKind::System => Kind::System,
            SystemKind::Subsystem => Kind::Subsystem,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemEntry {
    pub name: Name,
    #[serde(skip)]
    pub kind: SystemKind,
    /// Everything else (writeAccess, initialize, ...) goes to the template untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SystemEntry {
    pub fn new(name: impl Into<Name>) -> Self {
        let name = name.into();
        Self {
            kind: SystemKind::classify(&name),
            name,
            extra: Map::new(),
        }
    }

    pub fn is_subsystem(&self) -> bool {
        self.kind == SystemKind::Subsystem
    }

    /// Names listed under `writeAccess`, if any
    pub fn write_access(&self) -> Vec<&str> {
        self.extra
            .get("writeAccess")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(default)]
    pub components: Vec<Name>,
    #[serde(default)]
    pub systems: Vec<SystemEntry>,
}

impl Descriptor {
    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        let mut descriptor: Descriptor = serde_json::from_str(content)?;
        descriptor.normalize();
        Ok(descriptor)
    }

    /// Components followed by system names, in declaration order
    pub fn all_names(&self) -> Vec<Name> {
        self.components
            .iter()
            .cloned()
            .chain(self.systems.iter().map(|s| s.name.clone()))
            .collect()
    }

    /// Kind of a declared name; components shadow systems of the same name
    pub fn kind_of(&self, name: &str) -> Option<Kind> {
        if self.components.iter().any(|c| c == name) {
            return Some(Kind::Component);
        }
        self.systems
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.kind.into())
    }

    fn normalize(&mut self) {
        for system in &mut self.systems {
            system.kind = SystemKind::classify(&system.name);
        }
    }
}

/// Read and parse a descriptor file. Invariants are checked downstream.
pub fn load_descriptor(path: &Path) -> Result<Descriptor, PipelineError> {
    let content = fs::read_to_string(path).map_err(|e| PipelineError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Descriptor::from_json_str(&content).map_err(|e| PipelineError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
