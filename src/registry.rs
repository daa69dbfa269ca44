//! Write-Access Registry
//!
//! Components are always writable. Subsystems are writable through the
//! `systems` registry. Plain systems never are.
//!
//! CRITICAL: build from the unfiltered systems list. A subsystem keeps write
//! access even when it is not deployed in this pass.

use serde::{Deserialize, Serialize};

use crate::descriptor::SystemEntry;

/// Registry variable the generated library authorizes writers against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Registry {
    Components,
    Systems,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Writable {
    pub name: String,
    pub registry: Registry,
}

/// All components in order, then all subsystems in order
pub fn build_writables(components: &[String], systems: &[SystemEntry]) -> Vec<Writable> {
    let components = components.iter().map(|name| Writable {
        name: name.clone(),
        registry: Registry::Components,
    });

    let subsystems = systems
        .iter()
        .filter(|s| s.is_subsystem())
        .map(|s| Writable {
            name: s.name.clone(),
            registry: Registry::Systems,
        });

    components.chain(subsystems).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_components_then_subsystems() {
        let systems = vec![
            SystemEntry::new("LootSubsystem"),
            SystemEntry::new("MoveSystem"),
            SystemEntry::new("CombatSubsystem"),
        ];
        let writables = build_writables(&names(&["Position", "Health"]), &systems);

        let summary: Vec<_> = writables.iter().map(|w| (w.name.as_str(), w.registry)).collect();
        assert_eq!(summary, vec![
            ("Position", Registry::Components),
            ("Health", Registry::Components),
            ("LootSubsystem", Registry::Systems),
            ("CombatSubsystem", Registry::Systems),
        ]);
    }

    #[test]
    fn test_plain_system_never_writable() {
        let writables = build_writables(&[], &[SystemEntry::new("CombatSystem")]);
        assert!(writables.is_empty());
    }

    #[test]
    fn test_registry_serializes_lowercase() {
        let w = Writable { name: "CombatSubsystem".into(), registry: Registry::Systems };
        assert_eq!(
            serde_json::to_string(&w).unwrap(),
            r#"{"name":"CombatSubsystem","registry":"systems"}"#
        );
    }
}
