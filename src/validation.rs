//! Validation System - Rule/Policy Separation
//!
//! Rules produce structured violations over a resolved pass.
//! Policy decides whether those violations stop generation.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::descriptor::{Descriptor, Kind};
use crate::filter::SystemSelection;
use crate::locator::NameToPath;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub name: String,
    pub message: String,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn from_violations(violations: Vec<ValidationViolation>) -> Self {
        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);
        Self { valid, violations }
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Error)
    }
}

/// Whether violations may stop generation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    Block,
    #[default]
    Warn,
}

/// A resolved pass, before systems are filtered
pub struct ValidationInput<'a> {
    pub descriptor: &'a Descriptor,
    pub name_to_path: &'a NameToPath,
    pub selection: Option<&'a SystemSelection>,
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, input: &ValidationInput<'_>) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct DuplicateNameRule;

impl ValidationRule for DuplicateNameRule {
    fn name(&self) -> &'static str { "duplicate_name" }

    fn validate(&self, input: &ValidationInput<'_>) -> Vec<ValidationViolation> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut order = Vec::new();
        for name in input.descriptor.all_names() {
            let count = counts.entry(name.clone()).or_insert(0);
            if *count == 0 {
                order.push(name);
            }
            *count += 1;
        }

        order
            .into_iter()
            .filter(|name| counts[name] > 1)
            .map(|name| ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: format!("'{}' is declared {} times", name, counts[&name]),
                name,
                remediation: vec!["Give every component and system a unique name".to_string()],
            })
            .collect()
    }
}

pub struct UnresolvedNameRule;

impl ValidationRule for UnresolvedNameRule {
    fn name(&self) -> &'static str { "unresolved_name" }

    fn validate(&self, input: &ValidationInput<'_>) -> Vec<ValidationViolation> {
        let mut seen = HashSet::new();
        input
            .descriptor
            .all_names()
            .into_iter()
            .filter(|name| !input.name_to_path.contains_key(name) && seen.insert(name.clone()))
            .map(|name| ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: format!("No source file found for '{}'", name),
                name,
                remediation: vec!["Add a source file named after it under the source root".to_string()],
            })
            .collect()
    }
}

pub struct UnknownSelectionRule;

impl ValidationRule for UnknownSelectionRule {
    fn name(&self) -> &'static str { "unknown_selection" }

    fn validate(&self, input: &ValidationInput<'_>) -> Vec<ValidationViolation> {
        let Some(selection) = input.selection else {
            return vec![];
        };

        selection
            .names()
            .iter()
            .filter(|name| !input.descriptor.systems.iter().any(|s| &s.name == *name))
            .map(|name| ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Info,
                name: name.clone(),
                message: format!("Requested system '{}' is not declared", name),
                remediation: vec![],
            })
            .collect()
    }
}

pub struct WriteAccessRule;

impl ValidationRule for WriteAccessRule {
    fn name(&self) -> &'static str { "write_access" }

    fn validate(&self, input: &ValidationInput<'_>) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for system in &input.descriptor.systems {
            for target in system.write_access() {
                if target == "*" {
                    continue;
                }
                let problem = match input.descriptor.kind_of(target) {
                    Some(Kind::Component) | Some(Kind::Subsystem) => continue,
                    Some(Kind::System) => "non-writable system",
                    None => "undeclared",
                };
                violations.push(ValidationViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Warning,
                    name: system.name.clone(),
                    message: format!("'{}' requests write access to {} '{}'", system.name, problem, target),
                    remediation: vec![
                        "Declare it as a component".to_string(),
                        "Or rename the system with the Subsystem suffix".to_string(),
                    ],
                });
            }
        }
        violations
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(DuplicateNameRule),
                Box::new(UnresolvedNameRule),
                Box::new(UnknownSelectionRule),
                Box::new(WriteAccessRule),
            ],
        }
    }

    pub fn validate(&self, input: &ValidationInput<'_>) -> ValidationResult {
        let violations = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(input))
            .collect();
        ValidationResult::from_violations(violations)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(json: &str, resolved: &[&str], selection: Option<SystemSelection>) -> ValidationResult {
        let descriptor = Descriptor::from_json_str(json).unwrap();
        let name_to_path: NameToPath = resolved
            .iter()
            .map(|n| (n.to_string(), format!("../src/{}.sol", n)))
            .collect();
        Validator::new().validate(&ValidationInput {
            descriptor: &descriptor,
            name_to_path: &name_to_path,
            selection: selection.as_ref(),
        })
    }

    fn rules(result: &ValidationResult) -> Vec<&str> {
        result.violations.iter().map(|v| v.rule.as_str()).collect()
    }

    #[test]
    fn test_clean_descriptor() {
        let result = run(
            r#"{"components": ["Position"], "systems": [{"name": "MoveSystem", "writeAccess": ["Position"]}]}"#,
            &["Position", "MoveSystem"],
            None,
        );
        assert!(result.valid);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_duplicate_is_error() {
        let result = run(
            r#"{"components": ["Position"], "systems": [{"name": "Position"}]}"#,
            &["Position"],
            None,
        );
        assert!(!result.valid);
        assert_eq!(rules(&result), vec!["duplicate_name"]);
        assert_eq!(result.errors().count(), 1);
    }

    #[test]
    fn test_unresolved_is_warning() {
        let result = run(r#"{"components": ["Position", "Health"]}"#, &["Position"], None);
        assert!(result.valid);
        assert_eq!(rules(&result), vec!["unresolved_name"]);
        assert_eq!(result.violations[0].name, "Health");
    }

    #[test]
    fn test_unknown_selection_is_info() {
        let result = run(
            r#"{"systems": [{"name": "Movement"}]}"#,
            &["Movement"],
            Some(SystemSelection::from("Ghost")),
        );
        assert!(result.valid);
        assert_eq!(result.violations[0].severity, ViolationSeverity::Info);
    }

    #[test]
    fn test_write_access_to_plain_system() {
        let result = run(
            r#"{"systems": [{"name": "CombatSystem"}, {"name": "LootSubsystem"}, {"name": "MoveSystem", "writeAccess": ["CombatSystem", "LootSubsystem", "*"]}]}"#,
            &["CombatSystem", "LootSubsystem", "MoveSystem"],
            None,
        );
        assert_eq!(rules(&result), vec!["write_access"]);
        assert!(result.violations[0].message.contains("CombatSystem"));
    }

    #[test]
    fn test_write_access_to_undeclared_name() {
        let result = run(
            r#"{"components": ["Position"], "systems": [{"name": "MoveSystem", "writeAccess": ["Position", "Velocity"]}]}"#,
            &["Position", "MoveSystem"],
            None,
        );
        assert_eq!(rules(&result), vec!["write_access"]);
        assert_eq!(result.violations[0].name, "MoveSystem");
        assert!(result.violations[0].message.contains("undeclared 'Velocity'"));
    }
}
