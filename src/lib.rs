//! ECS Deploy Core - Deployment Library Generator
//!
//! # Resolution Order (Non-Negotiable)
//! 1. Load the descriptor
//! 2. Locate sources for every declared name
//! 3. Derive write access from the FULL systems list
//! 4. Filter systems to the requested subset
//! 5. Render, then write

pub mod descriptor;
pub mod locator;
pub mod registry;
pub mod filter;
pub mod validation;
pub mod hashing;
pub mod render;
pub mod pipeline;

pub use descriptor::{Descriptor, SystemEntry, SystemKind, Kind, load_descriptor};
pub use locator::{SourceLocator, SourceRoot, FixedSourceRoot, ForgeSourceRoot, NameToPath};
pub use registry::{Writable, Registry, build_writables};
pub use filter::{SystemSelection, filter_systems};
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, ValidationPolicy, ViolationSeverity};
pub use hashing::{sha256_hex, canonical_json};
pub use render::{ArtifactRenderer, MiniJinjaEngine, RenderContext, RenderError, TemplateEngine, TemplateSource, WrittenArtifact, stub_artifact};
pub use pipeline::{DeployPipeline, DeployOptions, GeneratedArtifact, Resolution, PipelineError};

/// Fixed filename of the generated deployment library
pub const ARTIFACT_FILENAME: &str = "LibDeploy.sol";

/// Reserved suffix that turns a system into a writable subsystem
pub const SUBSYSTEM_SUFFIX: &str = "Subsystem";
