//! Deploy Pipeline - Single Entry Point
//!
//! CRITICAL: write access is derived before systems are filtered, and nothing
//! is written until the full render context exists.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::descriptor::{load_descriptor, Descriptor};
use crate::filter::{filter_systems, SystemSelection};
use crate::hashing::{canonical_json, context_digest, sha256_hex};
use crate::locator::{SourceLocator, SourceRoot, DEFAULT_SOURCE_EXTENSION};
use crate::registry::build_writables;
use crate::render::{ArtifactRenderer, MiniJinjaEngine, RenderContext, RenderError};
use crate::validation::{ValidationInput, ValidationPolicy, ValidationResult, ViolationSeverity, Validator};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid deploy config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Cannot write artifact at {path}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Source root unavailable: {0}")]
    SourceRoot(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Overrides the bundled deployment template
    pub template_dir: Option<PathBuf>,
    pub source_extension: String,
    pub validation_policy: ValidationPolicy,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            template_dir: None,
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            validation_policy: ValidationPolicy::default(),
        }
    }
}

/// Outcome of every stage short of rendering
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub context: RenderContext,
    pub validation: ValidationResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedArtifact {
    pub path: PathBuf,
    pub sha256: String,
    pub context_hash: String,
    pub validation: ValidationResult,
}

pub struct DeployPipeline {
    source_root: Box<dyn SourceRoot>,
    locator: SourceLocator,
    renderer: ArtifactRenderer,
    validator: Validator,
    policy: ValidationPolicy,
}

impl DeployPipeline {
    pub fn new(source_root: Box<dyn SourceRoot>, options: DeployOptions) -> Self {
        Self {
            source_root,
            locator: SourceLocator::new(options.source_extension),
            renderer: ArtifactRenderer::new(Box::new(MiniJinjaEngine), options.template_dir),
            validator: Validator::new(),
            policy: options.validation_policy,
        }
    }

    /// Swap in a different renderer (custom engine or template set)
    pub fn with_renderer(mut self, renderer: ArtifactRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Load `config_path` and resolve it against the source tree
    pub fn resolve(
        &self,
        config_path: &Path,
        out_dir: &Path,
        selection: Option<&SystemSelection>,
    ) -> Result<Resolution, PipelineError> {
        let descriptor = load_descriptor(config_path)?;
        self.resolve_descriptor(descriptor, out_dir, selection)
    }

    pub fn resolve_descriptor(
        &self,
        descriptor: Descriptor,
        out_dir: &Path,
        selection: Option<&SystemSelection>,
    ) -> Result<Resolution, PipelineError> {
        let source_dir = self.source_root.source_dir()?;
        let name_to_path = self.locator.locate(&descriptor.all_names(), &source_dir, out_dir)?;

        // Subsystems must be classified before systems are filtered
        let all_writables = build_writables(&descriptor.components, &descriptor.systems);

        let validation = self.validator.validate(&ValidationInput {
            descriptor: &descriptor,
            name_to_path: &name_to_path,
            selection,
        });
        self.apply_policy(&validation)?;

        let Descriptor { components, systems } = descriptor;
        let context = RenderContext {
            components,
            systems: filter_systems(systems, selection),
            name_to_path,
            all_writables,
        };

        Ok(Resolution { context, validation })
    }

    /// Full pass: resolve, render, write `<out_dir>/LibDeploy.sol`
    pub fn generate(
        &self,
        config_path: &Path,
        out_dir: &Path,
        selection: Option<&SystemSelection>,
    ) -> Result<GeneratedArtifact, PipelineError> {
        let Resolution { context, validation } = self.resolve(config_path, out_dir, selection)?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            match canonical_json(&context) {
                Ok(config) => tracing::debug!(%config, "deploy config"),
                Err(e) => tracing::debug!(error = %e, "deploy config not printable"),
            }
        }
        tracing::info!("Generating deployment script");

        let written = self.renderer.write_artifact(&context, out_dir)?;

        Ok(GeneratedArtifact {
            path: written.path,
            sha256: sha256_hex(written.text.as_bytes()),
            context_hash: context_digest(&context)?,
            validation,
        })
    }

    /// Overwrite the artifact with the stub; no descriptor involved
    pub fn reset(&self, out_dir: &Path) -> Result<PathBuf, PipelineError> {
        self.renderer.reset(out_dir)
    }

    fn apply_policy(&self, validation: &ValidationResult) -> Result<(), PipelineError> {
        for v in &validation.violations {
            match v.severity {
                ViolationSeverity::Error | ViolationSeverity::Warning => {
                    tracing::warn!(rule = %v.rule, name = %v.name, "{}", v.message)
                }
                ViolationSeverity::Info => tracing::info!(rule = %v.rule, name = %v.name, "{}", v.message),
            }
        }

        if self.policy == ValidationPolicy::Block && !validation.valid {
            let messages: Vec<_> = validation
                .errors()
                .map(|v| format!("{}: {}", v.rule, v.message))
                .collect();
            return Err(PipelineError::ValidationFailed(messages.join("; ")));
        }

        Ok(())
    }
}
