//! Artifact Renderer - template boundary and LibDeploy.sol output
//!
//! Rendering always completes before anything touches the output directory.
//! The deployment template and the stub are compiled into the binary; a
//! template directory is only consulted when one is configured.

use minijinja::{path_loader, Environment};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::descriptor::SystemEntry;
use crate::locator::NameToPath;
use crate::pipeline::PipelineError;
use crate::registry::Writable;
use crate::ARTIFACT_FILENAME;

pub const DEPLOY_TEMPLATE: &str = "LibDeploy.sol.j2";

pub const BUNDLED_DEPLOY_TEMPLATE: &str = include_str!("../templates/LibDeploy.sol.j2");

pub const STUB_ARTIFACT: &str = include_str!("../templates/LibDeployStub.sol");

/// Environment holding the bundled template, compiled on first use
static BUNDLED_ENV: OnceCell<Environment<'static>> = OnceCell::new();

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template {template} failed to render: {source}")]
    Engine {
        template: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Everything the deployment template sees
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderContext {
    pub components: Vec<String>,
    pub systems: Vec<SystemEntry>,
    pub name_to_path: NameToPath,
    pub all_writables: Vec<Writable>,
}

/// Which deployment template to render
#[derive(Debug, Clone, Copy)]
pub enum TemplateSource<'a> {
    Bundled,
    File(&'a Path),
}

impl TemplateSource<'_> {
    pub fn display_name(&self) -> String {
        match self {
            Self::Bundled => format!("<bundled>/{}", DEPLOY_TEMPLATE),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// `render(template, context) -> text`
pub trait TemplateEngine {
    fn render(&self, template: TemplateSource<'_>, context: &Value) -> Result<String, RenderError>;
}

/// Jinja-flavoured engine; file templates resolve includes from their own directory
#[derive(Debug, Default, Clone, Copy)]
pub struct MiniJinjaEngine;

fn base_env() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env
}

impl TemplateEngine for MiniJinjaEngine {
    fn render(&self, template: TemplateSource<'_>, context: &Value) -> Result<String, RenderError> {
        let engine_err = |source| RenderError::Engine {
            template: template.display_name(),
            source,
        };

        match template {
            TemplateSource::Bundled => {
                let env = BUNDLED_ENV
                    .get_or_try_init(|| {
                        let mut env = base_env();
                        env.add_template(DEPLOY_TEMPLATE, BUNDLED_DEPLOY_TEMPLATE)?;
                        Ok::<_, minijinja::Error>(env)
                    })
                    .map_err(engine_err)?;
                let tmpl = env.get_template(DEPLOY_TEMPLATE).map_err(engine_err)?;
                tmpl.render(context).map_err(engine_err)
            }
            TemplateSource::File(path) => {
                let dir = path.parent().unwrap_or_else(|| Path::new("."));
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();

                let mut env = base_env();
                env.set_loader(path_loader(dir));

                let tmpl = env.get_template(&name).map_err(engine_err)?;
                tmpl.render(context).map_err(engine_err)
            }
        }
    }
}

/// A written deployment library and the exact text it holds
#[derive(Debug, Clone)]
pub struct WrittenArtifact {
    pub path: PathBuf,
    pub text: String,
}

pub struct ArtifactRenderer {
    engine: Box<dyn TemplateEngine>,
    template_dir: Option<PathBuf>,
}

impl ArtifactRenderer {
    /// `template_dir` overrides the bundled template with `<dir>/LibDeploy.sol.j2`
    pub fn new(engine: Box<dyn TemplateEngine>, template_dir: Option<PathBuf>) -> Self {
        Self { engine, template_dir }
    }

    pub fn render(&self, context: &RenderContext) -> Result<String, PipelineError> {
        let value = serde_json::to_value(context)?;
        let text = match &self.template_dir {
            Some(dir) => self.engine.render(TemplateSource::File(&dir.join(DEPLOY_TEMPLATE)), &value)?,
            None => self.engine.render(TemplateSource::Bundled, &value)?,
        };
        Ok(text)
    }

    /// Render `context` and write it to `<out_dir>/LibDeploy.sol`
    pub fn write_artifact(&self, context: &RenderContext, out_dir: &Path) -> Result<WrittenArtifact, PipelineError> {
        let text = self.render(context)?;
        let path = write_to(out_dir, &text)?;
        Ok(WrittenArtifact { path, text })
    }

    /// Replace the artifact with the bundled stub
    pub fn reset(&self, out_dir: &Path) -> Result<PathBuf, PipelineError> {
        write_to(out_dir, stub_artifact())
    }
}

impl Default for ArtifactRenderer {
    fn default() -> Self {
        Self::new(Box::new(MiniJinjaEngine), None)
    }
}

/// Descriptor-independent placeholder library
pub fn stub_artifact() -> &'static str {
    STUB_ARTIFACT
}

fn write_to(out_dir: &Path, text: &str) -> Result<PathBuf, PipelineError> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| PipelineError::ArtifactWrite { path, source }
    };

    fs::create_dir_all(out_dir).map_err(write_err(out_dir))?;
    let path = out_dir.join(ARTIFACT_FILENAME);
    fs::write(&path, text).map_err(write_err(&path))?;

    tracing::info!(path = %path.display(), "wrote deployment library");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_context() -> RenderContext {
        RenderContext {
            components: vec!["Position".to_string()],
            systems: vec![SystemEntry::new("MoveSystem")],
            name_to_path: [
                ("Position".to_string(), "../src/Position.sol".to_string()),
                ("MoveSystem".to_string(), "../src/MoveSystem.sol".to_string()),
            ]
            .into_iter()
            .collect(),
            all_writables: crate::registry::build_writables(&["Position".to_string()], &[]),
        }
    }

    #[test]
    fn test_minijinja_renders_with_includes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("header.j2"), "// {{ title }}\n").unwrap();
        fs::write(
            dir.path().join("main.j2"),
            "{% include 'header.j2' %}{% for c in components %}\n{{ c }}\n{% endfor %}",
        ).unwrap();

        let main = dir.path().join("main.j2");
        let text = MiniJinjaEngine
            .render(TemplateSource::File(&main), &json!({"title": "gen", "components": ["A", "B"]}))
            .unwrap();
        assert_eq!(text, "// gen\nA\nB\n");
    }

    #[test]
    fn test_missing_template_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.j2");
        let err = MiniJinjaEngine.render(TemplateSource::File(&absent), &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::Engine { .. }));
        assert!(err.to_string().contains("absent.j2"));
    }

    #[test]
    fn test_bundled_template_needs_no_directory() {
        let dir = tempfile::tempdir().unwrap();
        let written = ArtifactRenderer::default().write_artifact(&sample_context(), dir.path()).unwrap();

        assert_eq!(fs::read_to_string(&written.path).unwrap(), written.text);
        assert!(written.text.contains(r#"import { Position, ID as PositionID } from "../src/Position.sol";"#));
        assert!(written.text.contains("system = new MoveSystem(world, address(components));"));
    }

    #[test]
    fn test_template_dir_overrides_bundled() {
        let templates = tempfile::tempdir().unwrap();
        fs::write(templates.path().join("parts.j2"), "{{ components|join(',') }}").unwrap();
        fs::write(templates.path().join(DEPLOY_TEMPLATE), "custom:{% include 'parts.j2' %}\n").unwrap();

        let renderer = ArtifactRenderer::new(Box::new(MiniJinjaEngine), Some(templates.path().to_path_buf()));
        assert_eq!(renderer.render(&sample_context()).unwrap(), "custom:Position\n");
    }

    #[test]
    fn test_reset_without_template_directory() {
        let dir = tempfile::tempdir().unwrap();
        // A configured directory that does not exist plays no part in reset
        let renderer = ArtifactRenderer::new(Box::new(MiniJinjaEngine), Some(dir.path().join("gone")));

        let path = renderer.reset(&dir.path().join("out")).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), STUB_ARTIFACT);
        assert!(STUB_ARTIFACT.contains("library LibDeploy"));
    }

    #[test]
    fn test_write_creates_missing_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a/b/c");
        let path = write_to(&out, "x").unwrap();
        assert_eq!(path, out.join(ARTIFACT_FILENAME));
        assert_eq!(fs::read_to_string(path).unwrap(), "x");
    }

    #[test]
    fn test_unwritable_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();
        // A regular file where a directory must go
        let err = write_to(&blocker.join("out"), "x").unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactWrite { .. }));
    }
}
