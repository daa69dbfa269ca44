//! ECS Deploy CLI - deploy.json to LibDeploy.sol
//!
//! Commands: deploy, reset, check, types
//! Outputs JSON to stdout, logs to stderr
//! Returns non-zero on failure

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use ecsdeploy_core::{
    ArtifactRenderer, DeployOptions, DeployPipeline, FixedSourceRoot, ForgeSourceRoot, PipelineError,
    SourceRoot, SystemSelection, ValidationPolicy,
};

#[derive(Parser)]
#[command(name = "ecsdeploy-cli")]
#[command(about = "ECS Deploy CLI - generates LibDeploy.sol from deploy.json")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Source directory to scan; defaults to `forge config`'s src
    #[arg(long)]
    src: Option<PathBuf>,

    /// Directory holding LibDeploy.sol.j2
    #[arg(long)]
    templates: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate LibDeploy.sol
    Deploy {
        /// Component and system deployment configuration
        #[arg(short, long, default_value = "./deploy.json")]
        config: PathBuf,

        /// Output directory for LibDeploy.sol
        #[arg(short, long)]
        out: PathBuf,

        /// Only deploy these systems (comma separated)
        #[arg(long, value_delimiter = ',')]
        systems: Option<Vec<String>>,

        /// Abort when validation finds errors
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Replace LibDeploy.sol with the stub
    Reset {
        /// Output directory holding LibDeploy.sol
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Resolve and validate without writing anything
    Check {
        #[arg(short, long, default_value = "./deploy.json")]
        config: PathBuf,

        /// Output directory paths are made relative to
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        #[arg(long, value_delimiter = ',')]
        systems: Option<Vec<String>>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Resolve the descriptor for the type binding generator
    Types {
        /// Input directory of existing ABI to use to generate types
        #[arg(long = "abi-dir", visible_alias = "abiDir")]
        abi_dir: Option<PathBuf>,

        /// Output directory for generated types
        #[arg(long = "output-dir", visible_alias = "outputDir", default_value = "./types")]
        output_dir: PathBuf,

        /// Component and system deployment configuration
        #[arg(long, default_value = "./deploy.json")]
        config: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn pipeline(source: SourceArgs, policy: ValidationPolicy) -> DeployPipeline {
    let root: Box<dyn SourceRoot> = match source.src {
        Some(dir) => Box::new(FixedSourceRoot(dir)),
        None => Box::new(ForgeSourceRoot::new(".")),
    };

    let mut options = DeployOptions {
        validation_policy: policy,
        ..DeployOptions::default()
    };
    if let Some(dir) = source.templates {
        options.template_dir = Some(dir);
    }

    DeployPipeline::new(root, options)
}

fn failure(e: PipelineError) -> ExitCode {
    let output = serde_json::json!({
        "success": false,
        "error": e.to_string(),
    });
    println!("{}", output);
    ExitCode::FAILURE
}

fn write_context(output_dir: &Path, value: &serde_json::Value) -> Result<PathBuf, PipelineError> {
    let path = output_dir.join("deploy-context.json");
    let write_err = |source| PipelineError::ArtifactWrite { path: path.clone(), source };
    fs::create_dir_all(output_dir).map_err(write_err)?;
    fs::write(&path, serde_json::to_string_pretty(value)?).map_err(write_err)?;
    Ok(path)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Deploy { config, out, systems, strict, source } => {
            let policy = if strict { ValidationPolicy::Block } else { ValidationPolicy::Warn };
            let selection = systems.map(SystemSelection::from);

            match pipeline(source, policy).generate(&config, &out, selection.as_ref()) {
                Ok(artifact) => {
                    let output = serde_json::json!({
                        "success": true,
                        "artifact": artifact,
                    });
                    println!("{}", output);
                    ExitCode::SUCCESS
                }
                Err(e) => failure(e),
            }
        }

        Commands::Reset { out } => {
            match ArtifactRenderer::default().reset(&out) {
                Ok(path) => {
                    println!("{}", serde_json::json!({ "success": true, "path": path }));
                    ExitCode::SUCCESS
                }
                Err(e) => failure(e),
            }
        }

        Commands::Check { config, out, systems, source } => {
            let selection = systems.map(SystemSelection::from);

            match pipeline(source, ValidationPolicy::Warn).resolve(&config, &out, selection.as_ref()) {
                Ok(resolution) => {
                    println!("{}", serde_json::json!(resolution.validation));
                    if resolution.validation.valid {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::from(2) // Validation failure
                    }
                }
                Err(e) => failure(e),
            }
        }

        Commands::Types { abi_dir, output_dir, config, source } => {
            let resolved = pipeline(source, ValidationPolicy::Warn)
                .resolve(&config, &output_dir, None)
                .and_then(|resolution| {
                    let value = serde_json::json!({
                        "abiDir": abi_dir,
                        "context": resolution.context,
                    });
                    write_context(&output_dir, &value)
                });

            match resolved {
                Ok(path) => {
                    tracing::info!(path = %path.display(), "resolved context ready for type generation");
                    println!("{}", serde_json::json!({ "success": true, "path": path }));
                    ExitCode::SUCCESS
                }
                Err(e) => failure(e),
            }
        }
    }
}
