//! pypi-publisher CLI
//!
//! Builds, checks and uploads a Python package

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pypi_publisher::{
    CONFIG_FILENAME, ConfigLoadOptions, ConfigLoader, LinePrompter, PackagePublisher,
    PublishConfig, PublishError, PublishOutcome, SafeCommandExecutor,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

/// Build, check and upload a Python package
#[derive(Parser)]
#[command(name = "pypi-publisher")]
#[command(version)]
#[command(about = "Build, check and upload a Python package", long_about = None)]
struct Cli {
    /// Defaults to `publish` in the current directory
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, build, check, confirm and upload
    Publish(PublishArgs),

    /// Write a .publish-config.yaml with the default pipeline
    Init {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Default)]
struct PublishArgs {
    /// Project path (defaults to current directory)
    #[arg(value_name = "PROJECT_PATH")]
    project_path: Option<PathBuf>,

    /// twine repository to upload to (e.g. testpypi)
    #[arg(short, long)]
    repository: Option<String>,

    /// Package name for the install hint (defaults to pyproject.toml)
    #[arg(long)]
    package_name: Option<String>,

    /// Upload without asking for confirmation
    #[arg(short, long)]
    yes: bool,
}

impl PublishArgs {
    /// CLI layer of the configuration
    fn to_config(&self) -> PublishConfig {
        PublishConfig {
            repository: self.repository.clone(),
            package_name: self.package_name.clone(),
            confirm: self.yes.then_some(false),
            ..Default::default()
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    match run().await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run() -> Result<i32> {
    // Usage errors exit 1 rather than clap's 2
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            e.print()?;
            return Ok(code);
        }
    };

    match cli
        .command
        .unwrap_or_else(|| Commands::Publish(PublishArgs::default()))
    {
        Commands::Publish(args) => publish_command(args).await,
        Commands::Init {
            project_path,
            force,
        } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            init_command(path, force).await
        }
    }
}

async fn publish_command(args: PublishArgs) -> Result<i32> {
    let project_path = args
        .project_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let env: HashMap<String, String> = std::env::vars().collect();
    let options = ConfigLoadOptions {
        project_path: project_path.clone(),
        cli_args: Some(args.to_config()),
        env,
    };

    let config = match ConfigLoader::load(options).await {
        Ok(config) => config,
        Err(e) => {
            report_error(&e);
            return Ok(1);
        }
    };

    let mut executor = SafeCommandExecutor::new(&project_path)?;
    if let Some(secs) = config.timeout_secs {
        executor.set_timeout(Duration::from_secs(secs));
    }

    let publisher = PackagePublisher::new(&project_path, config, executor, LinePrompter::stdin());

    match publisher.publish().await {
        Ok(report) => {
            tracing::debug!(
                steps = report.steps.len(),
                duration_ms = report.duration,
                "publish finished"
            );

            if report.outcome == PublishOutcome::Published {
                println!("\n✅ Package successfully published to {}!", report.registry);
                if let Some(install) = report.install_command() {
                    println!("📦 Install with: {}", install);
                }
            }
            Ok(0)
        }
        Err(e) => {
            report_error(&e);
            Ok(1)
        }
    }
}

fn report_error(error: &PublishError) {
    tracing::debug!(code = error.code(), "publish failed");

    eprintln!("❌ {}", error);
    for action in error.suggested_actions() {
        eprintln!("  - {}", action);
    }
}

async fn init_command(project_path: PathBuf, force: bool) -> Result<i32> {
    println!("\n🎯 Initialize pypi-publisher\n");

    let config_path = project_path.join(CONFIG_FILENAME);
    if tokio::fs::try_exists(&config_path).await? && !force {
        eprintln!(
            "⚠️  {} already exists (use --force to overwrite)",
            config_path.display()
        );
        return Ok(1);
    }

    let yaml = serde_yaml::to_string(&PublishConfig::with_defaults())?;
    tokio::fs::write(&config_path, yaml).await?;

    println!("✅ Created {}", config_path.display());
    Ok(0)
}
