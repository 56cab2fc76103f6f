use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use stagehand::app::{handle_fatal_error, init_logging, AppConfig};
use stagehand::interpolation::{resolve_manifest, ResolveOptions};
use stagehand::manifest::{Manifest, Scalar, Step};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve placeholders and environments in pipeline manifests
#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "Resolve pipeline manifests into concrete, ready-to-run steps", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Ignore the host environment entirely
    #[arg(long, global = true)]
    isolated: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the fully resolved manifest
    Resolve {
        /// Path to the manifest file
        manifest: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
    /// Print the final environment of each step as KEY=value lines
    Env {
        /// Path to the manifest file
        manifest: PathBuf,

        /// Only print the environment of this step
        #[arg(long)]
        step: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::new(cli.verbose) {
        Ok(config) => config.with_isolated_host_env(cli.isolated),
        Err(e) => handle_fatal_error(e, cli.verbose),
    };
    init_logging(&config);

    let result = match cli.command {
        Commands::Resolve { manifest, format } => run_resolve(&config, &manifest, format),
        Commands::Env { manifest, step } => run_env(&config, &manifest, step.as_deref()),
    };

    if let Err(e) = result {
        handle_fatal_error(e, config.verbose);
    }
}

fn load_resolved(config: &AppConfig, path: &Path) -> anyhow::Result<Manifest> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        config.working_dir.join(path)
    };
    let mut manifest = Manifest::load(&path)?;

    let options = if config.isolate_host_env {
        ResolveOptions::default().with_host_env(HashMap::new())
    } else {
        ResolveOptions::from_process()
    };
    debug!("Resolving with {} host variables", options.host_env.len());

    resolve_manifest(&mut manifest, &options)
        .with_context(|| format!("Failed to resolve manifest {}", path.display()))?;
    Ok(manifest)
}

fn run_resolve(config: &AppConfig, path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let manifest = load_resolved(config, path)?;
    let rendered = match format {
        OutputFormat::Yaml => manifest.to_yaml()?,
        OutputFormat::Json => manifest.to_json()?,
    };
    print!("{}", rendered);
    if !rendered.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn run_env(config: &AppConfig, path: &Path, step: Option<&str>) -> anyhow::Result<()> {
    let manifest = load_resolved(config, path)?;

    let selected: Vec<(usize, &Step)> = match step {
        Some(name) => {
            let index = manifest
                .step_index(name)
                .with_context(|| format!("No step named '{}' in manifest", name))?;
            vec![(index, &manifest.steps[index])]
        }
        None => manifest.steps.iter().enumerate().collect(),
    };

    for (index, step) in selected {
        let suffix = if step.skip { " (skipped)" } else { "" };
        println!("# {}{}", step.label(index), suffix);
        for (key, value) in &step.env {
            println!("{}={}", key, render_env_value(value));
        }
    }
    Ok(())
}

fn render_env_value(value: &Scalar) -> String {
    match value {
        Scalar::Null => String::new(),
        other => other.to_string(),
    }
}
