//! PDSC Model Compiler CLI
//!
//! Loads a schema directory, resolves and prunes it, detects recursive types and
//! writes the results.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pdsc_codegen::codegen::emit_to;
use pdsc_codegen::{CodegenConfig, Compiler, ManifestEmitter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdsc-codegen")]
#[command(about = "Resolve PDSC data models and prepare them for code generation")]
struct Cli {
    /// Config file (defaults to pdsc-codegen.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Schema directory (overrides [input].schema_dir)
    #[arg(short, long, global = true)]
    schema_dir: Option<PathBuf>,

    /// Debug logging when RUST_LOG is not set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every model and write the manifest
    Compile {
        /// Output directory (overrides [output].dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the dependency graph in GraphViz DOT format
    Graph {
        /// Output file (defaults to models.dot)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the effective configuration to a file
    Init {
        #[arg(short, long, default_value = "pdsc-codegen.toml")]
        path: PathBuf,
    },

    /// Print the effective configuration
    Show,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose && std::env::var_os("RUST_LOG").is_none() {
        EnvFilter::new("pdsc_codegen=debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = CodegenConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(schema_dir) = cli.schema_dir {
        config.input.schema_dir = schema_dir;
    }

    match cli.command {
        Commands::Compile { output } => {
            let output_dir = output.unwrap_or_else(|| config.output.dir.clone());
            let emitter = ManifestEmitter::new(config.output.format);
            let compiled = compile(config)?;

            let written = emit_to(&emitter, &compiled, &output_dir)
                .with_context(|| format!("Failed to write output to {}", output_dir.display()))?;

            println!(
                "Compiled {} types from {} root document(s), {} cyclic",
                compiled.registry().len(),
                compiled.roots().len(),
                compiled.cyclic().len()
            );
            for path in written {
                println!("  wrote {}", path.display());
            }
            Ok(())
        }

        Commands::Graph { output } => {
            let output_path = output.unwrap_or_else(|| PathBuf::from("models.dot"));
            let compiled = compile(config)?;

            std::fs::write(&output_path, compiled.to_dot())
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            println!("Exported DOT to: {}", output_path.display());
            Ok(())
        }

        Commands::Config { action } => match action {
            ConfigAction::Init { path } => {
                config.save(&path)?;
                println!("Wrote configuration to {}", path.display());
                Ok(())
            }
            ConfigAction::Show => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        },
    }
}

fn compile(config: CodegenConfig) -> anyhow::Result<pdsc_codegen::CompiledModels> {
    let context = format!("Failed to compile models in {}", config.input.schema_dir.display());
    Compiler::new(config).compile().context(context)
}
