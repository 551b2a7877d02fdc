//! Command-line interface for the RDLT soundness checker.

use clap::{Parser, Subcommand};
use miette::Diagnostic;
use rdlt_mc::SimConfig;
use rdlt_soundness::{convert_with, parse_rdlt, ConvertOutput};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("failed to read file: {message}")]
    IoError { message: String },

    #[error("failed to write file: {message}")]
    WriteError { message: String },

    #[error("conversion failed: {message}")]
    ConvertError { message: String },

    #[error("invalid input: {message}")]
    InputError { message: String },
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "rdlt", version)]
#[command(about = "Convert RDLT workflows to Petri nets and check soundness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an RDLT JSON file and print the full payload as JSON
    Convert {
        /// Input file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Skip the source/sink extension (also skips analysis)
        #[arg(long)]
        no_extend: bool,

        /// Pretty-print the payload
        #[arg(long)]
        pretty: bool,

        /// Write the payload to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Per-run step bound for the simulator
        #[arg(long, default_value = "1000")]
        max_steps: usize,

        /// Cap on enumerated firing sequences
        #[arg(long, default_value = "1024")]
        max_sequences: usize,
    },

    /// Convert and print a human-readable soundness verdict
    Check {
        /// Input file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Per-run step bound for the simulator
        #[arg(long, default_value = "1000")]
        max_steps: usize,

        /// Cap on enumerated firing sequences
        #[arg(long, default_value = "1024")]
        max_sequences: usize,
    },

    /// Parse an RDLT file and show model statistics
    Info {
        /// Input file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .build(),
        )
    }))
    .ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let result = match cli.command {
        Commands::Convert {
            file,
            no_extend,
            pretty,
            output,
            max_steps,
            max_sequences,
        } => cmd_convert(&file, !no_extend, pretty, output.as_deref(), max_steps, max_sequences),
        Commands::Check {
            file,
            max_steps,
            max_sequences,
        } => cmd_check(&file, max_steps, max_sequences),
        Commands::Info { file } => cmd_info(&file),
    };

    if let Err(e) = result {
        eprintln!("{:?}", miette::Report::new(e));
        std::process::exit(1);
    }
}

fn read_input(file: &std::path::Path) -> CliResult<String> {
    fs::read_to_string(file).map_err(|e| CliError::IoError {
        message: format!("{}: {e}", file.display()),
    })
}

fn run_convert(file: &std::path::Path, extend: bool, sim: &SimConfig) -> CliResult<ConvertOutput> {
    let input = read_input(file)?;
    let out = convert_with(&input, extend, sim);
    for warning in &out.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(out)
}

fn cmd_convert(
    file: &std::path::Path,
    extend: bool,
    pretty: bool,
    output: Option<&std::path::Path>,
    max_steps: usize,
    max_sequences: usize,
) -> CliResult<()> {
    let sim = SimConfig {
        max_steps,
        max_sequences,
    };
    let out = run_convert(file, extend, &sim)?;
    let json = if pretty {
        serde_json::to_string_pretty(&out)
    } else {
        serde_json::to_string(&out)
    }
    .map_err(|e| CliError::ConvertError {
        message: e.to_string(),
    })?;

    match output {
        Some(path) => {
            fs::write(path, &json).map_err(|e| CliError::WriteError {
                message: format!("{}: {e}", path.display()),
            })?;
            info!(path = %path.display(), "payload written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_check(file: &std::path::Path, max_steps: usize, max_sequences: usize) -> CliResult<()> {
    let sim = SimConfig {
        max_steps,
        max_sequences,
    };
    let out = run_convert(file, true, &sim)?;
    let Some(payload) = out.data else {
        return Err(CliError::ConvertError {
            message: out.error.unwrap_or_else(|| "unknown error".to_string()),
        });
    };

    println!(
        "petri net: {} places, {} transitions, {} arcs",
        payload.petri_net.places().len(),
        payload.petri_net.transitions().len(),
        payload.petri_net.arcs().len()
    );

    if let Some(structural) = &payload.struct_analysis {
        if structural.issues.is_empty() {
            println!("structure:  ok");
        } else {
            println!("structure:  {} issue(s)", structural.issues.len());
            for issue in &structural.issues {
                println!("  - {issue}");
            }
        }
    }

    if let Some(behaviour) = &payload.behavior_analysis {
        println!("sequences:  {}", behaviour.per_sequence_results.len());
        println!("liveness:   {}", behaviour.overall_liveness);
        println!("termination: {:?}", behaviour.overall_termination);
        println!("soundness:  {:?}", behaviour.overall_soundness);
    }
    Ok(())
}

fn cmd_info(file: &std::path::Path) -> CliResult<()> {
    let input = read_input(file)?;
    let rdlt = parse_rdlt(&input).map_err(|e| CliError::InputError {
        message: e.to_string(),
    })?;

    println!("vertices: {}", rdlt.vertex_count());
    println!("edges:    {}", rdlt.edge_count());
    println!("sources:  {}", rdlt.sources().join(", "));
    println!("sinks:    {}", rdlt.sinks().join(", "));

    let centers = rdlt.reset_centers();
    if centers.is_empty() {
        println!("reset-bound subsystems: none");
    } else {
        println!("reset-bound subsystems:");
        for center in centers {
            let members = rdlt.vertices_in_rbs(&center);
            println!("  {center}: {}", members.join(", "));
        }
    }
    Ok(())
}
