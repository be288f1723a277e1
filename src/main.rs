//! Search-supervisor CLI: run an external tool under output supervision.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use search_supervisor::config::ConfigLoader;
use search_supervisor::display::{ConsoleReport, OutputFormat};
use search_supervisor::process::ProcessDescriptor;
use search_supervisor::supervisor::{RunOutcome, ToolSupervisor};

/// Exit code for a cancelled run, matching the shell convention for SIGINT.
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(
    name = "search-supervisor",
    about = "Run proteomics search tools with live output classification",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tool and classify its console output.
    Run {
        /// Tool name selecting the parsing strategy (e.g. comet, msconvert,
        /// thermorawfileparser, metamorpheus); unknown names get the
        /// generic strategy.
        #[arg(short, long)]
        tool: String,

        /// Label of the processed file, named in the completion summary.
        #[arg(short, long, default_value = "input")]
        file_label: String,

        /// Working directory for the tool process.
        #[arg(long)]
        working_dir: Option<PathBuf>,

        /// Leave stderr out of the parsed stream.
        #[arg(long)]
        separate_stderr: bool,

        /// Marker configuration file for the multi-task strategy.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Emit events as JSON lines instead of colored text.
        #[arg(long)]
        json: bool,

        /// Tool executable followed by its arguments.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            tool,
            file_label,
            working_dir,
            separate_stderr,
            config,
            json,
            command,
        } => {
            run(
                &tool,
                &file_label,
                working_dir,
                separate_stderr,
                config,
                json,
                &command,
            )
            .await
        }
    }
}

async fn run(
    tool: &str,
    file_label: &str,
    working_dir: Option<PathBuf>,
    separate_stderr: bool,
    config: Option<PathBuf>,
    json: bool,
    command: &[String],
) -> ExitCode {
    let loader = config.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let markers = match loader.load() {
        Ok(markers) => markers,
        Err(e) => {
            tracing::error!(error = %e, "could not load marker configuration");
            return ExitCode::from(2);
        }
    };

    let Some((executable, tool_args)) = command.split_first() else {
        // Unreachable behind clap's required arg, kept as a plain failure.
        tracing::error!("no tool command given");
        return ExitCode::from(2);
    };

    let mut descriptor = ProcessDescriptor::new(executable).args(tool_args.iter().cloned());
    if let Some(dir) = working_dir {
        descriptor = descriptor.working_dir(dir);
    }
    if separate_stderr {
        descriptor = descriptor.separate_stderr();
    }

    let format = if json {
        OutputFormat::Json
    } else {
        OutputFormat::Plain
    };
    let sink = Arc::new(ConsoleReport::new(format));

    let mut supervisor =
        ToolSupervisor::new(descriptor, tool, file_label, sink).with_markers(markers);

    let handle = supervisor.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling run");
            handle.cancel();
        }
    });

    match supervisor.run().await {
        Ok(RunOutcome::Completed { elapsed }) => {
            tracing::info!(?elapsed, "run completed");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Cancelled) => {
            tracing::warn!("run cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}
