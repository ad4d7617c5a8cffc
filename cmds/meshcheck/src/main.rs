use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use meshcheck::{commands, telemetry};
use tracing::Level;

#[cfg(all(target_os = "linux", feature = "mimalloc"))]
#[global_allocator]
static GLOBAL: mimallocator::Mimalloc = mimallocator::Mimalloc;

#[derive(Parser)]
#[command(name = "meshcheck")]
#[command(about = "Static checks for Istio sidecar injection", long_about = None)]
#[command(version)]
struct Cli {
	/// Log level (trace, debug, info, warn, error), overrides RUST_LOG
	#[arg(long, global = true)]
	log_level: Option<Level>,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Check namespaces and pods for sidecar injection problems
	Analyze(commands::analyze::AnalyzeArgs),

	/// Print shell completions
	Completions(commands::completions::CompletionsArgs),
}

fn main() -> Result<ExitCode> {
	let cli = Cli::parse();
	let _telemetry = telemetry::init(cli.log_level)?;

	let stdout = std::io::stdout().lock();

	match cli.command {
		Commands::Analyze(args) => {
			let outcome = commands::analyze::run(args, stdout)?;
			Ok(outcome.exit_code())
		}
		Commands::Completions(args) => {
			commands::completions::run(args, &mut Cli::command(), stdout)?;
			Ok(ExitCode::SUCCESS)
		}
	}
}
