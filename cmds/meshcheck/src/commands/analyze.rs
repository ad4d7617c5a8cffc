//! Analyze command handler.

use std::{
	io::{Read, Write},
	path::PathBuf,
	process::ExitCode,
};

use anyhow::{bail, Context, Result};
use clap::Args;
use itertools::Itertools;
use mesh_analysis::{Diagnostic, Level, Registry, SystemNamespaces};
use mesh_resource::Snapshot;
use tracing::{info, instrument, warn};

use crate::{
	cluster,
	config::MeshcheckConfig,
	output::{ColorMode, OutputFormat, Printer},
	suppress::{is_suppressed, Suppression},
};

/// Exit code of a run that found diagnostics at or above the failure threshold.
pub const ISSUES_FOUND_EXIT_CODE: u8 = 79;

const DEFAULT_OUTPUT_THRESHOLD: Level = Level::Info;
const DEFAULT_FAILURE_THRESHOLD: Level = Level::Warning;

#[derive(Args, Debug, Default)]
pub struct AnalyzeArgs {
	/// Manifest files or directories, `-` reads from stdin
	pub paths: Vec<PathBuf>,

	/// Read namespaces and pods from the current Kubernetes cluster
	#[arg(short = 'k', long)]
	pub use_kube: bool,

	/// Kubeconfig context to use with --use-kube
	#[arg(long, requires = "use_kube")]
	pub context: Option<String>,

	#[arg(short, long, value_enum, default_value_t = OutputFormat::Log)]
	pub output: OutputFormat,

	#[arg(long, value_enum, default_value_t = ColorMode::Auto)]
	pub color: ColorMode,

	/// Hide diagnostics below this level [default: info]
	#[arg(long, value_enum)]
	pub output_threshold: Option<Level>,

	/// Exit with code 79 when a diagnostic at or above this level remains [default: warning]
	#[arg(long, value_enum)]
	pub failure_threshold: Option<Level>,

	/// Suppress diagnostics matching CODE=Kind name, `*` is a wildcard
	#[arg(short = 'S', long = "suppress", value_name = "CODE=RESOURCE")]
	pub suppress: Vec<Suppression>,

	/// Print the available analyzers and exit
	#[arg(long)]
	pub list_analyzers: bool,

	/// Config file to use instead of searching for .meshcheck.yaml
	#[arg(long)]
	pub config: Option<PathBuf>,
}

/// Settings after merging the config file under the command line.
#[derive(Debug)]
struct Settings {
	system_namespaces: SystemNamespaces,
	suppressions: Vec<Suppression>,
	output_threshold: Level,
	failure_threshold: Level,
}

impl Settings {
	fn resolve(args: &AnalyzeArgs, config: MeshcheckConfig) -> Self {
		let mut suppressions = config.suppress;
		suppressions.extend(args.suppress.iter().cloned());
		Self {
			system_namespaces: SystemNamespaces::new(config.system_namespaces),
			suppressions,
			output_threshold: args
				.output_threshold
				.or(config.output_threshold)
				.unwrap_or(DEFAULT_OUTPUT_THRESHOLD),
			failure_threshold: args
				.failure_threshold
				.or(config.failure_threshold)
				.unwrap_or(DEFAULT_FAILURE_THRESHOLD),
		}
	}
}

/// What a run found, turned into the process exit code by the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeOutcome {
	/// Diagnostics remaining after suppression, in emission order.
	pub diagnostics: Vec<Diagnostic>,
	pub failure_threshold: Level,
}

impl AnalyzeOutcome {
	pub fn failed(&self) -> bool {
		self.diagnostics
			.iter()
			.any(|d| d.level() >= self.failure_threshold)
	}

	pub fn exit_code(&self) -> ExitCode {
		if self.failed() {
			ExitCode::from(ISSUES_FOUND_EXIT_CODE)
		} else {
			ExitCode::SUCCESS
		}
	}
}

fn load_config(args: &AnalyzeArgs) -> Result<MeshcheckConfig> {
	if let Some(path) = &args.config {
		return MeshcheckConfig::load_from_file(path);
	}
	let cwd = std::env::current_dir().context("resolving working directory")?;
	Ok(MeshcheckConfig::load_from_directory(&cwd)?.unwrap_or_default())
}

/// Files first, then the live cluster.
fn build_snapshot(args: &AnalyzeArgs) -> Result<Snapshot> {
	if args.paths.is_empty() && !args.use_kube {
		bail!("nothing to analyze: pass manifest paths or --use-kube");
	}

	let mut builder = Snapshot::builder();
	for path in &args.paths {
		if path.as_os_str() == "-" {
			let mut src = String::new();
			std::io::stdin()
				.read_to_string(&mut src)
				.context("reading manifests from stdin")?;
			builder.add_yaml_str(&src, None)?;
		} else {
			builder
				.add_path(path)
				.with_context(|| format!("loading {}", path.display()))?;
		}
	}
	if args.use_kube {
		cluster::collect(&mut builder, args.context.as_deref())
			.context("reading resources from the cluster")?;
	}
	Ok(builder.build())
}

/// Human readable name of what was analyzed.
fn describe_target(args: &AnalyzeArgs) -> String {
	let files = args
		.paths
		.iter()
		.map(|p| {
			if p.as_os_str() == "-" {
				"stdin".to_owned()
			} else {
				p.display().to_string()
			}
		})
		.join(", ");
	match (files.is_empty(), args.use_kube) {
		(true, _) => "the cluster".to_owned(),
		(false, true) => format!("{files} and the cluster"),
		(false, false) => files,
	}
}

fn list_analyzers<W: Write>(registry: &Registry, mut writer: W) -> Result<()> {
	for metadata in registry.metadata() {
		writeln!(
			writer,
			"{}\t{}\t[{}]",
			metadata.name,
			metadata.description,
			metadata.inputs.iter().map(|k| k.collection()).join(", ")
		)?;
	}
	Ok(())
}

/// Run the analyze command.
#[instrument(skip_all)]
pub fn run<W: Write>(args: AnalyzeArgs, writer: W) -> Result<AnalyzeOutcome> {
	let config = load_config(&args)?;
	let settings = Settings::resolve(&args, config);
	let registry = Registry::all(settings.system_namespaces);

	if args.list_analyzers {
		list_analyzers(&registry, writer)?;
		return Ok(AnalyzeOutcome {
			diagnostics: Vec::new(),
			failure_threshold: settings.failure_threshold,
		});
	}

	let snapshot = build_snapshot(&args)?;
	info!(resources = snapshot.len(), "analyzing snapshot");

	let result = registry.analyze(&snapshot);
	for skipped in &result.skipped {
		warn!(
			analyzer = skipped.name,
			missing = ?skipped.missing,
			"analyzer skipped"
		);
	}

	let total = result.diagnostics.len();
	let diagnostics: Vec<Diagnostic> = result
		.diagnostics
		.into_iter()
		.filter(|d| !is_suppressed(&settings.suppressions, d))
		.collect();
	info!(
		total,
		suppressed = total - diagnostics.len(),
		"analysis finished"
	);

	let shown: Vec<Diagnostic> = diagnostics
		.iter()
		.filter(|d| d.level() >= settings.output_threshold)
		.cloned()
		.collect();
	Printer::new(writer, args.output, args.color).print(&shown, &describe_target(&args))?;

	Ok(AnalyzeOutcome {
		diagnostics,
		failure_threshold: settings.failure_threshold,
	})
}
