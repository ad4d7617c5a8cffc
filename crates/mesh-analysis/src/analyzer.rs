//! Analyzer framework.
//!
//! An [`Analyzer`] declares the resource kinds it reads and is handed a
//! [`Context`] giving access to those resources and a diagnostic sink.
//! The [`Registry`] checks the declared inputs against the snapshot before
//! running anything, so analyzers never observe a partially provided input.

use mesh_resource::{ResourceInstance, ResourceKind, Resources, Snapshot};
use tracing::{debug, info, info_span};

use crate::{analyzers::InjectionAnalyzer, Diagnostic, Message, SystemNamespaces};

/// Static description of an analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
	pub name: &'static str,
	pub description: &'static str,
	pub inputs: &'static [ResourceKind],
}

pub trait Analyzer {
	fn metadata(&self) -> Metadata;

	/// Run over the snapshot exposed by `ctx`.
	fn analyze<'s>(&self, ctx: &mut dyn Context<'s>);
}

/// Access to the snapshot and to the diagnostic sink.
///
/// Resources borrow the snapshot, not the context, so reporting while
/// iterating is fine.
pub trait Context<'s> {
	fn resources(&self, kind: ResourceKind) -> Resources<'s>;

	fn report(&mut self, kind: ResourceKind, resource: &ResourceInstance, message: Message);
}

/// [`Context`] over a snapshot, collecting diagnostics in emission order.
pub struct AnalysisContext<'s> {
	snapshot: &'s Snapshot,
	diagnostics: Vec<Diagnostic>,
}

impl<'s> AnalysisContext<'s> {
	pub fn new(snapshot: &'s Snapshot) -> Self {
		Self {
			snapshot,
			diagnostics: Vec::new(),
		}
	}

	pub fn into_diagnostics(self) -> Vec<Diagnostic> {
		self.diagnostics
	}
}

impl<'s> Context<'s> for AnalysisContext<'s> {
	fn resources(&self, kind: ResourceKind) -> Resources<'s> {
		self.snapshot.resources(kind)
	}

	fn report(&mut self, kind: ResourceKind, resource: &ResourceInstance, message: Message) {
		debug!(
			code = message.code(),
			resource = %resource.full_name(),
			"reporting {}",
			message.name()
		);
		self.diagnostics
			.push(Diagnostic::new(kind, resource, message));
	}
}

/// Analyzer which didn't run because the snapshot lacks some of its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAnalyzer {
	pub name: &'static str,
	pub missing: Vec<ResourceKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisResult {
	pub diagnostics: Vec<Diagnostic>,
	pub executed: Vec<&'static str>,
	pub skipped: Vec<SkippedAnalyzer>,
}

/// Ordered set of analyzers run together.
#[derive(Default)]
pub struct Registry {
	analyzers: Vec<Box<dyn Analyzer>>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every built-in analyzer.
	pub fn all(system_namespaces: SystemNamespaces) -> Self {
		let mut registry = Self::new();
		registry.register(InjectionAnalyzer::new().with_system_namespaces(system_namespaces));
		registry
	}

	pub fn register(&mut self, analyzer: impl Analyzer + 'static) -> &mut Self {
		self.analyzers.push(Box::new(analyzer));
		self
	}

	pub fn metadata(&self) -> impl Iterator<Item = Metadata> + '_ {
		self.analyzers.iter().map(|a| a.metadata())
	}

	/// Run every analyzer whose inputs are all available in `snapshot`.
	pub fn analyze(&self, snapshot: &Snapshot) -> AnalysisResult {
		let mut result = AnalysisResult::default();

		for analyzer in &self.analyzers {
			let metadata = analyzer.metadata();
			let missing: Vec<ResourceKind> = metadata
				.inputs
				.iter()
				.copied()
				.filter(|kind| !snapshot.is_available(*kind))
				.collect();
			if !missing.is_empty() {
				info!(
					analyzer = metadata.name,
					missing = ?missing,
					"skipping analyzer, inputs are not available"
				);
				result.skipped.push(SkippedAnalyzer {
					name: metadata.name,
					missing,
				});
				continue;
			}

			let _span = info_span!("analyze", analyzer = metadata.name).entered();
			let mut ctx = AnalysisContext::new(snapshot);
			analyzer.analyze(&mut ctx);
			let diagnostics = ctx.into_diagnostics();
			debug!(count = diagnostics.len(), "analyzer finished");

			result.diagnostics.extend(diagnostics);
			result.executed.push(metadata.name);
		}

		result
	}
}
