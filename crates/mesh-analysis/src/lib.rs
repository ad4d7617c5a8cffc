//! Static analysis of service mesh configuration.
//!
//! Analyzers read a [`mesh_resource::Snapshot`] and report [`Diagnostic`]s,
//! they never modify the snapshot nor the cluster it came from.

mod analyzer;
pub mod analyzers;
pub mod constants;
mod diagnostic;
mod message;
pub mod system_namespaces;

pub use analyzer::{
	AnalysisContext, AnalysisResult, Analyzer, Context, Metadata, Registry, SkippedAnalyzer,
};
pub use diagnostic::Diagnostic;
pub use message::{Level, Message};
pub use system_namespaces::SystemNamespaces;
