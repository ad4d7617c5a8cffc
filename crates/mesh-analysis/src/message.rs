//! Diagnostic message catalogue.
//!
//! Analyzers only pick a [`Message`] variant and fill its arguments, the
//! human-readable text is rendered here.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

const DOCUMENTATION_BASE: &str = "https://istio.io/latest/docs/reference/config/analysis";

/// Severity of a diagnostic, ordered from least to most severe.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
	Info,
	Warning,
	Error,
}

impl Level {
	pub fn as_str(self) -> &'static str {
		match self {
			Level::Info => "Info",
			Level::Warning => "Warning",
			Level::Error => "Error",
		}
	}
}

impl fmt::Display for Level {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A diagnostic kind together with its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Message {
	NamespaceNotInjected {
		namespace: String,
	},
	PodMissingProxy {
		pod: String,
	},
	NamespaceMultipleInjectionLabels {
		namespace: String,
	},
	NamespaceInvalidInjectorRevision {
		namespace: String,
		revision: String,
		/// Revisions in discovery order, joined with `", "`.
		known_revisions: String,
	},
}

impl Message {
	pub fn code(&self) -> &'static str {
		match self {
			Message::NamespaceNotInjected { .. } => "IST0102",
			Message::PodMissingProxy { .. } => "IST0103",
			Message::NamespaceMultipleInjectionLabels { .. } => "IST0123",
			Message::NamespaceInvalidInjectorRevision { .. } => "IST0124",
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Message::NamespaceNotInjected { .. } => "NamespaceNotInjected",
			Message::PodMissingProxy { .. } => "PodMissingProxy",
			Message::NamespaceMultipleInjectionLabels { .. } => "NamespaceMultipleInjectionLabels",
			Message::NamespaceInvalidInjectorRevision { .. } => "NamespaceInvalidInjectorRevision",
		}
	}

	pub fn level(&self) -> Level {
		match self {
			Message::NamespaceNotInjected { .. } => Level::Info,
			Message::PodMissingProxy { .. }
			| Message::NamespaceMultipleInjectionLabels { .. }
			| Message::NamespaceInvalidInjectorRevision { .. } => Level::Warning,
		}
	}

	pub fn documentation_url(&self) -> String {
		format!("{}/{}", DOCUMENTATION_BASE, self.code().to_ascii_lowercase())
	}
}

impl fmt::Display for Message {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Message::NamespaceNotInjected { namespace } => write!(
				f,
				"The namespace is not enabled for Istio injection. \
				 Run 'kubectl label namespace {namespace} istio-injection=enabled' to enable it, \
				 or 'kubectl label namespace {namespace} istio-injection=disabled' \
				 to explicitly mark it as not needing injection."
			),
			Message::PodMissingProxy { .. } => f.write_str(
				"The pod is missing the Istio proxy. \
				 This can often be resolved by restarting or redeploying the workload.",
			),
			Message::NamespaceMultipleInjectionLabels { namespace } => write!(
				f,
				"The namespace has both new and legacy injection labels. \
				 Run 'kubectl label namespace {namespace} istio.io/rev-' \
				 or 'kubectl label namespace {namespace} istio-injection-'"
			),
			Message::NamespaceInvalidInjectorRevision {
				namespace,
				revision,
				known_revisions,
			} => {
				write!(
					f,
					"The namespace is labeled with an invalid injector revision {revision}. \
					 Run 'kubectl label namespace {namespace} istio.io/rev-' "
				)?;
				if known_revisions.is_empty() {
					f.write_str("as no control plane revisions were found")
				} else {
					write!(
						f,
						"or label it with one of the valid revisions: {known_revisions}"
					)
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case::info("info", Level::Info)]
	#[case::warning("Warning", Level::Warning)]
	#[case::error("ERROR", Level::Error)]
	fn test_level_from_flag(#[case] input: &str, #[case] expected: Level) {
		assert_eq!(<Level as ValueEnum>::from_str(input, true), Ok(expected));
	}

	#[test]
	fn test_level_from_flag_unknown() {
		assert!(<Level as ValueEnum>::from_str("fatal", true).is_err());
	}

	#[test]
	fn test_level_from_config() {
		let level: Level = serde_json::from_str(r#""warning""#).unwrap();
		assert_eq!(level, Level::Warning);
	}

	#[test]
	fn test_levels_are_ordered() {
		assert!(Level::Info < Level::Warning);
		assert!(Level::Warning < Level::Error);
	}

	#[test]
	fn test_invalid_revision_text() {
		let message = Message::NamespaceInvalidInjectorRevision {
			namespace: "ns1".to_owned(),
			revision: "stable".to_owned(),
			known_revisions: "canary, beta".to_owned(),
		};
		assert_eq!(message.code(), "IST0124");
		assert_eq!(message.level(), Level::Warning);
		assert_eq!(
			message.to_string(),
			"The namespace is labeled with an invalid injector revision stable. \
			 Run 'kubectl label namespace ns1 istio.io/rev-' \
			 or label it with one of the valid revisions: canary, beta"
		);
	}

	#[test]
	fn test_invalid_revision_text_without_revisions() {
		let message = Message::NamespaceInvalidInjectorRevision {
			namespace: "ns1".to_owned(),
			revision: "stable".to_owned(),
			known_revisions: String::new(),
		};
		assert!(message
			.to_string()
			.ends_with("as no control plane revisions were found"));
	}

	#[test]
	fn test_documentation_url() {
		let message = Message::PodMissingProxy {
			pod: "ns/pod".to_owned(),
		};
		assert_eq!(
			message.documentation_url(),
			"https://istio.io/latest/docs/reference/config/analysis/ist0103"
		);
	}
}
