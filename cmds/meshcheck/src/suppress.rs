//! Diagnostic suppression rules.
//!
//! A rule is written `CODE=Kind namespace/name`, e.g.
//! `IST0102=Namespace frod` or `IST0103=Pod default/*`. Both sides accept
//! `*` as a wildcard matching any run of characters.

use std::{fmt, str::FromStr};

use mesh_analysis::Diagnostic;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SuppressionError {
	#[error("suppression `{0}` must have the form CODE=Kind name")]
	Syntax(String),

	#[error("suppression `{0}` has an empty code")]
	EmptyCode(String),

	#[error("suppression `{0}` has an empty resource")]
	EmptyResource(String),

	#[error("invalid suppression pattern")]
	Pattern(#[from] regex::Error),
}

/// Drops diagnostics whose code and resource reference both match.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "SuppressionConfig")]
pub struct Suppression {
	code: Regex,
	resource: Regex,
	raw: String,
}

/// Shape of a suppression entry in `.meshcheck.yaml`.
#[derive(Debug, Deserialize)]
struct SuppressionConfig {
	code: String,
	resource: String,
}

impl TryFrom<SuppressionConfig> for Suppression {
	type Error = SuppressionError;

	fn try_from(value: SuppressionConfig) -> Result<Self, Self::Error> {
		Self::new(&value.code, &value.resource)
	}
}

/// Anchored regex where `*` matches anything and every other character is literal.
fn wildcard(pattern: &str) -> Result<Regex, regex::Error> {
	let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
	Regex::new(&format!("^{}$", escaped.join(".*")))
}

impl Suppression {
	pub fn new(code: &str, resource: &str) -> Result<Self, SuppressionError> {
		let raw = format!("{code}={resource}");
		let code = code.trim();
		let resource = resource.trim();
		if code.is_empty() {
			return Err(SuppressionError::EmptyCode(raw));
		}
		if resource.is_empty() {
			return Err(SuppressionError::EmptyResource(raw));
		}
		Ok(Self {
			code: wildcard(code)?,
			resource: wildcard(resource)?,
			raw: format!("{code}={resource}"),
		})
	}

	pub fn matches(&self, diagnostic: &Diagnostic) -> bool {
		self.code.is_match(diagnostic.code()) && self.resource.is_match(&diagnostic.reference())
	}
}

impl FromStr for Suppression {
	type Err = SuppressionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (code, resource) = s
			.split_once('=')
			.ok_or_else(|| SuppressionError::Syntax(s.to_owned()))?;
		Self::new(code, resource)
	}
}

impl fmt::Display for Suppression {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.raw)
	}
}

/// Whether any of `suppressions` drops `diagnostic`.
pub fn is_suppressed(suppressions: &[Suppression], diagnostic: &Diagnostic) -> bool {
	suppressions.iter().any(|s| s.matches(diagnostic))
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use k8s_openapi::{api::core::v1::Pod, apimachinery::pkg::apis::meta::v1::ObjectMeta};
	use mesh_analysis::Message;
	use mesh_resource::{ResourceInstance, ResourceKind};
	use rstest::rstest;

	use super::*;

	fn pod_diagnostic(namespace: &str, name: &str) -> Diagnostic {
		let pod = ResourceInstance::from_pod(
			Pod {
				metadata: ObjectMeta {
					name: Some(name.to_owned()),
					namespace: Some(namespace.to_owned()),
					..ObjectMeta::default()
				},
				..Pod::default()
			},
			None,
		)
		.unwrap();
		Diagnostic::new(
			ResourceKind::Pod,
			&pod,
			Message::PodMissingProxy {
				pod: format!("{namespace}/{name}"),
			},
		)
	}

	#[rstest]
	#[case::exact("IST0103=Pod default/web", true)]
	#[case::resource_wildcard("IST0103=Pod default/*", true)]
	#[case::code_wildcard("*=Pod default/web", true)]
	#[case::other_code("IST0102=Pod default/web", false)]
	#[case::other_kind("IST0103=Namespace default/web", false)]
	#[case::other_namespace("IST0103=Pod prod/*", false)]
	#[case::dot_is_literal("IST0103=Pod default.web", false)]
	fn test_matches(#[case] rule: &str, #[case] expected: bool) {
		let suppression: Suppression = rule.parse().unwrap();
		assert_eq!(
			suppression.matches(&pod_diagnostic("default", "web")),
			expected
		);
	}

	#[test]
	fn test_parse_errors() {
		assert_matches!(
			"IST0103".parse::<Suppression>(),
			Err(SuppressionError::Syntax(_))
		);
		assert_matches!(
			"=Pod default/web".parse::<Suppression>(),
			Err(SuppressionError::EmptyCode(_))
		);
		assert_matches!(
			"IST0103= ".parse::<Suppression>(),
			Err(SuppressionError::EmptyResource(_))
		);
	}

	#[test]
	fn test_display_is_normalized() {
		let suppression: Suppression = " IST0102 = Namespace frod".parse().unwrap();
		assert_eq!(suppression.to_string(), "IST0102=Namespace frod");
	}

	#[test]
	fn test_deserialize() {
		let suppression: Suppression =
			serde_yaml::from_str("code: IST0102\nresource: Namespace *").unwrap();
		assert_eq!(suppression.to_string(), "IST0102=Namespace *");

		let err = serde_yaml::from_str::<Suppression>("code: ''\nresource: Namespace a");
		assert!(err.is_err());
	}
}
