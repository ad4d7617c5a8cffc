use std::fmt;

use serde::Serialize;

/// Kind of a resource in the snapshot.
///
/// Analyzers declare the kinds they consume, and the snapshot groups its
/// resources by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ResourceKind {
	Namespace,
	Pod,
}

impl ResourceKind {
	pub const ALL: [ResourceKind; 2] = [ResourceKind::Namespace, ResourceKind::Pod];

	/// Stable collection name, used when listing analyzer inputs.
	pub fn collection(self) -> &'static str {
		match self {
			ResourceKind::Namespace => "k8s/core/v1/namespaces",
			ResourceKind::Pod => "k8s/core/v1/pods",
		}
	}

	/// Kind as it is written in manifests.
	pub fn as_str(self) -> &'static str {
		match self {
			ResourceKind::Namespace => "Namespace",
			ResourceKind::Pod => "Pod",
		}
	}

	/// Resolve a kind from manifest `apiVersion` and `kind` fields.
	///
	/// Only the core group is known, anything else is not part of the snapshot.
	pub fn from_api_version(api_version: &str, kind: &str) -> Option<Self> {
		let (group, version) = match api_version.split_once('/') {
			Some((g, v)) => (g, v),
			None => ("", api_version),
		};
		if !group.is_empty() || version != "v1" {
			return None;
		}
		match kind {
			"Namespace" => Some(ResourceKind::Namespace),
			"Pod" => Some(ResourceKind::Pod),
			_ => None,
		}
	}

	/// Resolve a kind from a parsed manifest.
	pub fn from_manifest(manifest: &serde_json::Value) -> Option<Self> {
		let api_version = manifest.get("apiVersion")?.as_str()?;
		let kind = manifest.get("kind")?.as_str()?;
		Self::from_api_version(api_version, kind)
	}
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case::namespace("v1", "Namespace", Some(ResourceKind::Namespace))]
	#[case::pod("v1", "Pod", Some(ResourceKind::Pod))]
	#[case::core_group_prefix("core/v1", "Pod", None)]
	#[case::other_version("v2", "Pod", None)]
	#[case::deployment("apps/v1", "Deployment", None)]
	#[case::configmap("v1", "ConfigMap", None)]
	fn test_from_api_version(
		#[case] api_version: &str,
		#[case] kind: &str,
		#[case] expected: Option<ResourceKind>,
	) {
		assert_eq!(ResourceKind::from_api_version(api_version, kind), expected);
	}

	#[test]
	fn test_from_manifest_requires_both_fields() {
		let missing_kind = serde_json::json!({ "apiVersion": "v1" });
		assert_eq!(ResourceKind::from_manifest(&missing_kind), None);

		let pod = serde_json::json!({ "apiVersion": "v1", "kind": "Pod" });
		assert_eq!(ResourceKind::from_manifest(&pod), Some(ResourceKind::Pod));
	}

	#[test]
	fn test_collection_names() {
		assert_eq!(ResourceKind::Namespace.collection(), "k8s/core/v1/namespaces");
		assert_eq!(ResourceKind::Pod.collection(), "k8s/core/v1/pods");
	}
}
