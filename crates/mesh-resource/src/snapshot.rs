//! Materialized snapshot of cluster resources.
//!
//! A snapshot is built once, by a [`SnapshotBuilder`], and is read-only from
//! then on. Resources of each kind are kept in the order they were first
//! added, so analysis output follows the order of the input manifests. A
//! resource added again under the same name replaces the earlier one.

use std::{
	collections::BTreeMap,
	fs,
	path::{Path, PathBuf},
};

use indexmap::IndexMap;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use serde::Deserialize;
use tracing::{debug, instrument, trace};
use walkdir::WalkDir;

use crate::{FullName, NamespaceView, Origin, PodView, ResourceInstance, ResourceKind, SnapshotError};

/// Extensions picked up when walking a directory.
const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Lazy, restartable sequence of resources of a single kind.
pub type Resources<'a> = std::slice::Iter<'a, ResourceInstance>;

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
	/// A kind is available once any source declared it, even if it has no resources.
	resources: BTreeMap<ResourceKind, Vec<ResourceInstance>>,
}

impl Snapshot {
	pub fn builder() -> SnapshotBuilder {
		SnapshotBuilder::default()
	}

	/// Parse a multi-document YAML (or JSON) stream.
	pub fn from_yaml_str(src: &str, path: Option<&Path>) -> Result<Self, SnapshotError> {
		let mut builder = Self::builder();
		builder.add_yaml_str(src, path)?;
		Ok(builder.build())
	}

	pub fn resources(&self, kind: ResourceKind) -> Resources<'_> {
		self.resources.get(&kind).map(Vec::as_slice).unwrap_or_default().iter()
	}

	pub fn namespaces(&self) -> impl Iterator<Item = NamespaceView<'_>> + Clone {
		self.resources(ResourceKind::Namespace)
			.filter_map(ResourceInstance::as_namespace)
	}

	pub fn pods(&self) -> impl Iterator<Item = PodView<'_>> + Clone {
		self.resources(ResourceKind::Pod)
			.filter_map(ResourceInstance::as_pod)
	}

	/// Kinds some source has provided.
	pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
		self.resources.keys().copied()
	}

	pub fn is_available(&self, kind: ResourceKind) -> bool {
		self.resources.contains_key(&kind)
	}

	pub fn len(&self) -> usize {
		self.resources.values().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[derive(Debug, Default)]
pub struct SnapshotBuilder {
	resources: BTreeMap<ResourceKind, IndexMap<FullName, ResourceInstance>>,
}

impl SnapshotBuilder {
	/// Mark a kind as provided, without adding resources.
	pub fn declare(&mut self, kind: ResourceKind) -> &mut Self {
		self.resources.entry(kind).or_default();
		self
	}

	pub fn declare_all(&mut self) -> &mut Self {
		for kind in ResourceKind::ALL {
			self.declare(kind);
		}
		self
	}

	/// Add a resource. The last one added under a name wins, keeping the
	/// position of the first.
	pub fn insert(&mut self, instance: ResourceInstance) -> &mut Self {
		let kind = instance.kind();
		let name = instance.full_name().clone();
		trace!(%kind, %name, "adding resource");
		let replaced = self
			.resources
			.entry(kind)
			.or_default()
			.insert(name.clone(), instance);
		if let Some(replaced) = replaced {
			debug!(
				%kind,
				%name,
				previous_origin = ?replaced.origin,
				"replacing resource added earlier"
			);
		}
		self
	}

	/// Builder-style [`Self::insert`].
	pub fn with(mut self, instance: ResourceInstance) -> Self {
		self.insert(instance);
		self
	}

	/// Add every known resource from a YAML stream.
	///
	/// Files can hold any kind, so all kinds become available.
	pub fn add_yaml_str(&mut self, src: &str, path: Option<&Path>) -> Result<&mut Self, SnapshotError> {
		self.declare_all();
		let source_name = path.map_or_else(|| "<input>".to_owned(), |p| p.display().to_string());

		for (index, document) in serde_yaml::Deserializer::from_str(src).enumerate() {
			let value = serde_json::Value::deserialize(document).map_err(|source| {
				SnapshotError::Yaml {
					source_name: source_name.clone(),
					source,
				}
			})?;
			let origin = path.map(|p| Origin::File {
				path: p.to_path_buf(),
				document: index + 1,
			});
			self.add_manifest(value, &source_name, index + 1, origin)?;
		}
		Ok(self)
	}

	fn add_manifest(
		&mut self,
		value: serde_json::Value,
		source_name: &str,
		document: usize,
		origin: Option<Origin>,
	) -> Result<(), SnapshotError> {
		if value.is_null() {
			return Ok(());
		}
		if is_list(&value) {
			if let serde_json::Value::Object(mut map) = value {
				if let Some(serde_json::Value::Array(items)) = map.remove("items") {
					for item in items {
						self.add_manifest(item, source_name, document, origin.clone())?;
					}
				}
			}
			return Ok(());
		}

		let Some(kind) = ResourceKind::from_manifest(&value) else {
			debug!(
				source = source_name,
				document,
				api_version = value.get("apiVersion").and_then(|v| v.as_str()),
				kind = value.get("kind").and_then(|v| v.as_str()),
				"skipping resource of unknown kind"
			);
			return Ok(());
		};

		let decode_error = |source| SnapshotError::Decode {
			kind,
			source_name: source_name.to_owned(),
			document,
			source,
		};
		let instance = match kind {
			ResourceKind::Namespace => ResourceInstance::from_namespace(
				serde_json::from_value::<Namespace>(value).map_err(decode_error)?,
				origin,
			)?,
			ResourceKind::Pod => ResourceInstance::from_pod(
				serde_json::from_value::<Pod>(value).map_err(decode_error)?,
				origin,
			)?,
		};
		self.insert(instance);
		Ok(())
	}

	/// Add a manifest file, or every manifest file below a directory.
	#[instrument(skip_all, fields(path = %path.display()))]
	pub fn add_path(&mut self, path: &Path) -> Result<&mut Self, SnapshotError> {
		if !path.is_dir() {
			return self.add_file(path);
		}

		let mut files = Vec::new();
		let walker = WalkDir::new(path)
			.sort_by_file_name()
			.into_iter()
			.filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
		for entry in walker {
			let entry = entry.map_err(|source| SnapshotError::Walk {
				path: path.to_path_buf(),
				source,
			})?;
			if entry.file_type().is_file() && has_manifest_extension(entry.path()) {
				files.push(entry.into_path());
			}
		}
		debug!(count = files.len(), "found manifest files");

		for file in files {
			self.add_file(&file)?;
		}
		Ok(self)
	}

	fn add_file(&mut self, path: &Path) -> Result<&mut Self, SnapshotError> {
		let src = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
			path: PathBuf::from(path),
			source,
		})?;
		self.add_yaml_str(&src, Some(path))
	}

	pub fn build(self) -> Snapshot {
		Snapshot {
			resources: self
				.resources
				.into_iter()
				.map(|(kind, resources)| (kind, resources.into_values().collect::<Vec<_>>()))
				.collect(),
		}
	}
}

/// `List`, `PodList`, `NamespaceList` and friends, as printed by `kubectl get -o yaml`.
fn is_list(value: &serde_json::Value) -> bool {
	value
		.get("kind")
		.and_then(|k| k.as_str())
		.is_some_and(|k| k.ends_with("List"))
		&& value.get("items").is_some_and(serde_json::Value::is_array)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
	name.to_str().is_some_and(|n| n.starts_with('.'))
}

fn has_manifest_extension(path: &Path) -> bool {
	path.extension()
		.and_then(|e| e.to_str())
		.is_some_and(|e| MANIFEST_EXTENSIONS.contains(&e))
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use indoc::indoc;
	use tempfile::TempDir;

	use super::*;

	const MIXED: &str = indoc! {"
		apiVersion: v1
		kind: Namespace
		metadata:
		  name: ns1
		  labels:
		    istio-injection: enabled
		---
		apiVersion: apps/v1
		kind: Deployment
		metadata:
		  name: web
		  namespace: ns1
		---
		apiVersion: v1
		kind: Pod
		metadata:
		  name: web-1
		  namespace: ns1
		  annotations:
		    sidecar.istio.io/inject: \"false\"
		spec:
		  containers:
		  - name: web
		    image: nginx
		---
	"};

	#[test]
	fn test_from_yaml_str_keeps_known_kinds() {
		let snapshot = Snapshot::from_yaml_str(MIXED, None).unwrap();

		assert_eq!(snapshot.len(), 2);
		let namespaces: Vec<_> = snapshot.namespaces().map(|ns| ns.name()).collect();
		assert_eq!(namespaces, vec!["ns1"]);

		let pod = snapshot.pods().next().unwrap();
		assert_eq!(pod.instance().full_name(), &FullName::namespaced("ns1", "web-1"));
		assert_eq!(pod.annotation("sidecar.istio.io/inject"), Some("false"));
		assert_eq!(pod.instance().origin, None);
	}

	#[test]
	fn test_origin_tracks_document() {
		let snapshot = Snapshot::from_yaml_str(MIXED, Some(Path::new("all.yaml"))).unwrap();
		let pod = snapshot.pods().next().unwrap();
		assert_eq!(
			pod.instance().origin,
			Some(Origin::File {
				path: PathBuf::from("all.yaml"),
				document: 3,
			})
		);
	}

	#[test]
	fn test_lists_are_flattened() {
		let src = indoc! {"
			apiVersion: v1
			kind: List
			items:
			- apiVersion: v1
			  kind: Namespace
			  metadata:
			    name: a
			- apiVersion: v1
			  kind: Namespace
			  metadata:
			    name: b
		"};
		let snapshot = Snapshot::from_yaml_str(src, None).unwrap();
		let names: Vec<_> = snapshot.namespaces().map(|ns| ns.name()).collect();
		assert_eq!(names, vec!["a", "b"]);
	}

	#[test]
	fn test_json_input() {
		let src = r#"{"apiVersion": "v1", "kind": "Namespace", "metadata": {"name": "json-ns"}}"#;
		let snapshot = Snapshot::from_yaml_str(src, None).unwrap();
		assert_eq!(snapshot.namespaces().next().unwrap().name(), "json-ns");
	}

	#[test]
	fn test_empty_input_declares_kinds() {
		let snapshot = Snapshot::from_yaml_str("", None).unwrap();
		assert!(snapshot.is_empty());
		assert!(snapshot.is_available(ResourceKind::Namespace));
		assert!(snapshot.is_available(ResourceKind::Pod));
	}

	#[test]
	fn test_builder_declares_only_inserted_kinds() {
		let snapshot = Snapshot::builder().build();
		assert_eq!(snapshot.kinds().count(), 0);
		assert_eq!(snapshot.resources(ResourceKind::Pod).count(), 0);
	}

	#[test]
	fn test_resources_are_restartable() {
		let snapshot = Snapshot::from_yaml_str(MIXED, None).unwrap();
		let iter = snapshot.resources(ResourceKind::Namespace);
		assert_eq!(iter.clone().count(), 1);
		assert_eq!(iter.count(), 1);
	}

	#[test]
	fn test_same_name_from_two_sources_keeps_last() {
		let ns = |name: &str, injection: &str| {
			format!(
				"apiVersion: v1\nkind: Namespace\nmetadata:\n  name: {name}\n  labels:\n    istio-injection: {injection}\n"
			)
		};
		let mut builder = Snapshot::builder();
		builder
			.add_yaml_str(&ns("a", "disabled"), Some(Path::new("first.yaml")))
			.unwrap()
			.add_yaml_str(&ns("b", "enabled"), Some(Path::new("first.yaml")))
			.unwrap()
			.add_yaml_str(&ns("a", "enabled"), Some(Path::new("second.yaml")))
			.unwrap();
		let snapshot = builder.build();

		assert_eq!(snapshot.len(), 2);
		let namespaces: Vec<_> = snapshot
			.namespaces()
			.map(|ns| (ns.name(), ns.label("istio-injection")))
			.collect();
		assert_eq!(
			namespaces,
			vec![("a", Some("enabled")), ("b", Some("enabled"))]
		);
		let first = snapshot.namespaces().next().unwrap();
		assert_eq!(
			first.instance().origin,
			Some(Origin::File {
				path: PathBuf::from("second.yaml"),
				document: 1,
			})
		);
	}

	#[test]
	fn test_pods_are_keyed_by_namespace() {
		let pod = |namespace: &str| {
			format!("apiVersion: v1\nkind: Pod\nmetadata:\n  name: web\n  namespace: {namespace}\n")
		};
		let mut builder = Snapshot::builder();
		builder
			.add_yaml_str(&pod("shop"), None)
			.unwrap()
			.add_yaml_str(&pod("cart"), None)
			.unwrap()
			.add_yaml_str(&pod("shop"), None)
			.unwrap();
		let snapshot = builder.build();

		let names: Vec<_> = snapshot
			.pods()
			.map(|pod| pod.instance().full_name().to_string())
			.collect();
		assert_eq!(names, vec!["shop/web", "cart/web"]);
	}

	#[test]
	fn test_decode_error_names_document() {
		let src = indoc! {"
			apiVersion: v1
			kind: Namespace
			metadata:
			  name: ok
			---
			apiVersion: v1
			kind: Pod
			metadata:
			  name: bad
			spec:
			  containers: 42
		"};
		let err = Snapshot::from_yaml_str(src, Some(Path::new("bad.yaml"))).unwrap_err();
		assert_matches!(
			err,
			SnapshotError::Decode {
				kind: ResourceKind::Pod,
				document: 2,
				..
			}
		);
		assert_eq!(err.to_string(), "decoding Pod in bad.yaml (document 2)");
	}

	#[test]
	fn test_invalid_yaml() {
		let err = Snapshot::from_yaml_str("kind: [", None).unwrap_err();
		assert_matches!(err, SnapshotError::Yaml { .. });
	}

	#[test]
	fn test_add_path_walks_directories_in_order() {
		let temp = TempDir::new().unwrap();
		let nested = temp.path().join("nested");
		fs::create_dir(&nested).unwrap();
		fs::create_dir(temp.path().join(".git")).unwrap();

		let ns = |name: &str| format!("apiVersion: v1\nkind: Namespace\nmetadata:\n  name: {name}\n");
		fs::write(temp.path().join("b.yaml"), ns("b")).unwrap();
		fs::write(temp.path().join("a.yml"), ns("a")).unwrap();
		fs::write(nested.join("c.json"), ns("c")).unwrap();
		fs::write(temp.path().join("README.md"), ns("ignored")).unwrap();
		fs::write(temp.path().join(".git").join("hidden.yaml"), ns("hidden")).unwrap();

		let mut builder = Snapshot::builder();
		builder.add_path(temp.path()).unwrap();
		let snapshot = builder.build();
		let names: Vec<_> = snapshot.namespaces().map(|ns| ns.name()).collect();
		assert_eq!(names, vec!["a", "b", "c"]);
	}

	#[test]
	fn test_load_missing_file() {
		let temp = TempDir::new().unwrap();
		let err = Snapshot::builder()
			.add_path(&temp.path().join("absent.yaml"))
			.unwrap_err();
		assert_matches!(err, SnapshotError::Io { .. });
	}
}
