//! Resource instances and their typed views.
//!
//! Payloads are resolved into a typed body once, when the resource
//! enters the snapshot. Consumers ask for a [`NamespaceView`] or [`PodView`]
//! and never inspect the raw body.

use std::{collections::BTreeMap, fmt, path::PathBuf};

use k8s_openapi::{
	api::core::v1::{Namespace, Pod},
	apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use serde::{Serialize, Serializer};

use crate::{ResourceKind, SnapshotError};

/// Namespace assumed for namespaced resources which don't specify one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Fully-qualified resource name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FullName {
	pub namespace: Option<String>,
	pub name: String,
}

impl FullName {
	pub fn cluster_scoped(name: impl Into<String>) -> Self {
		Self {
			namespace: None,
			name: name.into(),
		}
	}

	pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			namespace: Some(namespace.into()),
			name: name.into(),
		}
	}
}

impl fmt::Display for FullName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.namespace {
			Some(ns) => write!(f, "{}/{}", ns, self.name),
			None => f.write_str(&self.name),
		}
	}
}

impl Serialize for FullName {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

/// Where a resource was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
	/// Document inside a manifest file, `document` is 1-based.
	File { path: PathBuf, document: usize },
	/// Live cluster listing.
	Cluster,
}

impl fmt::Display for Origin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Origin::File { path, document } => write!(f, "{}#{}", path.display(), document),
			Origin::Cluster => f.write_str("cluster"),
		}
	}
}

impl Serialize for Origin {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

/// Metadata shared by all resource kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
	pub full_name: FullName,
	pub labels: BTreeMap<String, String>,
	pub annotations: BTreeMap<String, String>,
}

impl Metadata {
	fn from_object_meta(
		meta: &ObjectMeta,
		kind: ResourceKind,
		namespaced: bool,
	) -> Result<Self, SnapshotError> {
		let name = meta
			.name
			.clone()
			.filter(|n| !n.is_empty())
			.ok_or(SnapshotError::MissingName(kind))?;
		let full_name = if namespaced {
			FullName::namespaced(
				meta.namespace
					.clone()
					.filter(|ns| !ns.is_empty())
					.unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned()),
				name,
			)
		} else {
			FullName::cluster_scoped(name)
		};
		Ok(Self {
			full_name,
			labels: meta.labels.clone().unwrap_or_default(),
			annotations: meta.annotations.clone().unwrap_or_default(),
		})
	}
}

/// Typed resource body. Namespaces carry nothing beyond their metadata.
#[derive(Debug, Clone, PartialEq)]
enum Payload {
	Namespace,
	Pod(Box<Pod>),
}

/// A single resource of the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInstance {
	pub metadata: Metadata,
	pub origin: Option<Origin>,
	payload: Payload,
}

impl ResourceInstance {
	pub fn from_namespace(namespace: Namespace, origin: Option<Origin>) -> Result<Self, SnapshotError> {
		let Namespace { metadata, .. } = namespace;
		let metadata = Metadata::from_object_meta(&metadata, ResourceKind::Namespace, false)?;
		Ok(Self {
			metadata,
			origin,
			payload: Payload::Namespace,
		})
	}

	pub fn from_pod(mut pod: Pod, origin: Option<Origin>) -> Result<Self, SnapshotError> {
		let metadata = Metadata::from_object_meta(&pod.metadata, ResourceKind::Pod, true)?;
		// Keep the body consistent with the resolved name
		pod.metadata.namespace = metadata.full_name.namespace.clone();
		Ok(Self {
			metadata,
			origin,
			payload: Payload::Pod(Box::new(pod)),
		})
	}

	pub fn kind(&self) -> ResourceKind {
		match self.payload {
			Payload::Namespace => ResourceKind::Namespace,
			Payload::Pod(_) => ResourceKind::Pod,
		}
	}

	pub fn full_name(&self) -> &FullName {
		&self.metadata.full_name
	}

	pub fn labels(&self) -> &BTreeMap<String, String> {
		&self.metadata.labels
	}

	pub fn annotations(&self) -> &BTreeMap<String, String> {
		&self.metadata.annotations
	}

	pub fn as_namespace(&self) -> Option<NamespaceView<'_>> {
		match &self.payload {
			Payload::Namespace => Some(NamespaceView { instance: self }),
			Payload::Pod(_) => None,
		}
	}

	pub fn as_pod(&self) -> Option<PodView<'_>> {
		match &self.payload {
			Payload::Pod(body) => Some(PodView {
				instance: self,
				body,
			}),
			Payload::Namespace => None,
		}
	}
}

/// Read access to a namespace resource.
#[derive(Debug, Clone, Copy)]
pub struct NamespaceView<'a> {
	instance: &'a ResourceInstance,
}

impl<'a> NamespaceView<'a> {
	pub fn name(&self) -> &'a str {
		&self.instance.metadata.full_name.name
	}

	pub fn labels(&self) -> &'a BTreeMap<String, String> {
		&self.instance.metadata.labels
	}

	pub fn label(&self, key: &str) -> Option<&'a str> {
		self.labels().get(key).map(String::as_str)
	}

	pub fn instance(&self) -> &'a ResourceInstance {
		self.instance
	}
}

/// Declared container of a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerRef<'a> {
	pub name: &'a str,
	/// Empty when the manifest doesn't set an image.
	pub image: &'a str,
}

/// Read access to a pod resource.
#[derive(Debug, Clone, Copy)]
pub struct PodView<'a> {
	instance: &'a ResourceInstance,
	body: &'a Pod,
}

impl<'a> PodView<'a> {
	pub fn name(&self) -> &'a str {
		&self.instance.metadata.full_name.name
	}

	pub fn namespace(&self) -> &'a str {
		self.instance
			.metadata
			.full_name
			.namespace
			.as_deref()
			.unwrap_or(DEFAULT_NAMESPACE)
	}

	pub fn labels(&self) -> &'a BTreeMap<String, String> {
		&self.instance.metadata.labels
	}

	pub fn label(&self, key: &str) -> Option<&'a str> {
		self.labels().get(key).map(String::as_str)
	}

	pub fn annotations(&self) -> &'a BTreeMap<String, String> {
		&self.instance.metadata.annotations
	}

	pub fn annotation(&self, key: &str) -> Option<&'a str> {
		self.annotations().get(key).map(String::as_str)
	}

	/// Regular containers from the pod spec, init containers are not included.
	pub fn containers(&self) -> impl Iterator<Item = ContainerRef<'a>> + 'a {
		let body = self.body;
		body.spec
			.iter()
			.flat_map(|spec| spec.containers.iter())
			.map(|c| ContainerRef {
				name: &c.name,
				image: c.image.as_deref().unwrap_or_default(),
			})
	}

	pub fn instance(&self) -> &'a ResourceInstance {
		self.instance
	}
}
