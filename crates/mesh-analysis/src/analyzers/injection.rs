//! Sidecar injection analyzer.
//!
//! Injection is assumed to be enabled through the `istio-injection=enabled`
//! or `istio.io/rev` namespace labels. Mutating webhook configurations can
//! enable it too, but those setups are uncommon and are not inspected.
//!
//! Analysis runs in three passes over the snapshot, each one completing
//! before the next starts:
//! 1. control plane revisions are collected from istiod pods,
//! 2. namespaces are classified against those revisions,
//! 3. pods of injected namespaces are checked for a proxy container.

use std::collections::HashSet;

use indexmap::IndexSet;
use itertools::Itertools;
use mesh_resource::{NamespaceView, PodView, ResourceInstance, ResourceKind};
use tracing::{debug, trace};

use crate::{
	constants::{
		APP_LABEL, INJECTION_ENABLE_VALUE, INJECTION_LABEL, ISTIOD_APP, ISTIO_SYSTEM_NAMESPACE,
		PROXY_CONTAINER_NAME, REVISION_LABEL, SIDECAR_INJECT_ANNOTATION,
	},
	system_namespaces, Analyzer, Context, Message, Metadata, SystemNamespaces,
};

type SystemNamespacePredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Checks conditions related to Istio sidecar injection.
pub struct InjectionAnalyzer {
	is_system_namespace: SystemNamespacePredicate,
}

impl Default for InjectionAnalyzer {
	fn default() -> Self {
		Self::new()
	}
}

impl InjectionAnalyzer {
	pub const NAME: &'static str = "injection.Analyzer";

	pub fn new() -> Self {
		Self {
			is_system_namespace: Box::new(system_namespaces::is_system_namespace),
		}
	}

	pub fn with_system_namespaces(self, namespaces: SystemNamespaces) -> Self {
		self.with_system_namespace_predicate(move |ns| namespaces.contains(ns))
	}

	pub fn with_system_namespace_predicate(
		mut self,
		predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
	) -> Self {
		self.is_system_namespace = Box::new(predicate);
		self
	}

	/// Classify every non-system namespace, reporting misconfigurations.
	///
	/// Returns the names of namespaces whose pods are expected to carry a sidecar.
	fn resolve_namespaces<'s>(
		&self,
		ctx: &mut dyn Context<'s>,
		revisions: &IndexSet<&str>,
	) -> HashSet<&'s str> {
		let mut injected = HashSet::new();

		for namespace in ctx
			.resources(ResourceKind::Namespace)
			.filter_map(ResourceInstance::as_namespace)
		{
			let name = namespace.name();
			if (self.is_system_namespace)(name) {
				trace!(namespace = name, "skipping system namespace");
				continue;
			}

			let policy = NamespacePolicy::resolve(&namespace, revisions);
			debug!(namespace = name, ?policy, "resolved injection policy");

			let message = match policy {
				NamespacePolicy::Enabled => {
					injected.insert(name);
					continue;
				}
				NamespacePolicy::Disabled => continue,
				NamespacePolicy::Unlabeled => Message::NamespaceNotInjected {
					namespace: name.to_owned(),
				},
				NamespacePolicy::ConflictingLabels => Message::NamespaceMultipleInjectionLabels {
					namespace: name.to_owned(),
				},
				NamespacePolicy::UnknownRevision(revision) => {
					Message::NamespaceInvalidInjectorRevision {
						namespace: name.to_owned(),
						revision: revision.to_owned(),
						known_revisions: revisions.iter().join(", "),
					}
				}
			};
			ctx.report(ResourceKind::Namespace, namespace.instance(), message);
		}

		injected
	}
}

impl Analyzer for InjectionAnalyzer {
	fn metadata(&self) -> Metadata {
		Metadata {
			name: Self::NAME,
			description: "Checks conditions related to Istio sidecar injection",
			inputs: &[ResourceKind::Namespace, ResourceKind::Pod],
		}
	}

	fn analyze<'s>(&self, ctx: &mut dyn Context<'s>) {
		let revisions = control_plane_revisions(
			ctx.resources(ResourceKind::Pod)
				.filter_map(ResourceInstance::as_pod),
		);
		debug!(revisions = ?revisions, "discovered control plane revisions");

		let injected = self.resolve_namespaces(ctx, &revisions);

		check_pods(ctx, &injected);
	}
}

/// Injection state of a namespace, derived from its labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NamespacePolicy<'a> {
	/// Neither the legacy nor the revision label is set.
	Unlabeled,
	/// Both labels are set, whatever their values.
	ConflictingLabels,
	/// Revision label points to a revision no control plane serves.
	UnknownRevision(&'a str),
	Enabled,
	/// Legacy label set to anything but the enable value.
	Disabled,
}

impl<'a> NamespacePolicy<'a> {
	fn resolve(namespace: &NamespaceView<'a>, revisions: &IndexSet<&str>) -> Self {
		// An empty legacy label counts as unset, an empty revision label doesn't
		let legacy = namespace.label(INJECTION_LABEL).filter(|v| !v.is_empty());
		let revision = namespace.label(REVISION_LABEL);

		match (legacy, revision) {
			(None, None) => NamespacePolicy::Unlabeled,
			(Some(_), Some(_)) => NamespacePolicy::ConflictingLabels,
			(None, Some(revision)) if revisions.contains(revision) => NamespacePolicy::Enabled,
			(None, Some(revision)) => NamespacePolicy::UnknownRevision(revision),
			(Some(INJECTION_ENABLE_VALUE), None) => NamespacePolicy::Enabled,
			(Some(_), None) => NamespacePolicy::Disabled,
		}
	}
}

fn is_control_plane(pod: &PodView) -> bool {
	pod.namespace() == ISTIO_SYSTEM_NAMESPACE && pod.label(APP_LABEL) == Some(ISTIOD_APP)
}

/// Revisions served by istiod pods, in discovery order.
///
/// Pods without a revision label serve the default revision, which is not tracked.
fn control_plane_revisions<'s>(pods: impl Iterator<Item = PodView<'s>>) -> IndexSet<&'s str> {
	pods.filter(is_control_plane)
		.filter_map(|pod| pod.label(REVISION_LABEL))
		.collect()
}

/// Report pods of injected namespaces which lack the proxy container.
fn check_pods<'s>(ctx: &mut dyn Context<'s>, injected: &HashSet<&str>) {
	for pod in ctx
		.resources(ResourceKind::Pod)
		.filter_map(ResourceInstance::as_pod)
	{
		if !injected.contains(pod.namespace()) {
			continue;
		}

		if pod
			.annotation(SIDECAR_INJECT_ANNOTATION)
			.is_some_and(|v| v.eq_ignore_ascii_case("false"))
		{
			trace!(pod = %pod.instance().full_name(), "injection disabled by annotation");
			continue;
		}

		if !has_proxy(&pod) {
			ctx.report(
				ResourceKind::Pod,
				pod.instance(),
				Message::PodMissingProxy {
					pod: pod.instance().full_name().to_string(),
				},
			);
		}
	}
}

fn has_proxy(pod: &PodView) -> bool {
	pod.containers()
		.find(|c| c.name == PROXY_CONTAINER_NAME)
		.is_some_and(|c| !c.image.is_empty())
}
