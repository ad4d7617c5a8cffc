//! System namespace classification.
//!
//! System namespaces host cluster infrastructure and are excluded from
//! user-facing injection policy checks.

use std::collections::BTreeSet;

/// Namespaces which are always considered system namespaces.
pub static DEFAULT: phf::Set<&'static str> = phf::phf_set! {
	"kube-system",
	"kube-public",
	"kube-node-lease",
	"local-path-storage",
};

/// Check a namespace against the built-in list.
pub fn is_system_namespace(namespace: &str) -> bool {
	DEFAULT.contains(namespace)
}

/// Built-in system namespaces plus the ones configured by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemNamespaces {
	extra: BTreeSet<String>,
}

impl SystemNamespaces {
	pub fn new<I, S>(extra: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			extra: extra.into_iter().map(Into::into).collect(),
		}
	}

	pub fn contains(&self, namespace: &str) -> bool {
		is_system_namespace(namespace) || self.extra.contains(namespace)
	}
}
