//! Read-only model of the cluster resources consumed by mesh analyzers.
//!
//! The snapshot is produced once, from manifest files or a live cluster
//! listing, and then handed to analyzers which only read it.

mod error;
mod instance;
mod kind;
mod snapshot;

pub use error::SnapshotError;
pub use instance::{
	ContainerRef, FullName, Metadata, NamespaceView, Origin, PodView, ResourceInstance,
	DEFAULT_NAMESPACE,
};
pub use kind::ResourceKind;
pub use snapshot::{Resources, Snapshot, SnapshotBuilder};
