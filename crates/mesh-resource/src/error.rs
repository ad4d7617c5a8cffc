use std::path::PathBuf;

use thiserror::Error;

use crate::ResourceKind;

/// Errors that can occur while building a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
	#[error("reading {}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("walking {}", path.display())]
	Walk {
		path: PathBuf,
		#[source]
		source: walkdir::Error,
	},

	#[error("parsing YAML in {source_name}")]
	Yaml {
		source_name: String,
		#[source]
		source: serde_yaml::Error,
	},

	#[error("decoding {kind} in {source_name} (document {document})")]
	Decode {
		kind: ResourceKind,
		source_name: String,
		document: usize,
		#[source]
		source: serde_json::Error,
	},

	#[error("{0} without metadata.name")]
	MissingName(ResourceKind),
}
