//! `.meshcheck.yaml` support.
//!
//! The file is looked up from the working directory upward to the filesystem
//! root, the first one found wins. Command line flags override its values.

use std::{
	fs,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use mesh_analysis::Level;
use serde::Deserialize;

use crate::suppress::Suppression;

pub const CONFIG_FILE_NAME: &str = ".meshcheck.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MeshcheckConfig {
	/// Namespaces skipped by analysis on top of the built-in kube-* ones.
	#[serde(default)]
	pub system_namespaces: Vec<String>,

	#[serde(default)]
	pub suppress: Vec<Suppression>,

	/// Lowest level printed.
	#[serde(default)]
	pub output_threshold: Option<Level>,

	/// Lowest level making the run fail.
	#[serde(default)]
	pub failure_threshold: Option<Level>,
}

impl MeshcheckConfig {
	/// Load the nearest config file above `start_dir`, if there is one.
	pub fn load_from_directory(start_dir: &Path) -> Result<Option<Self>> {
		find_config_file(start_dir)
			.map(|path| Self::load_from_file(&path))
			.transpose()
	}

	pub fn load_from_file(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path)
			.with_context(|| format!("failed to read config file: {}", path.display()))?;
		// An empty file is a valid, empty config
		if content.trim().is_empty() {
			return Ok(Self::default());
		}
		let config = serde_yaml::from_str(&content)
			.with_context(|| format!("failed to parse config file: {}", path.display()))?;
		tracing::debug!(path = %path.display(), "loaded config");
		Ok(config)
	}
}

/// Walk from `start_dir` to the filesystem root looking for [`CONFIG_FILE_NAME`].
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
	let start = start_dir
		.canonicalize()
		.unwrap_or_else(|_| start_dir.to_path_buf());

	start
		.ancestors()
		.map(|dir| dir.join(CONFIG_FILE_NAME))
		.find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
	use indoc::indoc;
	use tempfile::TempDir;

	use super::*;

	fn write_config(dir: &Path, content: &str) -> PathBuf {
		let path = dir.join(CONFIG_FILE_NAME);
		fs::write(&path, content).unwrap();
		path
	}

	#[test]
	fn test_find_config_in_current_dir() {
		let temp = TempDir::new().unwrap();
		let config_path = write_config(temp.path(), "{}");

		let found = find_config_file(temp.path()).unwrap();
		// Compare file names only, tempdirs may sit behind symlinks
		assert_eq!(found.file_name(), config_path.file_name());
	}

	#[test]
	fn test_find_config_in_parent_dir() {
		let temp = TempDir::new().unwrap();
		write_config(temp.path(), "{}");
		let nested = temp.path().join("a").join("b");
		fs::create_dir_all(&nested).unwrap();

		let found = find_config_file(&nested).unwrap();
		assert_eq!(
			found.parent().unwrap().canonicalize().unwrap(),
			temp.path().canonicalize().unwrap()
		);
	}

	#[test]
	fn test_no_config_found() {
		let temp = TempDir::new().unwrap();
		assert!(MeshcheckConfig::load_from_directory(temp.path())
			.unwrap()
			.is_none());
	}

	#[test]
	fn test_load_full_config() {
		let temp = TempDir::new().unwrap();
		let path = write_config(
			temp.path(),
			indoc! {"
				systemNamespaces:
				- cert-manager
				- monitoring
				suppress:
				- code: IST0102
				  resource: Namespace legacy-*
				outputThreshold: warning
				failureThreshold: error
			"},
		);

		let config = MeshcheckConfig::load_from_file(&path).unwrap();
		assert_eq!(config.system_namespaces, vec!["cert-manager", "monitoring"]);
		assert_eq!(config.suppress.len(), 1);
		assert_eq!(config.suppress[0].to_string(), "IST0102=Namespace legacy-*");
		assert_eq!(config.output_threshold, Some(Level::Warning));
		assert_eq!(config.failure_threshold, Some(Level::Error));
	}

	#[test]
	fn test_load_empty_file() {
		let temp = TempDir::new().unwrap();
		let path = write_config(temp.path(), "");

		let config = MeshcheckConfig::load_from_file(&path).unwrap();
		assert!(config.system_namespaces.is_empty());
		assert!(config.output_threshold.is_none());
	}

	#[test]
	fn test_unknown_field_is_rejected() {
		let temp = TempDir::new().unwrap();
		let path = write_config(temp.path(), "outputTreshold: info\n");

		let err = MeshcheckConfig::load_from_file(&path).unwrap_err();
		assert!(format!("{err:#}").contains("outputTreshold"), "{err:#}");
	}
}
