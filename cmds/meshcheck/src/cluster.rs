//! Live snapshots read from a Kubernetes cluster.

use std::time::Duration;

use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::{
	api::{Api, ListParams},
	config::{KubeConfigOptions, KubeconfigError},
	Client, Config,
};
use mesh_resource::{Origin, ResourceInstance, SnapshotBuilder, SnapshotError};
use thiserror::Error;
use tracing::{debug, instrument};

const API_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClusterError {
	#[error("loading kubeconfig")]
	Kubeconfig(#[from] KubeconfigError),

	#[error("inferring cluster configuration")]
	Infer(#[from] kube::config::InferConfigError),

	#[error(transparent)]
	Kube(#[from] kube::Error),

	#[error("building async runtime")]
	Runtime(#[source] std::io::Error),

	#[error(transparent)]
	Snapshot(#[from] SnapshotError),
}

/// Everything the analyzers read, as listed from the API server.
#[derive(Debug, Default)]
pub struct ClusterResources {
	pub namespaces: Vec<Namespace>,
	pub pods: Vec<Pod>,
}

impl ClusterResources {
	/// Add the listed resources to `builder`, marking every kind as available.
	pub fn add_to(self, builder: &mut SnapshotBuilder) -> Result<(), SnapshotError> {
		builder.declare_all();
		for namespace in self.namespaces {
			builder.insert(ResourceInstance::from_namespace(
				namespace,
				Some(Origin::Cluster),
			)?);
		}
		for pod in self.pods {
			builder.insert(ResourceInstance::from_pod(pod, Some(Origin::Cluster))?);
		}
		Ok(())
	}
}

/// Connect using `context` from the kubeconfig, or the inferred configuration
/// (in-cluster or current context) when unset.
#[instrument(skip_all, fields(context = context.unwrap_or("<current>")))]
pub async fn connect(context: Option<&str>) -> Result<Client, ClusterError> {
	let mut config = match context {
		Some(context) => {
			Config::from_kubeconfig(&KubeConfigOptions {
				context: Some(context.to_owned()),
				..Default::default()
			})
			.await?
		}
		None => Config::infer().await?,
	};
	config.read_timeout = Some(API_TIMEOUT);
	Ok(Client::try_from(config)?)
}

#[instrument(skip_all)]
pub async fn list(client: Client) -> Result<ClusterResources, ClusterError> {
	let params = ListParams::default();
	let namespaces = Api::<Namespace>::all(client.clone())
		.list(&params)
		.await?
		.items;
	let pods = Api::<Pod>::all(client).list(&params).await?.items;
	debug!(
		namespaces = namespaces.len(),
		pods = pods.len(),
		"listed cluster resources"
	);
	Ok(ClusterResources { namespaces, pods })
}

/// Blocking entry point: connect, list and add everything to `builder`.
pub fn collect(builder: &mut SnapshotBuilder, context: Option<&str>) -> Result<(), ClusterError> {
	let runtime = tokio::runtime::Runtime::new().map_err(ClusterError::Runtime)?;
	let resources = runtime.block_on(async {
		let client = connect(context).await?;
		list(client).await
	})?;
	resources.add_to(builder)?;
	Ok(())
}
