//! Istio naming constants the analyzers rely on.

// =============================================================================
// Namespaces
// =============================================================================

/// Namespace the control plane is installed into.
pub const ISTIO_SYSTEM_NAMESPACE: &str = "istio-system";

// =============================================================================
// Labels
// =============================================================================

/// Legacy namespace label enabling sidecar injection.
pub const INJECTION_LABEL: &str = "istio-injection";

/// The only value of [`INJECTION_LABEL`] which enables injection.
pub const INJECTION_ENABLE_VALUE: &str = "enabled";

/// Label pinning a namespace (or a control plane pod) to a revision.
pub const REVISION_LABEL: &str = "istio.io/rev";

/// Label carrying the application name.
pub const APP_LABEL: &str = "app";

/// Value of [`APP_LABEL`] on control plane pods.
pub const ISTIOD_APP: &str = "istiod";

// =============================================================================
// Annotations
// =============================================================================

/// Per-pod injection override.
pub const SIDECAR_INJECT_ANNOTATION: &str = "sidecar.istio.io/inject";

// =============================================================================
// Containers
// =============================================================================

/// Name of the injected sidecar container.
pub const PROXY_CONTAINER_NAME: &str = "istio-proxy";
