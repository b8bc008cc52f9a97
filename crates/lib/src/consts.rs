//! Names reserved by the hydration pipeline and the external kpt engine.

/// Scratch directory used to stage output between pipeline stages.
///
/// Fully deleted and recreated at the start of every render, so no stale
/// intermediate artifact can leak into a later run.
pub const PIPELINE_DIR: &str = ".pipeline";

/// Hidden directory used as the apply dir when the user does not specify one.
pub const HYDRATED_DIR: &str = ".kpt-hydrated";

/// Marker file `kpt live init` writes into the apply dir. Its presence is the
/// sole signal that inventory initialization already happened.
pub const INVENTORY_TEMPLATE: &str = "inventory-template.yaml";

/// File the hydrated manifest set is written to inside the apply dir.
pub const RESOURCES_FILE: &str = "resources.yaml";

/// Annotation marking a document as a kpt function config rather than a
/// deployable resource.
pub const FN_ANNOTATION: &str = "config.kubernetes.io/function";

/// Annotation the apply engine uses to exclude a document from the cluster.
pub const FN_LOCAL_CONFIG_ANNOTATION: &str = "config.kubernetes.io/local-config";

/// Filenames recognized as a kustomization config directly under the source
/// directory. Matching is exact, in this order.
pub const KUSTOMIZATION_FILES: [&str; 3] = ["kustomization.yaml", "kustomization.yml", "Kustomization"];
