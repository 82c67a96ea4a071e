use thiserror::Error;

/// Why a geometry could not be built from its raw arrays.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("failed to allocate {requested} vertices")]
    AllocationFailed { requested: usize },

    #[error("unknown type {0:?}")]
    UnknownType(String),

    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("{what}: expected length {expected}, got {actual}")]
    MismatchedLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Errors surfaced by the import driver for a whole payload.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to decode CBOR payload: {0}")]
    Decode(String),

    #[error("mesh {mesh_id}: {source}")]
    Geometry {
        mesh_id: u16,
        #[source]
        source: GeometryError,
    },

    #[error("batch aborted: {failed} geometries failed, {succeeded} discarded")]
    Aborted { failed: usize, succeeded: usize },

    #[error("failed to start import workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("import worker exited before reporting")]
    WorkerLost,
}
