//! FreeFEM plot geometry: from decoded simulation output to flat vertex
//! streams a renderer can draw without index buffers.
//!
//! - [`label`]: stable per-label colors for region and boundary groups.
//! - [`construct`]: index expansion of meshes, curves and borders.
//! - [`iso`]: iso-lines of scalar fields and arrow glyphs of vector fields
//!   over a refined reference triangle.
//! - [`import`]: CBOR payload → geometries on a bounded worker pool.
//! - [`queue`]: the blocking FIFO the render thread drains.

pub mod color;
pub mod construct;
pub mod error;
pub mod import;
pub mod iso;
pub mod label;
pub mod payload;
pub mod queue;
pub mod types;

pub use color::{new_color, Color};
pub use construct::{construct_border, construct_geometry};
pub use error::{GeometryError, ImportError};
pub use import::{import_geometry, ErrorPolicy, ImportHandle, ImportReport, Importer};
pub use iso::{construct_iso_lines, construct_iso_vector, iso_levels, Subdivision, ISOLINE_COUNT};
pub use label::LabelTable;
pub use payload::{GeometryRecord, IsoRecord, PlotPayload};
pub use queue::ThreadSafeQueue;
pub use types::{
    ConstructedGeometry, Geometry, GeometryDescriptor, GeometryKind, GeometryType, MeshId, PlotId,
    PolygonMode, PrimitiveTopology, Vertex,
};
