//! Wire model of one plot update, as CBOR.
//!
//! Top level: `{ "Plot": u16, "Geometry": [GeometryRecord, ..] }`. Every
//! optional section defaults to empty so partial records decode.

use crate::error::ImportError;
use crate::types::{MeshId, PlotId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotPayload {
    #[serde(rename = "Plot")]
    pub plot_id: PlotId,

    #[serde(rename = "Geometry", default)]
    pub geometries: Vec<GeometryRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryRecord {
    /// One of `Curve2D`, `Curve3D`, `Mesh2D`, `Mesh3D`.
    #[serde(rename = "Type")]
    pub ty: String,

    #[serde(rename = "Id")]
    pub mesh_id: MeshId,

    /// Flat xyz coordinates.
    #[serde(rename = "Vertices", default)]
    pub vertices: Vec<f32>,

    #[serde(rename = "MeshIndices", default)]
    pub mesh_indices: Vec<u32>,

    #[serde(rename = "MeshLabels", default)]
    pub mesh_labels: Vec<i32>,

    #[serde(rename = "IsoValues", default)]
    pub has_iso_values: bool,

    #[serde(rename = "IsoArray", default)]
    pub iso: Vec<IsoRecord>,

    #[serde(rename = "Borders", default)]
    pub has_borders: bool,

    #[serde(rename = "BorderIndices", default)]
    pub border_indices: Vec<u32>,

    #[serde(rename = "BorderLabels", default)]
    pub border_labels: Vec<i32>,
}

/// One field overlay on a mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IsoRecord {
    /// Samples per source triangle: one per sub-vertex, or two when
    /// `is_vector`.
    #[serde(rename = "IsoV1", default)]
    pub values: Vec<f64>,

    /// Sub-triangle connectivity, three indices each.
    #[serde(rename = "IsoKSub", default)]
    pub ksub: Vec<u32>,

    /// Barycentric sub-vertices, two coordinates each.
    #[serde(rename = "IsoPSub", default)]
    pub psub: Vec<f64>,

    #[serde(rename = "IsoVector", default)]
    pub is_vector: bool,

    #[serde(rename = "IsoMin", default)]
    pub min: f64,

    #[serde(rename = "IsoMax", default)]
    pub max: f64,
}

impl PlotPayload {
    pub fn decode(bytes: &[u8]) -> Result<Self, ImportError> {
        ciborium::de::from_reader(bytes).map_err(|e| ImportError::Decode(e.to_string()))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail for these plain types.
        if let Err(e) = ciborium::ser::into_writer(self, &mut out) {
            log::error!("Failed to encode plot payload: {}", e);
        }
        out
    }
}
