//! GPU-facing data model shared by the constructors, the import driver and
//! the render side.

use crate::color::Color;
use crate::error::GeometryError;
use std::str::FromStr;

/// One vertex of a non-indexed draw. Must match the vertex input layout of
/// the line/triangle shaders (position at location 0, color at location 1).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: Color,
}

impl Vertex {
    #[inline]
    pub const fn new(position: [f32; 3], color: Color) -> Self {
        Self { position, color }
    }
}

/// Plot identifier, chosen by the simulation side.
pub type PlotId = u16;

/// Mesh identifier within a plot.
pub type MeshId = u16;

/// Source object type as named on the wire (`Type` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Curve2D,
    Curve3D,
    Mesh2D,
    Mesh3D,
}

impl GeometryType {
    pub fn is_curve(self) -> bool {
        matches!(self, GeometryType::Curve2D | GeometryType::Curve3D)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GeometryType::Curve2D => "Curve2D",
            GeometryType::Curve3D => "Curve3D",
            GeometryType::Mesh2D => "Mesh2D",
            GeometryType::Mesh3D => "Mesh3D",
        }
    }
}

impl FromStr for GeometryType {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Curve2D" => Ok(GeometryType::Curve2D),
            "Curve3D" => Ok(GeometryType::Curve3D),
            "Mesh2D" => Ok(GeometryType::Mesh2D),
            "Mesh3D" => Ok(GeometryType::Mesh3D),
            other => Err(GeometryError::UnknownType(other.to_owned())),
        }
    }
}

impl std::fmt::Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a vertex stream represents; the render side toggles layers by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Curve2D,
    Curve3D,
    Mesh2D,
    Mesh3D,
    Border,
    IsoLine,
    IsoVector,
}

impl GeometryKind {
    pub const ALL: [GeometryKind; 7] = [
        GeometryKind::Curve2D,
        GeometryKind::Curve3D,
        GeometryKind::Mesh2D,
        GeometryKind::Mesh3D,
        GeometryKind::Border,
        GeometryKind::IsoLine,
        GeometryKind::IsoVector,
    ];
}

impl From<GeometryType> for GeometryKind {
    fn from(ty: GeometryType) -> Self {
        match ty {
            GeometryType::Curve2D => GeometryKind::Curve2D,
            GeometryType::Curve3D => GeometryKind::Curve3D,
            GeometryType::Mesh2D => GeometryKind::Mesh2D,
            GeometryType::Mesh3D => GeometryKind::Mesh3D,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
}

impl FromStr for PrimitiveTopology {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PointList" => Ok(PrimitiveTopology::PointList),
            "LineList" => Ok(PrimitiveTopology::LineList),
            "LineStrip" => Ok(PrimitiveTopology::LineStrip),
            "TriangleList" => Ok(PrimitiveTopology::TriangleList),
            other => Err(GeometryError::UnknownType(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Fill,
    Line,
    Point,
}

impl FromStr for PolygonMode {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fill" => Ok(PolygonMode::Fill),
            "Line" => Ok(PolygonMode::Line),
            "Point" => Ok(PolygonMode::Point),
            other => Err(GeometryError::UnknownType(other.to_owned())),
        }
    }
}

/// How the renderer should draw a vertex stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryDescriptor {
    pub topology: PrimitiveTopology,
    pub polygon_mode: PolygonMode,
    pub line_width: f32,
    pub pipeline_id: u32,
}

impl GeometryDescriptor {
    pub fn new(topology: PrimitiveTopology, polygon_mode: PolygonMode, line_width: f32) -> Self {
        Self {
            topology,
            polygon_mode,
            line_width,
            pipeline_id: pipeline_id(topology, polygon_mode),
        }
    }

    pub fn line_list(line_width: f32) -> Self {
        Self::new(PrimitiveTopology::LineList, PolygonMode::Fill, line_width)
    }

    /// Default descriptor for the primary geometry of a source object.
    pub fn for_type(ty: GeometryType) -> Self {
        match ty {
            GeometryType::Curve2D | GeometryType::Curve3D => {
                Self::new(PrimitiveTopology::LineStrip, PolygonMode::Fill, 1.0)
            }
            GeometryType::Mesh2D => {
                Self::new(PrimitiveTopology::TriangleList, PolygonMode::Line, 1.0)
            }
            GeometryType::Mesh3D => {
                Self::new(PrimitiveTopology::TriangleList, PolygonMode::Fill, 1.0)
            }
        }
    }
}

/// Pipelines are keyed by topology and polygon mode only; line width is
/// dynamic state.
pub fn pipeline_id(topology: PrimitiveTopology, polygon_mode: PolygonMode) -> u32 {
    let t = match topology {
        PrimitiveTopology::PointList => 0,
        PrimitiveTopology::LineList => 1,
        PrimitiveTopology::LineStrip => 2,
        PrimitiveTopology::TriangleList => 3,
    };
    let p = match polygon_mode {
        PolygonMode::Fill => 0,
        PolygonMode::Line => 1,
        PolygonMode::Point => 2,
    };
    t * 3 + p
}

/// A flat vertex stream plus how to draw it.
///
/// `vertices.len()` is always the number of valid vertices.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub kind: GeometryKind,
    pub vertices: Vec<Vertex>,
    pub descriptor: GeometryDescriptor,
    buffer_offset: Option<u64>,
}

impl Geometry {
    pub fn new(kind: GeometryKind, vertices: Vec<Vertex>, descriptor: GeometryDescriptor) -> Self {
        Self {
            kind,
            vertices,
            descriptor,
            buffer_offset: None,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[inline]
    pub fn byte_len(&self) -> u64 {
        (self.vertices.len() * std::mem::size_of::<Vertex>()) as u64
    }

    /// Byte offset into the shared vertex buffer, once packed.
    #[inline]
    pub fn buffer_offset(&self) -> Option<u64> {
        self.buffer_offset
    }

    /// Places the geometry in the shared vertex buffer. The staging buffer is
    /// rebuilt wholesale whenever its contents change, so this overwrites any
    /// previous placement.
    pub fn assign_buffer_offset(&mut self, offset: u64) {
        self.buffer_offset = Some(offset);
    }
}

/// The unit handed from the import workers to the render thread.
#[derive(Debug, Clone)]
pub struct ConstructedGeometry {
    pub plot_id: PlotId,
    pub mesh_id: MeshId,
    pub geometry: Geometry,
}

/// Allocates room for exactly `count` vertices or reports the failure.
pub(crate) fn alloc_vertices(count: usize) -> Result<Vec<Vertex>, GeometryError> {
    let mut v = Vec::new();
    v.try_reserve_exact(count)
        .map_err(|_| GeometryError::AllocationFailed { requested: count })?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 28);
        assert_eq!(std::mem::align_of::<Vertex>(), 4);
    }

    #[test]
    fn geometry_type_parses_wire_names() {
        for ty in [
            GeometryType::Curve2D,
            GeometryType::Curve3D,
            GeometryType::Mesh2D,
            GeometryType::Mesh3D,
        ] {
            assert_eq!(ty.as_str().parse::<GeometryType>(), Ok(ty));
        }
        assert_eq!(
            "Volume".parse::<GeometryType>(),
            Err(GeometryError::UnknownType("Volume".into()))
        );
    }

    #[test]
    fn topology_and_mode_reject_unknown_names() {
        assert_eq!("LineList".parse::<PrimitiveTopology>(), Ok(PrimitiveTopology::LineList));
        assert!("Quads".parse::<PrimitiveTopology>().is_err());
        assert_eq!("Line".parse::<PolygonMode>(), Ok(PolygonMode::Line));
        assert!("Wire".parse::<PolygonMode>().is_err());
    }

    #[test]
    fn pipeline_ids_are_unique_per_state() {
        let mut seen = std::collections::HashSet::new();
        for t in [
            PrimitiveTopology::PointList,
            PrimitiveTopology::LineList,
            PrimitiveTopology::LineStrip,
            PrimitiveTopology::TriangleList,
        ] {
            for p in [PolygonMode::Fill, PolygonMode::Line, PolygonMode::Point] {
                assert!(seen.insert(pipeline_id(t, p)));
            }
        }
    }

    #[test]
    fn mesh2d_draws_as_wireframe() {
        let d = GeometryDescriptor::for_type(GeometryType::Mesh2D);
        assert_eq!(d.topology, PrimitiveTopology::TriangleList);
        assert_eq!(d.polygon_mode, PolygonMode::Line);
    }

    #[test]
    fn buffer_offset_starts_unassigned() {
        let mut g = Geometry::new(
            GeometryKind::Border,
            vec![Vertex::new([0.0; 3], Color::BLACK); 4],
            GeometryDescriptor::line_list(2.0),
        );
        assert_eq!(g.buffer_offset(), None);
        assert_eq!(g.byte_len(), 4 * 28);
        g.assign_buffer_offset(56);
        assert_eq!(g.buffer_offset(), Some(56));
    }
}
