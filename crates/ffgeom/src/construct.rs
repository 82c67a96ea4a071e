//! Index expansion: indexed meshes and border polylines into flat vertex
//! streams.

use crate::color::Color;
use crate::error::GeometryError;
use crate::label::LabelTable;
use crate::types::{alloc_vertices, Geometry, GeometryDescriptor, GeometryKind, GeometryType, Vertex};

/// Line width of border overlays, in pixels.
pub const BORDER_LINE_WIDTH: f32 = 2.0;

/// Number of xyz triples in a flat coordinate array.
pub(crate) fn point_count(vertices: &[f32]) -> Result<usize, GeometryError> {
    if vertices.len() % 3 != 0 {
        return Err(GeometryError::MismatchedLength {
            what: "vertex coordinates (stride 3)",
            expected: vertices.len() - vertices.len() % 3,
            actual: vertices.len(),
        });
    }
    Ok(vertices.len() / 3)
}

#[inline]
pub(crate) fn point_at(vertices: &[f32], index: u32, count: usize) -> Result<[f32; 3], GeometryError> {
    let i = index as usize;
    if i >= count {
        return Err(GeometryError::IndexOutOfRange {
            what: "vertex",
            index: i,
            len: count,
        });
    }
    Ok([vertices[3 * i], vertices[3 * i + 1], vertices[3 * i + 2]])
}

/// `0..count` as indices, for curves sent without connectivity.
pub fn identity_indices(count: usize) -> Vec<u32> {
    (0..count as u32).collect()
}

fn register_labels(table: &mut LabelTable, labels: &[i32]) {
    for &label in labels {
        table.add(label);
    }
    table.generate_colors();
}

fn expand<F>(vertices: &[f32], indices: &[u32], mut color_of: F) -> Result<Vec<Vertex>, GeometryError>
where
    F: FnMut(usize) -> Color,
{
    let count = point_count(vertices)?;
    let mut out = alloc_vertices(indices.len())?;
    for (i, &index) in indices.iter().enumerate() {
        out.push(Vertex::new(point_at(vertices, index, count)?, color_of(i)));
    }
    Ok(out)
}

/// Expands `indices` over `vertices` into one black vertex per index.
///
/// Every label is registered in `table` (and the table's colors regenerated)
/// so that later overlays of the same object can be colored consistently,
/// but the mesh itself stays uncolored.
pub fn construct_geometry(
    ty: GeometryType,
    vertices: &[f32],
    indices: &[u32],
    labels: &[i32],
    table: &mut LabelTable,
) -> Result<Geometry, GeometryError> {
    register_labels(table, labels);
    let out = expand(vertices, indices, |_| Color::BLACK)?;
    Ok(Geometry::new(ty.into(), out, GeometryDescriptor::for_type(ty)))
}

/// Expands a border line list, coloring output vertex `i` by `labels[i]`.
///
/// `labels` is per output vertex and must be as long as `indices`.
pub fn construct_border(
    vertices: &[f32],
    indices: &[u32],
    labels: &[i32],
    table: &mut LabelTable,
) -> Result<Geometry, GeometryError> {
    if labels.len() != indices.len() {
        return Err(GeometryError::MismatchedLength {
            what: "border labels",
            expected: indices.len(),
            actual: labels.len(),
        });
    }

    register_labels(table, labels);
    let out = expand(vertices, indices, |i| table.color(labels[i]))?;
    Ok(Geometry::new(
        GeometryKind::Border,
        out,
        GeometryDescriptor::line_list(BORDER_LINE_WIDTH),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrimitiveTopology;

    const QUAD: [f32; 12] = [
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        1.0, 1.0, 0.0, //
        0.0, 1.0, 0.0,
    ];

    #[test]
    fn one_vertex_per_index() {
        let mut table = LabelTable::new();
        let indices = [0, 1, 2, 0, 2, 3];
        let labels = [1, 1, 1, 2, 2, 2];
        let g = construct_geometry(GeometryType::Mesh2D, &QUAD, &indices, &labels, &mut table).unwrap();

        assert_eq!(g.vertex_count(), indices.len());
        assert_eq!(g.kind, GeometryKind::Mesh2D);
        assert_eq!(g.vertices[2].position, [1.0, 1.0, 0.0]);
        assert_eq!(g.vertices[5].position, [0.0, 1.0, 0.0]);
        assert!(g.vertices.iter().all(|v| v.color == Color::BLACK));

        // Labels are registered and colored even though the mesh is not.
        assert_eq!(table.labels(), &[1, 2]);
        assert_ne!(table.color(2), Color::BLACK);
    }

    #[test]
    fn empty_indices_give_empty_geometry() {
        let mut table = LabelTable::new();
        let g = construct_geometry(GeometryType::Curve2D, &QUAD, &[], &[], &mut table).unwrap();
        assert!(g.is_empty());
        assert_eq!(g.descriptor.topology, PrimitiveTopology::LineStrip);
    }

    #[test]
    fn rejects_index_past_the_end() {
        let mut table = LabelTable::new();
        let err = construct_geometry(GeometryType::Mesh2D, &QUAD, &[0, 1, 4], &[], &mut table).unwrap_err();
        assert_eq!(
            err,
            GeometryError::IndexOutOfRange {
                what: "vertex",
                index: 4,
                len: 4
            }
        );
    }

    #[test]
    fn rejects_partial_vertex() {
        let mut table = LabelTable::new();
        let err = construct_geometry(GeometryType::Mesh3D, &QUAD[..11], &[0], &[], &mut table).unwrap_err();
        assert!(matches!(err, GeometryError::MismatchedLength { actual: 11, .. }));
    }

    #[test]
    fn border_colors_follow_output_labels() {
        let mut table = LabelTable::new();
        let indices = [0, 1, 1, 2, 2, 3];
        let labels = [5, 5, 8, 8, 5, 5];
        let g = construct_border(&QUAD, &indices, &labels, &mut table).unwrap();

        assert_eq!(g.vertex_count(), 6);
        assert_eq!(g.kind, GeometryKind::Border);
        assert_eq!(g.descriptor.topology, PrimitiveTopology::LineList);
        assert_eq!(g.vertices[0].color, table.color(5));
        assert_eq!(g.vertices[2].color, table.color(8));
        assert_ne!(g.vertices[0].color, g.vertices[2].color);
    }

    #[test]
    fn border_labels_must_match_indices() {
        let mut table = LabelTable::new();
        let err = construct_border(&QUAD, &[0, 1, 1, 2], &[1, 1], &mut table).unwrap_err();
        assert_eq!(
            err,
            GeometryError::MismatchedLength {
                what: "border labels",
                expected: 4,
                actual: 2
            }
        );
    }

    #[test]
    fn identity_indices_cover_every_point() {
        assert_eq!(identity_indices(4), vec![0, 1, 2, 3]);
        assert!(identity_indices(0).is_empty());
    }
}
