//! Scalar-field contouring and vector-field glyphs over subdivided triangles.
//!
//! Every source triangle is refined with the same reference pattern: a set of
//! barycentric sub-vertices (`IsoPSub`, two floats each) and sub-triangles over
//! them (`IsoKSub`, three indices each). Field samples come per source
//! triangle, one per sub-vertex (scalar) or two per sub-vertex (vector).
//!
//! Contouring is 2D: only x and y of the source vertices are used and every
//! emitted vertex has z = 0.

use crate::color::Color;
use crate::construct::{point_at, point_count};
use crate::error::GeometryError;
use crate::types::{alloc_vertices, Geometry, GeometryDescriptor, GeometryKind, Vertex};
use arrayvec::ArrayVec;
use glam::DVec2;
use rayon::prelude::*;

/// Number of iso-levels drawn for a scalar field.
pub const ISOLINE_COUNT: usize = 20;

/// Two endpoint values closer than this are treated as a flat edge.
pub const FLAT_EDGE_EPS: f64 = 1e-11;

/// Crossings closer than this fraction of the shortest squared edge are
/// dropped as degenerate.
pub const DEGENERATE_SEGMENT_SCALE: f64 = 1e-8;

/// `ISOLINE_COUNT` levels from `min` (inclusive) towards `max` (exclusive).
pub fn iso_levels(min: f64, max: f64) -> [f64; ISOLINE_COUNT] {
    let step = (max - min) / ISOLINE_COUNT as f64;
    std::array::from_fn(|i| step * i as f64 + min)
}

/// Reference refinement applied to every source triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Subdivision {
    points: Vec<DVec2>,
    triangles: Vec<[usize; 3]>,
}

impl Subdivision {
    /// Builds the pattern from its wire form, checking every sub-triangle
    /// index against the number of sub-vertices.
    pub fn new(points: &[f64], triangles: &[u32]) -> Result<Self, GeometryError> {
        if points.len() % 2 != 0 {
            return Err(GeometryError::MismatchedLength {
                what: "sub-vertex coordinates (stride 2)",
                expected: points.len() - 1,
                actual: points.len(),
            });
        }
        if triangles.len() % 3 != 0 {
            return Err(GeometryError::MismatchedLength {
                what: "sub-triangle indices (stride 3)",
                expected: triangles.len() - triangles.len() % 3,
                actual: triangles.len(),
            });
        }

        let points: Vec<DVec2> = points
            .chunks_exact(2)
            .map(|p| DVec2::new(p[0], p[1]))
            .collect();

        let triangles = triangles
            .chunks_exact(3)
            .map(|k| {
                let mut tri = [0usize; 3];
                for (slot, &index) in tri.iter_mut().zip(k) {
                    let index = index as usize;
                    if index >= points.len() {
                        return Err(GeometryError::IndexOutOfRange {
                            what: "sub-vertex",
                            index,
                            len: points.len(),
                        });
                    }
                    *slot = index;
                }
                Ok(tri)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { points, triangles })
    }

    /// The trivial pattern: the triangle itself.
    pub fn identity() -> Self {
        Self {
            points: vec![DVec2::ZERO, DVec2::X, DVec2::Y],
            triangles: vec![[0, 1, 2]],
        }
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Maps every reference point into `triangle`.
    fn place(&self, triangle: &[DVec2; 3]) -> Vec<DVec2> {
        self.points
            .iter()
            .map(|&p| barycentric(triangle, p))
            .collect()
    }
}

/// `[t1 - t0 | t2 - t0] * p + t0`.
#[inline]
pub fn barycentric(triangle: &[DVec2; 3], p: DVec2) -> DVec2 {
    (triangle[1] - triangle[0]) * p.x + (triangle[2] - triangle[0]) * p.y + triangle[0]
}

/// What one sub-triangle contributes to one level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelCut {
    /// Edges whose two endpoint values both sit on the level.
    pub flat_edges: ArrayVec<[DVec2; 2], 3>,
    /// Interpolated crossings in edge order, consecutive duplicates dropped.
    pub crossings: ArrayVec<DVec2, 3>,
    /// Segment through the first two crossings, when they are distinct enough.
    pub segment: Option<[DVec2; 2]>,
}

/// Cuts one sub-triangle at `level`.
///
/// Edges are visited as `(0,1), (1,2), (2,0)`. `min_dist2` is the squared
/// distance the first two crossings must exceed to form a segment.
pub fn cut_sub_triangle(pt: &[DVec2; 3], ff: &[f64; 3], level: f64, min_dist2: f64) -> LevelCut {
    let mut cut = LevelCut::default();

    for m in 0..3 {
        let a = (m + 1) % 3;
        let (fi, fj) = (ff[m], ff[a]);
        let on_edge = (fi <= level && level <= fj) || (fj <= level && level <= fi);
        if !on_edge {
            continue;
        }

        if (fi - fj).abs() <= FLAT_EDGE_EPS {
            cut.flat_edges.push([pt[m], pt[a]]);
            continue;
        }

        let lambda = (fi - level) / (fi - fj);
        let p = pt[m] * (1.0 - lambda) + pt[a] * lambda;
        if cut.crossings.last() != Some(&p) {
            cut.crossings.push(p);
        }
    }

    if cut.crossings.len() >= 2 && cut.crossings[0].distance_squared(cut.crossings[1]) > min_dist2 {
        cut.segment = Some([cut.crossings[0], cut.crossings[1]]);
    }

    cut
}

/// Smallest squared edge length of `pt`, scaled down to a degeneracy bound.
#[inline]
fn degenerate_bound(pt: &[DVec2; 3]) -> f64 {
    pt[0]
        .distance_squared(pt[1])
        .min(pt[0].distance_squared(pt[2]))
        .min(pt[1].distance_squared(pt[2]))
        * DEGENERATE_SEGMENT_SCALE
}

/// Source triangles as 2D corner triples.
fn source_triangles(vertices: &[f32], indices: &[u32]) -> Result<Vec<[DVec2; 3]>, GeometryError> {
    if indices.len() % 3 != 0 {
        return Err(GeometryError::MismatchedLength {
            what: "triangle indices (stride 3)",
            expected: indices.len() - indices.len() % 3,
            actual: indices.len(),
        });
    }

    let count = point_count(vertices)?;
    indices
        .chunks_exact(3)
        .map(|tri| {
            let mut out = [DVec2::ZERO; 3];
            for (corner, &index) in out.iter_mut().zip(tri) {
                let [x, y, _] = point_at(vertices, index, count)?;
                *corner = DVec2::new(x as f64, y as f64);
            }
            Ok(out)
        })
        .collect()
}

/// Samples per source triangle; `values` must split evenly.
fn values_per_triangle(values: &[f64], triangles: usize) -> Result<usize, GeometryError> {
    if triangles == 0 {
        return Ok(0);
    }
    let per = values.len() / triangles;
    if per * triangles != values.len() {
        return Err(GeometryError::MismatchedLength {
            what: "field values",
            expected: per * triangles,
            actual: values.len(),
        });
    }
    Ok(per)
}

#[inline]
fn vertex2(p: DVec2, color: Color) -> Vertex {
    Vertex::new([p.x as f32, p.y as f32, 0.0], color)
}

fn gather(chunks: Vec<Vec<Vertex>>) -> Result<Vec<Vertex>, GeometryError> {
    let mut out = alloc_vertices(chunks.iter().map(Vec::len).sum())?;
    for chunk in chunks {
        out.extend(chunk);
    }
    Ok(out)
}

/// Iso-lines of a scalar field as a line list.
///
/// `values` holds one sample per sub-vertex for each source triangle, in
/// triangle order. `min`/`max` bound the levels (see [`iso_levels`]); the
/// blue channel encodes the level's position in that range.
///
/// The returned geometry holds exactly the emitted vertices, ordered by
/// source triangle, then sub-triangle, then level.
pub fn construct_iso_lines(
    vertices: &[f32],
    indices: &[u32],
    values: &[f64],
    subdivision: &Subdivision,
    min: f64,
    max: f64,
) -> Result<Geometry, GeometryError> {
    let triangles = source_triangles(vertices, indices)?;
    let per_triangle = values_per_triangle(values, triangles.len())?;
    if !triangles.is_empty() && subdivision.points.len() > per_triangle {
        return Err(GeometryError::IndexOutOfRange {
            what: "field value",
            index: subdivision.points.len() - 1,
            len: per_triangle,
        });
    }

    let levels = iso_levels(min, max);
    let range = max - min;
    let colors: [Color; ISOLINE_COUNT] = std::array::from_fn(|i| {
        let t = if range != 0.0 && range.is_finite() { (levels[i] - min) / range } else { 0.0 };
        Color::rgba(1.0, 0.0, t as f32, 1.0)
    });

    let chunks: Vec<Vec<Vertex>> = triangles
        .par_iter()
        .enumerate()
        .map(|(t, triangle)| {
            let pn = subdivision.place(triangle);
            let samples = &values[t * per_triangle..(t + 1) * per_triangle];
            let mut out = Vec::new();

            for k in &subdivision.triangles {
                let pt = [pn[k[0]], pn[k[1]], pn[k[2]]];
                let ff = [samples[k[0]], samples[k[1]], samples[k[2]]];
                let min_dist2 = degenerate_bound(&pt);

                for (&level, &color) in levels.iter().zip(&colors) {
                    let cut = cut_sub_triangle(&pt, &ff, level, min_dist2);
                    for [a, b] in cut.flat_edges.iter().chain(cut.segment.iter()) {
                        out.push(vertex2(*a, color));
                        out.push(vertex2(*b, color));
                    }
                }
            }
            out
        })
        .collect();

    let out = gather(chunks)?;
    log::trace!(
        "iso-lines: {} triangles x {} sub-triangles -> {} vertices",
        triangles.len(),
        subdivision.triangles.len(),
        out.len()
    );

    Ok(Geometry::new(
        GeometryKind::IsoLine,
        out,
        GeometryDescriptor::line_list(1.0),
    ))
}

/// Arrow glyphs for a 2-component field as a line list (base, tip pairs).
///
/// `values` holds one `(u, v)` pair per sub-vertex for each source
/// triangle. Glyphs are scaled so the longest vector of the whole field has
/// length `max_norm - min_norm`; green encodes the normalized magnitude.
pub fn construct_iso_vector(
    vertices: &[f32],
    indices: &[u32],
    values: &[f64],
    subdivision: &Subdivision,
) -> Result<Geometry, GeometryError> {
    let triangles = source_triangles(vertices, indices)?;
    let per_triangle = values_per_triangle(values, triangles.len())?;
    if !triangles.is_empty() && 2 * subdivision.points.len() > per_triangle {
        return Err(GeometryError::IndexOutOfRange {
            what: "vector value",
            index: 2 * subdivision.points.len() - 1,
            len: per_triangle,
        });
    }

    let (min, max) = values
        .chunks_exact(2)
        .map(|uv| DVec2::new(uv[0], uv[1]).length())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), n| (lo.min(n), hi.max(n)));
    let range = if max >= min { max - min } else { 0.0 };
    let scale = if max > 0.0 { range / max } else { 0.0 };

    let chunks: Vec<Vec<Vertex>> = triangles
        .par_iter()
        .enumerate()
        .map(|(t, triangle)| {
            let pn = subdivision.place(triangle);
            let samples = &values[t * per_triangle..(t + 1) * per_triangle];
            let mut out = Vec::with_capacity(2 * pn.len());

            for (j, &base) in pn.iter().enumerate() {
                let uv = DVec2::new(samples[2 * j], samples[2 * j + 1]);
                let norm = if range > 0.0 { (uv.length() - min) / range } else { 0.0 };
                let color = Color::rgba(1.0, norm as f32, 0.5, 0.5);
                out.push(vertex2(base, color));
                out.push(vertex2(base + uv * scale, color));
            }
            out
        })
        .collect();

    Ok(Geometry::new(
        GeometryKind::IsoVector,
        gather(chunks)?,
        GeometryDescriptor::line_list(1.0),
    ))
}
