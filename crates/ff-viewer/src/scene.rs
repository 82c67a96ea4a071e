//! Render-side store of everything received so far.
//!
//! All geometries share one vertex buffer. It is rebuilt from scratch on
//! every change, which also reassigns each geometry's byte offset.

use ffgeom::{ConstructedGeometry, GeometryDescriptor, GeometryKind, MeshId, PlotId, Vertex};
use glam::Vec3;
use std::collections::HashSet;

/// One draw call over the shared vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub plot_id: PlotId,
    pub mesh_id: MeshId,
    pub kind: GeometryKind,
    /// Byte offset of the first vertex.
    pub offset: u64,
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub descriptor: GeometryDescriptor,
}

/// Axis-aligned bounds of all loaded vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    entries: Vec<ConstructedGeometry>,
    staging: Vec<Vertex>,
    hidden: HashSet<GeometryKind>,
    rebuilds: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, geometry: ConstructedGeometry) {
        log::debug!(
            "Plot {} mesh {}: {:?} with {} vertices",
            geometry.plot_id,
            geometry.mesh_id,
            geometry.geometry.kind,
            geometry.geometry.vertex_count()
        );
        self.entries.push(geometry);
        self.rebuild();
    }

    /// Drops every geometry of `plot_id`; returns how many were removed.
    pub fn remove_plot(&mut self, plot_id: PlotId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|g| g.plot_id != plot_id);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.rebuild();
        }
        removed
    }

    pub fn set_layer_visible(&mut self, kind: GeometryKind, visible: bool) {
        if visible {
            self.hidden.remove(&kind);
        } else {
            self.hidden.insert(kind);
        }
    }

    pub fn is_layer_visible(&self, kind: GeometryKind) -> bool {
        !self.hidden.contains(&kind)
    }

    fn rebuild(&mut self) {
        self.staging.clear();
        self.staging
            .reserve(self.entries.iter().map(|g| g.geometry.vertex_count()).sum());

        for entry in &mut self.entries {
            let offset = (self.staging.len() * std::mem::size_of::<Vertex>()) as u64;
            entry.geometry.assign_buffer_offset(offset);
            self.staging.extend_from_slice(&entry.geometry.vertices);
        }
        self.rebuilds += 1;
    }

    /// Draw calls for every visible, non-empty geometry, in arrival order.
    pub fn draw_list(&self) -> impl Iterator<Item = DrawItem> + '_ {
        self.entries
            .iter()
            .filter(|g| !g.geometry.is_empty() && self.is_layer_visible(g.geometry.kind))
            .filter_map(|g| {
                let offset = g.geometry.buffer_offset()?;
                Some(DrawItem {
                    plot_id: g.plot_id,
                    mesh_id: g.mesh_id,
                    kind: g.geometry.kind,
                    offset,
                    first_vertex: (offset / std::mem::size_of::<Vertex>() as u64) as u32,
                    vertex_count: g.geometry.vertex_count() as u32,
                    descriptor: g.geometry.descriptor,
                })
            })
    }

    /// The packed vertex buffer, ready for upload.
    pub fn staging_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.staging)
    }

    pub fn vertex_count(&self) -> usize {
        self.staging.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many times the shared buffer has been rebuilt.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn plots(&self) -> Vec<PlotId> {
        let mut ids: Vec<PlotId> = self.entries.iter().map(|g| g.plot_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut it = self.staging.iter().map(|v| Vec3::from_array(v.position));
        let first = it.next()?;
        let (min, max) = it.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Bounds { min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffgeom::{Color, Geometry};

    fn geometry(plot_id: PlotId, mesh_id: MeshId, kind: GeometryKind, n: usize, x: f32) -> ConstructedGeometry {
        ConstructedGeometry {
            plot_id,
            mesh_id,
            geometry: Geometry::new(
                kind,
                vec![Vertex::new([x, 0.0, 0.0], Color::BLACK); n],
                GeometryDescriptor::line_list(1.0),
            ),
        }
    }

    #[test]
    fn offsets_follow_packing_order() {
        let mut scene = Scene::new();
        scene.insert(geometry(1, 1, GeometryKind::Mesh2D, 3, 0.0));
        scene.insert(geometry(1, 1, GeometryKind::Border, 4, 1.0));
        scene.insert(geometry(2, 5, GeometryKind::IsoLine, 2, 2.0));

        let items: Vec<_> = scene.draw_list().collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].offset, 0);
        assert_eq!(items[1].offset, 3 * 28);
        assert_eq!(items[2].offset, 7 * 28);
        assert_eq!(items[2].first_vertex, 7);
        assert_eq!(scene.vertex_count(), 9);
        assert_eq!(scene.staging_bytes().len(), 9 * 28);
        assert_eq!(scene.rebuilds(), 3);
    }

    #[test]
    fn removing_a_plot_repacks_the_rest() {
        let mut scene = Scene::new();
        scene.insert(geometry(1, 1, GeometryKind::Mesh2D, 3, 0.0));
        scene.insert(geometry(2, 1, GeometryKind::Mesh2D, 2, 5.0));
        assert_eq!(scene.plots(), vec![1, 2]);

        assert_eq!(scene.remove_plot(1), 1);
        assert_eq!(scene.remove_plot(9), 0);
        let items: Vec<_> = scene.draw_list().collect();
        assert_eq!(items.len(), 1);
        assert_eq!((items[0].plot_id, items[0].offset), (2, 0));
        assert_eq!(scene.vertex_count(), 2);
    }

    #[test]
    fn hidden_layers_are_not_drawn() {
        let mut scene = Scene::new();
        scene.insert(geometry(1, 1, GeometryKind::Mesh2D, 3, 0.0));
        scene.insert(geometry(1, 1, GeometryKind::IsoLine, 2, 0.0));
        scene.insert(geometry(1, 1, GeometryKind::IsoVector, 0, 0.0));

        scene.set_layer_visible(GeometryKind::Mesh2D, false);
        let kinds: Vec<_> = scene.draw_list().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![GeometryKind::IsoLine]);

        scene.set_layer_visible(GeometryKind::Mesh2D, true);
        assert_eq!(scene.draw_list().count(), 2);
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let mut scene = Scene::new();
        assert_eq!(scene.bounds(), None);
        scene.insert(geometry(1, 1, GeometryKind::Mesh2D, 1, -2.0));
        scene.insert(geometry(1, 2, GeometryKind::Mesh2D, 1, 4.0));
        let b = scene.bounds().unwrap();
        assert_eq!(b.min.x, -2.0);
        assert_eq!(b.max.x, 4.0);
        assert_eq!(b.center().x, 1.0);
    }
}
