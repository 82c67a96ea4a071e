use crate::{config::Config, scene::Scene};
use anyhow::Result;
use crossbeam_channel::{Receiver, TryRecvError};
use ffgeom::{ConstructedGeometry, ImportHandle, Importer, ThreadSafeQueue};
use glam::{Mat4, Vec3};
use std::sync::Arc;

/// Drawable area, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

/// Counters accumulated over the lifetime of the app.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub payloads: usize,
    pub geometries: usize,
    pub failed_geometries: usize,
    pub failed_payloads: usize,
}

/// Ties the network feed, the import pool and the scene together. Owned and
/// ticked by the main thread.
pub struct App {
    importer: Arc<Importer>,
    queue: Arc<ThreadSafeQueue<ConstructedGeometry>>,
    payloads: Receiver<Vec<u8>>,
    pending: Vec<ImportHandle>,
    payloads_closed: bool,
    pub scene: Scene,
    pub viewport: Viewport,
    pub stats: Stats,
}

impl App {
    pub fn new(config: &Config, payloads: Receiver<Vec<u8>>) -> Result<Self> {
        let queue = Arc::new(match config.queue_capacity {
            0 => ThreadSafeQueue::unbounded(),
            n => ThreadSafeQueue::bounded(n),
        });
        let importer = Arc::new(Importer::new(
            config.import_threads,
            Arc::clone(&queue),
            config.error_policy(),
        )?);
        match queue.capacity() {
            Some(n) => log::info!("Import pool ready with {} workers, queue bounded at {}", importer.threads(), n),
            None => log::info!("Import pool ready with {} workers, unbounded queue", importer.threads()),
        }

        Ok(Self {
            importer,
            queue,
            payloads,
            pending: Vec::new(),
            payloads_closed: false,
            scene: Scene::new(),
            viewport: Viewport {
                width: config.screen_width,
                height: config.screen_height,
            },
            stats: Stats::default(),
        })
    }

    /// One frame: hand new payloads to the pool, collect finished imports
    /// and move at most one geometry into the scene.
    ///
    /// Returns `true` if the scene changed.
    pub fn tick(&mut self) -> bool {
        self.receive_payloads();
        self.collect_reports();

        match self.queue.try_pop() {
            Some(geometry) => {
                self.scene.insert(geometry);
                true
            }
            None => false,
        }
    }

    fn receive_payloads(&mut self) {
        if self.payloads_closed {
            return;
        }
        loop {
            match self.payloads.try_recv() {
                Ok(bytes) => {
                    log::debug!("Importing payload of {} bytes", bytes.len());
                    self.stats.payloads += 1;
                    self.pending.push(self.importer.import_async(bytes));
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::info!("Plot stream closed");
                    self.payloads_closed = true;
                    break;
                }
            }
        }
    }

    fn collect_reports(&mut self) {
        let stats = &mut self.stats;
        self.pending.retain(|handle| match handle.try_report() {
            None => true,
            Some(Ok(report)) => {
                stats.geometries += report.pushed;
                stats.failed_geometries += report.failed.len();
                if !report.is_clean() {
                    log::warn!(
                        "Plot {}: {} geometries dropped",
                        report.plot_id,
                        report.failed.len()
                    );
                }
                false
            }
            Some(Err(e)) => {
                log::error!("Payload rejected: {}", e);
                stats.failed_payloads += 1;
                false
            }
        });
    }

    /// No more payloads can arrive and everything received has been drawn.
    pub fn is_finished(&self) -> bool {
        self.payloads_closed && self.pending.is_empty() && self.queue.is_empty()
    }

    /// Imports still running on the pool.
    pub fn pending_imports(&self) -> usize {
        self.pending.len()
    }

    /// Orthographic projection framing the whole scene in the viewport,
    /// keeping the aspect ratio of the data.
    pub fn view_projection(&self) -> Mat4 {
        let Some(bounds) = self.scene.bounds() else {
            return Mat4::IDENTITY;
        };
        let center = bounds.center();
        let extent = bounds.extent().max(Vec3::splat(f32::EPSILON));

        let aspect = self.viewport.aspect();
        let mut half_w = extent.x * 0.5;
        let mut half_h = extent.y * 0.5;
        if half_w / half_h.max(f32::EPSILON) < aspect {
            half_w = half_h * aspect;
        } else {
            half_h = half_w / aspect;
        }
        let depth = extent.z.max(extent.x).max(extent.y);

        Mat4::orthographic_rh(
            center.x - half_w,
            center.x + half_w,
            center.y - half_h,
            center.y + half_h,
            -(center.z + depth),
            -(center.z - depth),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use ffgeom::{GeometryRecord, PlotPayload};
    use std::time::{Duration, Instant};

    fn config(extra: &[&str]) -> Config {
        let mut args = vec!["ff_viewer", "--ImportThreads", "2"];
        args.extend_from_slice(extra);
        Config::parse_from(args)
    }

    fn mesh_payload(plot_id: u16) -> Vec<u8> {
        PlotPayload {
            plot_id,
            geometries: vec![GeometryRecord {
                ty: "Mesh2D".into(),
                mesh_id: 1,
                vertices: vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                mesh_indices: vec![0, 1, 2],
                mesh_labels: vec![1],
                ..Default::default()
            }],
        }
        .encode()
    }

    fn run_until_finished(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !app.is_finished() {
            assert!(Instant::now() < deadline, "app did not drain");
            app.tick();
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn payloads_end_up_in_the_scene() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut app = App::new(&config(&["--QueueCapacity", "1"]), rx).unwrap();

        tx.send(mesh_payload(1)).unwrap();
        tx.send(mesh_payload(2)).unwrap();
        drop(tx);
        run_until_finished(&mut app);

        assert_eq!(app.queue.capacity(), Some(1));
        assert_eq!(app.scene.plots(), vec![1, 2]);
        assert_eq!(app.scene.vertex_count(), 6);
        assert_eq!(app.stats.payloads, 2);
        assert_eq!(app.stats.geometries, 2);
        assert_eq!(app.pending_imports(), 0);
    }

    #[test]
    fn undecodable_payload_is_counted_and_skipped() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut app = App::new(&config(&[]), rx).unwrap();

        tx.send(vec![0xff, 0x00, 0x13]).unwrap();
        drop(tx);
        run_until_finished(&mut app);

        assert!(app.scene.is_empty());
        assert_eq!(app.stats.failed_payloads, 1);
    }

    #[test]
    fn projection_frames_the_scene() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut app = App::new(&config(&[]), rx).unwrap();
        assert_eq!(app.view_projection(), Mat4::IDENTITY);

        tx.send(mesh_payload(1)).unwrap();
        drop(tx);
        run_until_finished(&mut app);

        let vp = app.view_projection();
        let corner = vp.project_point3(Vec3::new(2.0, 1.0, 0.0));
        let origin = vp.project_point3(Vec3::ZERO);
        assert!(corner.x <= 1.0 + 1e-5 && origin.x >= -1.0 - 1e-5);
        assert!(corner.y <= 1.0 + 1e-5 && origin.y >= -1.0 - 1e-5);
        assert!((0.0..=1.0).contains(&origin.z));
    }
}
