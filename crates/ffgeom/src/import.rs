//! Payload → geometries: decodes a plot update and builds every geometry it
//! describes on a bounded worker pool, handing results to the render queue.

use crate::construct::{construct_border, construct_geometry, identity_indices};
use crate::error::{GeometryError, ImportError};
use crate::iso::{construct_iso_lines, construct_iso_vector, Subdivision};
use crate::label::LabelTable;
use crate::payload::{GeometryRecord, IsoRecord, PlotPayload};
use crate::queue::ThreadSafeQueue;
use crate::types::{ConstructedGeometry, Geometry, GeometryType, MeshId, PlotId};
use crossbeam_channel::{Receiver, TryRecvError};
use rayon::prelude::*;
use std::sync::Arc;

/// What to do when some geometry of a payload cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Log and drop the failed geometry, keep the rest.
    #[default]
    SkipInvalid,
    /// Push nothing from a payload unless every geometry succeeded.
    AbortBatch,
}

/// Outcome of one payload.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub plot_id: PlotId,
    pub pushed: usize,
    pub failed: Vec<(MeshId, GeometryError)>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

fn build_iso(record: &GeometryRecord, iso: &IsoRecord) -> Result<Geometry, GeometryError> {
    let subdivision = Subdivision::new(&iso.psub, &iso.ksub)?;
    if iso.is_vector {
        construct_iso_vector(&record.vertices, &record.mesh_indices, &iso.values, &subdivision)
    } else {
        construct_iso_lines(
            &record.vertices,
            &record.mesh_indices,
            &iso.values,
            &subdivision,
            iso.min,
            iso.max,
        )
    }
}

/// Builds every geometry one source object describes: the primary curve or
/// mesh, its field overlays, and its border.
///
/// Each entry succeeds or fails on its own; a failed primary does not stop
/// the overlays. Only an unknown `Type` rejects the whole object.
pub fn import_geometry(plot_id: PlotId, record: &GeometryRecord) -> Vec<Result<ConstructedGeometry, GeometryError>> {
    let ty: GeometryType = match record.ty.parse() {
        Ok(ty) => ty,
        Err(e) => return vec![Err(e)],
    };

    let wrap = |geometry: Geometry| ConstructedGeometry {
        plot_id,
        mesh_id: record.mesh_id,
        geometry,
    };

    let mut table = LabelTable::new();
    let mut out = Vec::with_capacity(1 + record.iso.len() + record.has_borders as usize);

    let primary = if ty.is_curve() && record.mesh_indices.is_empty() {
        let indices = identity_indices(record.vertices.len() / 3);
        construct_geometry(ty, &record.vertices, &indices, &record.mesh_labels, &mut table)
    } else {
        construct_geometry(ty, &record.vertices, &record.mesh_indices, &record.mesh_labels, &mut table)
    };
    out.push(primary.map(wrap));

    if record.has_iso_values {
        out.extend(record.iso.iter().map(|iso| build_iso(record, iso).map(wrap)));
    }

    if record.has_borders {
        out.push(
            construct_border(&record.vertices, &record.border_indices, &record.border_labels, &mut table)
                .map(wrap),
        );
    }

    out
}

/// Decodes payloads and builds their geometries on a fixed-size pool.
pub struct Importer {
    pool: rayon::ThreadPool,
    queue: Arc<ThreadSafeQueue<ConstructedGeometry>>,
    policy: ErrorPolicy,
}

impl Importer {
    /// `threads == 0` lets rayon pick one worker per core.
    pub fn new(
        threads: usize,
        queue: Arc<ThreadSafeQueue<ConstructedGeometry>>,
        policy: ErrorPolicy,
    ) -> Result<Self, ImportError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("ff-import-{i}"))
            .build()?;
        Ok(Self { pool, queue, policy })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Imports one payload and returns once every geometry in it has been
    /// built and either queued or dropped.
    ///
    /// With a bounded queue this blocks while the queue is full, so do not
    /// call it from the thread that drains the queue; use
    /// [`Importer::import_async`] there.
    pub fn import(&self, bytes: &[u8]) -> Result<ImportReport, ImportError> {
        let payload = PlotPayload::decode(bytes)?;
        self.pool.install(|| self.import_payload(&payload))
    }

    /// Queues the import on the pool and returns immediately.
    pub fn import_async(self: &Arc<Self>, bytes: Vec<u8>) -> ImportHandle {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let this = Arc::clone(self);
        self.pool.spawn(move || {
            // The receiver may already be gone; the geometries are queued either way.
            let _ = tx.send(this.import(&bytes));
        });
        ImportHandle { rx }
    }

    fn import_payload(&self, payload: &PlotPayload) -> Result<ImportReport, ImportError> {
        let plot_id = payload.plot_id;
        let mut report = ImportReport {
            plot_id,
            ..Default::default()
        };

        match self.policy {
            ErrorPolicy::SkipInvalid => {
                let results: Vec<(usize, Vec<(MeshId, GeometryError)>)> = payload
                    .geometries
                    .par_iter()
                    .map(|record| {
                        let mut pushed = 0;
                        let mut failed = Vec::new();
                        for result in import_geometry(plot_id, record) {
                            match result {
                                Ok(g) => {
                                    self.queue.push(g);
                                    pushed += 1;
                                }
                                Err(e) => {
                                    log::warn!(
                                        "Plot {} mesh {}: dropping geometry: {}",
                                        plot_id,
                                        record.mesh_id,
                                        e
                                    );
                                    failed.push((record.mesh_id, e));
                                }
                            }
                        }
                        (pushed, failed)
                    })
                    .collect();

                for (pushed, failed) in results {
                    report.pushed += pushed;
                    report.failed.extend(failed);
                }
            }
            ErrorPolicy::AbortBatch => {
                let results: Vec<(MeshId, Vec<Result<ConstructedGeometry, GeometryError>>)> = payload
                    .geometries
                    .par_iter()
                    .map(|record| (record.mesh_id, import_geometry(plot_id, record)))
                    .collect();

                let mut built = Vec::new();
                for (mesh_id, entries) in results {
                    for entry in entries {
                        match entry {
                            Ok(g) => built.push(g),
                            Err(e) => report.failed.push((mesh_id, e)),
                        }
                    }
                }

                if !report.failed.is_empty() {
                    for (mesh_id, e) in &report.failed {
                        log::warn!("Plot {} mesh {}: {}", plot_id, mesh_id, e);
                    }
                    return Err(ImportError::Aborted {
                        failed: report.failed.len(),
                        succeeded: built.len(),
                    });
                }

                report.pushed = built.len();
                for g in built {
                    self.queue.push(g);
                }
            }
        }

        log::debug!(
            "Plot {}: {} objects -> {} geometries queued, {} failed",
            plot_id,
            payload.geometries.len(),
            report.pushed,
            report.failed.len()
        );

        Ok(report)
    }
}

/// Completion handle of [`Importer::import_async`].
pub struct ImportHandle {
    rx: Receiver<Result<ImportReport, ImportError>>,
}

impl ImportHandle {
    /// Blocks until the import has finished.
    pub fn wait(self) -> Result<ImportReport, ImportError> {
        self.rx.recv().map_err(|_| ImportError::WorkerLost)?
    }

    /// The result, if the import has finished.
    pub fn try_report(&self) -> Option<Result<ImportReport, ImportError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ImportError::WorkerLost)),
        }
    }
}
