//! Entry point for the FreeFEM plot viewer.

use anyhow::{Context, Result};
use ff_viewer::{app::App, config::Config, net::spawn_network};
use std::time::Instant;

fn main() -> Result<()> {
    // Initialize logging; default to "info" if RUST_LOG is unset.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_args();
    log::info!(
        "Connecting to {} (viewport {}x{}, {} fps)",
        config.addr(),
        config.screen_width,
        config.screen_height,
        config.frame_rate
    );

    let (tx, rx) = crossbeam_channel::unbounded();
    let net = spawn_network(config.net(), tx).context("failed to start network thread")?;
    let mut app = App::new(&config, rx).context("failed to start import pool")?;

    let interval = config.frame_interval();
    let started = Instant::now();
    while !app.is_finished() {
        let frame_start = Instant::now();
        if app.tick() {
            log::debug!(
                "Scene: {} geometries, {} vertices, {} draw calls",
                app.scene.len(),
                app.scene.vertex_count(),
                app.scene.draw_list().count()
            );
        }
        if let Some(rest) = interval.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    if net.join().is_err() {
        log::error!("Network thread panicked");
    }

    let stats = app.stats;
    log::info!(
        "Done after {:.1}s: {} payloads, {} geometries ({} vertices), {} geometries and {} payloads rejected",
        started.elapsed().as_secs_f64(),
        stats.payloads,
        stats.geometries,
        app.scene.vertex_count(),
        stats.failed_geometries,
        stats.failed_payloads
    );
    Ok(())
}
