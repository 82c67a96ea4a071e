use crate::frame::{read_frame, Frame};
use anyhow::{anyhow, Context};
use crossbeam_channel::Sender;
use std::{io, thread, time::Duration};
use tokio::{io::BufReader, net::TcpStream};

/// Where and how patiently to talk to the simulation.
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub addr: String,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

/// Runs the link on its own thread and forwards every reassembled payload to
/// `tx`. The thread ends when the server hangs up, the link goes idle past
/// its deadline, or `tx`'s receiver is dropped.
pub fn spawn_network(cfg: NetConfig, tx: Sender<Vec<u8>>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("ff-net".into())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .enable_time()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("Failed to start network runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async move {
                match run_network_loop(&cfg, tx).await {
                    Ok(()) => log::info!("Network thread completed normally"),
                    Err(e) => log::error!("Network thread error: {:#}", e),
                }
            });
        })
}

async fn run_network_loop(cfg: &NetConfig, tx: Sender<Vec<u8>>) -> anyhow::Result<()> {
    let stream = tokio::time::timeout(cfg.connect_timeout, TcpStream::connect(&cfg.addr))
        .await
        .map_err(|_| anyhow!("connecting to {} timed out after {:?}", cfg.addr, cfg.connect_timeout))?
        .with_context(|| format!("failed to connect to {}", cfg.addr))?;
    stream.set_nodelay(true)?;

    log::info!("Connected to simulation at {}", cfg.addr);

    let mut reader = BufReader::new(stream);
    let mut payloads = 0u64;
    let mut bytes = 0u64;

    while let Some(frame) = read_frame(&mut reader, cfg.idle_timeout)
        .await
        .context("link closed")?
    {
        match frame {
            Frame::Heartbeat => log::trace!("Heartbeat"),
            Frame::Payload(payload) => {
                payloads += 1;
                bytes += payload.len() as u64;
                log::debug!("Payload #{} ({} bytes)", payloads, payload.len());

                if tx.send(payload).is_err() {
                    log::info!("Payload receiver dropped; closing link");
                    return Ok(());
                }
            }
        }
    }

    log::info!("Simulation closed the link after {} payloads ({} bytes)", payloads, bytes);
    Ok(())
}
