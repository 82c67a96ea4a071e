use crate::net::NetConfig;
use clap::Parser;
use ffgeom::ErrorPolicy;
use std::ffi::OsString;
use std::time::Duration;

/// `ff_viewer` - headless FreeFEM plot client.
///
/// Connects to a running FreeFEM simulation, receives plot payloads and turns
/// them into packed vertex buffers ready for drawing.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Host of the simulation's plot server.
    #[arg(long = "Host", env = "FF_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port of the simulation's plot server.
    #[arg(long = "Port", env = "FF_PORT", default_value_t = 12345)]
    pub port: u16,

    /// Viewport width in pixels.
    #[arg(long = "ScreenWidth", env = "FF_SCREEN_WIDTH", default_value_t = 1280)]
    pub screen_width: u32,

    /// Viewport height in pixels.
    #[arg(long = "ScreenHeight", env = "FF_SCREEN_HEIGHT", default_value_t = 720)]
    pub screen_height: u32,

    /// Import worker threads; 0 uses one per core.
    #[arg(long = "ImportThreads", env = "FF_IMPORT_THREADS", default_value_t = 0)]
    pub import_threads: usize,

    /// Geometries allowed to wait for the render thread before importers
    /// block; 0 means unbounded.
    #[arg(long = "QueueCapacity", env = "FF_QUEUE_CAPACITY", default_value_t = 0)]
    pub queue_capacity: usize,

    /// Seconds to wait for the connection to be established.
    #[arg(long = "ConnectTimeout", env = "FF_CONNECT_TIMEOUT", default_value_t = 60)]
    pub connect_timeout_s: u64,

    /// Seconds the link may stay silent (heartbeats count) before it is closed.
    #[arg(long = "IdleTimeout", env = "FF_IDLE_TIMEOUT", default_value_t = 60)]
    pub idle_timeout_s: u64,

    /// Frame ticks per second of the main loop.
    #[arg(long = "FrameRate", env = "FF_FRAME_RATE", default_value_t = 60)]
    pub frame_rate: u32,

    /// Drop a whole payload if any of its geometries fails to build.
    #[arg(long = "AbortOnError", env = "FF_ABORT_ON_ERROR", default_value_t = false)]
    pub abort_on_error: bool,
}

impl Config {
    /// Parses process arguments, accepting single-dash long flags.
    pub fn from_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn net(&self) -> NetConfig {
        NetConfig {
            addr: self.addr(),
            connect_timeout: Duration::from_secs(self.connect_timeout_s),
            idle_timeout: Duration::from_secs(self.idle_timeout_s),
        }
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        if self.abort_on_error {
            ErrorPolicy::AbortBatch
        } else {
            ErrorPolicy::SkipInvalid
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }
}

/// Rewrites `-Host` style flags to `--Host` so the historical spelling keeps
/// working. Short flags (`-h`, `-V`) and values are left alone.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some(s)
                if s.len() > 2
                    && s.starts_with('-')
                    && !s.starts_with("--")
                    && s[1..].starts_with(|c: char| c.is_ascii_uppercase()) =>
            {
                OsString::from(format!("-{s}"))
            }
            _ => arg,
        })
        .collect()
}
