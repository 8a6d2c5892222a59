//! armwatchd - robotic-arm activity monitor daemon.
//!
//! This daemon:
//! 1. Ingests frames from the configured source (camera, HTTP publisher, or
//!    a synthetic bench scene)
//! 2. Runs tiled detection through the selected backend
//! 3. Tracks identities and classifies per-arm activity states
//! 4. Serves the annotated feed as an MJPEG stream to any number of viewers
//!
//! Terminates on a fatal frame-source failure or ctrl-c. No state survives
//! a restart; track identities reset on every run.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use armwatch::config::MonitorConfig;
use armwatch::detect::{BackendRegistry, TiledDetector};
use armwatch::ingest::CaptureSource;
use armwatch::pipeline::Pipeline;
use armwatch::stream::{FrameHub, StreamEncoder, StreamServer};
use armwatch::track::Tracker;

#[derive(Parser, Debug)]
#[command(
    name = "armwatchd",
    about = "Robotic-arm activity monitor with a live MJPEG restream"
)]
struct Args {
    /// JSON config file (falls back to the ARMWATCH_CONFIG env var).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame source url: stub://, v4l2://, /dev/video*, or http(s)://.
    #[arg(long)]
    source: Option<String>,

    /// Bind address for the viewer HTTP server, host:port.
    #[arg(long)]
    listen: Option<String>,

    /// Detector backend name.
    #[arg(long)]
    backend: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = MonitorConfig::load(args.config.as_deref())?;
    if let Some(source) = args.source {
        cfg.source.url = source;
    }
    if let Some(listen) = args.listen {
        cfg.listen_addr = listen;
    }
    if let Some(backend) = args.backend {
        cfg.backend = backend;
    }
    cfg.validate()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || {
            log::info!("shutdown requested");
            flag.store(true, Ordering::SeqCst);
        })
        .context("install shutdown handler")?;
    }

    let registry = BackendRegistry::with_defaults();
    let mut backend = registry.build(&cfg.backend)?;
    backend.warm_up()?;
    log::info!(
        "detector backend={} tiles={}x{} overlap={} conf>={}",
        backend.name(),
        cfg.tiling.tile_width,
        cfg.tiling.tile_height,
        cfg.tiling.overlap_ratio,
        cfg.tiling.confidence_threshold
    );
    let detector = TiledDetector::new(backend, cfg.tiling.clone());

    let hub = Arc::new(FrameHub::new());
    let handle = StreamServer::new(cfg.listen_addr.clone(), hub.clone()).spawn(shutdown.clone())?;
    log::info!("live view on http://{}/", handle.addr);

    let mut source = CaptureSource::open(cfg.source.clone())?;
    source.connect()?;

    let tracker = Tracker::new(cfg.tracking.clone());
    let encoder = StreamEncoder::new(cfg.encoder.clone())?;
    let mut pipeline = Pipeline::new(detector, tracker, encoder, hub);

    let run_result = pipeline.run(&mut source, cfg.source.target_fps, &shutdown);
    shutdown.store(true, Ordering::SeqCst);
    handle.stop()?;

    match run_result {
        Ok(()) => {
            log::info!(
                "armwatchd stopped: {} frames processed, {} published",
                pipeline.frames_processed(),
                pipeline.frames_published()
            );
            Ok(())
        }
        Err(err) => {
            log::error!("pipeline terminated: {:#}", err);
            Err(err)
        }
    }
}
