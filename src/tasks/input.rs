//! Line-oriented host controls read from stdin.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Viewport;
use crate::events::EngineCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    Toggle,
    Skip,
    SkipTo(usize),
    Resize { width: u32, height: u32 },
    Export,
    Quit,
}

/// Parse one input line; blank lines and unknown words yield `None`.
pub fn parse_request(line: &str) -> Option<HostRequest> {
    let mut words = line.split_whitespace();
    let head = words.next()?.to_ascii_lowercase();
    let arg = words.next();
    match (head.as_str(), arg) {
        ("toggle" | "t", None) => Some(HostRequest::Toggle),
        ("skip" | "s" | "next", None) => Some(HostRequest::Skip),
        ("skip" | "s", Some(n)) => n.parse().ok().map(HostRequest::SkipTo),
        ("resize", Some(dims)) => {
            let (w, h) = dims.split_once(['x', 'X'])?;
            Some(HostRequest::Resize {
                width: w.parse().ok()?,
                height: h.parse().ok()?,
            })
        }
        ("export" | "e", None) => Some(HostRequest::Export),
        ("quit" | "q" | "exit", None) => Some(HostRequest::Quit),
        _ => None,
    }
}

/// Turn host requests into engine commands, writing exported frames to `export_dir`.
pub async fn forward(
    mut requests: Receiver<HostRequest>,
    to_engine: Sender<EngineCommand>,
    export_dir: PathBuf,
    device_pixel_ratio: f32,
    cancel: CancellationToken,
) -> Result<()> {
    let mut exported = 0usize;
    loop {
        let req = tokio::select! {
            _ = cancel.cancelled() => break,
            req = requests.recv() => match req {
                Some(req) => req,
                None => break,
            },
        };
        let cmd = match req {
            HostRequest::Toggle => EngineCommand::ToggleMode,
            HostRequest::Skip => EngineCommand::SkipToNext,
            HostRequest::SkipTo(i) => EngineCommand::SkipTo(i),
            HostRequest::Resize { width, height } => EngineCommand::Resize(Viewport {
                width,
                height,
                device_pixel_ratio,
            }),
            HostRequest::Quit => EngineCommand::Shutdown,
            HostRequest::Export => {
                let (tx, rx) = oneshot::channel();
                if to_engine.send(EngineCommand::Export(tx)).await.is_err() {
                    break;
                }
                match rx.await {
                    Ok(Ok(bytes)) => {
                        exported += 1;
                        let path = write_frame(&export_dir, exported, &bytes)?;
                        info!(path = %path.display(), bytes = bytes.len(), "frame exported");
                    }
                    Ok(Err(err)) => warn!(%err, "export failed"),
                    Err(_) => break,
                }
                continue;
            }
        };
        let quit = matches!(cmd, EngineCommand::Shutdown);
        if to_engine.send(cmd).await.is_err() || quit {
            break;
        }
    }
    Ok(())
}

fn write_frame(dir: &Path, n: usize, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("frame-{n:04}.png"));
    std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
