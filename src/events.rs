use std::path::PathBuf;

use tokio::sync::oneshot;

use crate::config::Viewport;
use crate::error::Result;
use crate::playback::Mode;

/// Requests from the host to the running engine.
#[derive(Debug)]
pub enum EngineCommand {
    ToggleMode,
    SkipToNext,
    SkipTo(usize),
    Resize(Viewport),
    Export(oneshot::Sender<Result<Vec<u8>>>),
    Shutdown,
}

/// Progress and state notifications for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Loaded { count: usize, path: PathBuf },
    Processing { index: usize, total: usize },
    Ready { sessions: usize },
    Switched { index: usize },
    ModeChanged(Mode),
}

/// Periodic decay trigger, stamped with the schedule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayTick {
    pub epoch: u64,
}
