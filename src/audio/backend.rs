//! The seam every audio backend plugs into, and the session lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use super::block::{Block, BlockSink, FaultSlot};
use super::stop::StopSignal;
use crate::error::{HearError, HearResult};

/// Parameters for one capture session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureParams {
    /// Number of input channels, one buffer each per block
    pub channels: u16,
    /// Sample rate in Hz (cpal only; JACK runs at the server rate)
    pub rate: u32,
    /// Frames per block (cpal only; JACK uses the server period)
    pub frames_per_buffer: u32,
    /// JACK client name (JACK only)
    pub client_name: String,
}

impl Default for CaptureParams {
    fn default() -> Self {
        Self {
            channels: 2,
            rate: 44100,
            frames_per_buffer: 1024,
            client_name: "Hear".to_string(),
        }
    }
}

impl CaptureParams {
    pub fn validate(&self) -> HearResult<()> {
        if self.channels == 0 {
            return Err(HearError::InvalidParams("channels must be at least 1".into()));
        }
        if self.rate == 0 {
            return Err(HearError::InvalidParams("rate must be positive".into()));
        }
        if self.frames_per_buffer == 0 {
            return Err(HearError::InvalidParams(
                "frames_per_buffer must be positive".into(),
            ));
        }
        if self.client_name.trim().is_empty() {
            return Err(HearError::InvalidParams("client_name must not be empty".into()));
        }
        Ok(())
    }
}

/// Which backend a session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Professional,
    General,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Professional => "jack",
            BackendKind::General => "cpal",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An audio backend able to open capture sessions.
pub trait Backend {
    type Session: Session;

    fn kind(&self) -> BackendKind;

    /// Acquire the backend's client or stream and wire `sink` as its block handler.
    fn open(&self, params: &CaptureParams, sink: BlockSink) -> HearResult<Self::Session>;
}

/// A live backend handle owned by one `capture` call.
///
/// Implementations must also release the backend on `Drop` so that a panic in
/// the body cannot leak the handle. `close` consumes the session, so release
/// happens once.
pub trait Session {
    /// Make the block handler live.
    fn start(&mut self) -> HearResult<()>;

    /// Stop delivery and release the backend.
    fn close(self) -> HearResult<()>;
}

/// Run one capture session: open, start, `body()`, close.
///
/// The session is closed whatever `body` returns. Errors are reported in the
/// order body, callback, close.
pub fn capture<K, F, B>(
    backend: &K,
    params: &CaptureParams,
    callback: F,
    body: B,
    stop: StopSignal,
) -> HearResult<()>
where
    K: Backend,
    F: FnMut(&Block) -> anyhow::Result<()> + Send + 'static,
    B: FnOnce() -> anyhow::Result<()>,
{
    params.validate()?;

    let fault = FaultSlot::default();
    let sink = BlockSink::new(
        Box::new(callback),
        params.channels as usize,
        params.frames_per_buffer as usize,
        fault.clone(),
        stop,
    );

    info!(
        "Opening {} capture: {} channel(s)",
        backend.kind(),
        params.channels
    );
    let mut session = backend.open(params, sink)?;

    if let Err(e) = session.start() {
        if let Err(close_err) = session.close() {
            warn!("Failed to close {} session: {}", backend.kind(), close_err);
        }
        return Err(e);
    }

    debug!("{} capture running", backend.kind());
    let body_result = body();
    let close_result = session.close();
    info!("{} capture closed", backend.kind());

    if let Err(e) = body_result {
        if let Err(close_err) = close_result {
            warn!("Failed to close {} session: {}", backend.kind(), close_err);
        }
        return Err(HearError::Body(e));
    }

    if let Some(e) = fault.take() {
        if let Err(close_err) = close_result {
            warn!("Failed to close {} session: {}", backend.kind(), close_err);
        }
        return Err(HearError::Callback(e));
    }

    close_result
}
