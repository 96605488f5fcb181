//! Stop signalling between backend callbacks, Ctrl+C and the capture body.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::warn;

use crate::error::{HearError, HearResult};

/// Why a capture session was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    CallbackFailed,
}

impl StopReason {
    fn as_u8(self) -> u8 {
        match self {
            StopReason::Interrupted => 1,
            StopReason::CallbackFailed => 2,
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(StopReason::Interrupted),
            2 => Some(StopReason::CallbackFailed),
            _ => None,
        }
    }
}

/// Shared "stop capturing" flag. The first reason to arrive wins.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    triggered: Arc<AtomicBool>,
    reason: Arc<AtomicU8>,
}

impl StopSignal {
    pub fn trigger(&self, reason: StopReason) {
        let _ = self
            .reason
            .compare_exchange(0, reason.as_u8(), Ordering::AcqRel, Ordering::Acquire);
        self.triggered.store(true, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    pub fn reason(&self) -> Option<StopReason> {
        StopReason::from_u8(self.reason.load(Ordering::Acquire))
    }

    pub fn reset(&self) {
        self.reason.store(0, Ordering::Release);
        self.triggered.store(false, Ordering::Release);
    }
}

/// Process-wide signal raised by Ctrl+C.
///
/// The handler is installed on first use. Installing it means Ctrl+C no longer
/// terminates the process on its own; `hear` returns instead. Only one handler
/// can exist per process, so this fails if the host application already set
/// its own, and keeps failing on later calls.
pub fn interrupt_signal() -> HearResult<StopSignal> {
    static SIGNAL: OnceLock<Result<StopSignal, String>> = OnceLock::new();

    SIGNAL
        .get_or_init(|| {
            install_interrupt(|signal| {
                ctrlc::set_handler(move || signal.trigger(StopReason::Interrupted))
            })
        })
        .clone()
        .map_err(HearError::Interrupt)
}

fn install_interrupt<I>(install: I) -> Result<StopSignal, String>
where
    I: FnOnce(StopSignal) -> Result<(), ctrlc::Error>,
{
    let signal = StopSignal::default();
    match install(signal.clone()) {
        Ok(()) => Ok(signal),
        Err(e) => {
            warn!("Could not install Ctrl+C handler: {}", e);
            Err(e.to_string())
        }
    }
}
