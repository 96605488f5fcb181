//! The body `hear` runs when the caller does not bring one.

use std::thread;
use std::time::Duration;
use tracing::info;

use crate::audio::stop::{StopReason, StopSignal};

/// How often the default body checks whether capture should end.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Block in `tick` increments until `signal` fires.
///
/// A user interrupt is a normal way to finish, so this always returns `Ok`.
pub fn wait_for_stop(signal: &StopSignal, tick: Duration) -> anyhow::Result<()> {
    while !signal.is_triggered() {
        thread::sleep(tick);
    }

    if signal.reason() == Some(StopReason::Interrupted) {
        println!("\nInterrupted by user");
        info!("Capture interrupted by user");
    }
    Ok(())
}

/// The body `hear` uses when the caller does not supply one.
pub fn default_body(signal: StopSignal) -> impl FnOnce() -> anyhow::Result<()> {
    move || wait_for_stop(&signal, DEFAULT_TICK)
}
