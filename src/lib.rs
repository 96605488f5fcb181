//! Capture multi-channel audio from JACK when a server is running, or from
//! the default input device through cpal otherwise.
//!
//! Either way the callback receives a [`Block`]: one `f32` buffer per channel.
//!
//! ```no_run
//! use hear::{hear, Block, CaptureParams};
//!
//! hear(
//!     |block: &Block| {
//!         println!("{} frames on {} channels", block.frames(), block.len());
//!         Ok(())
//!     },
//!     &CaptureParams::default(),
//! )?;
//! # Ok::<(), hear::HearError>(())
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod global;

pub use audio::{Block, BackendKind, CaptureParams};
pub use dispatch::{hear, hear_with};
pub use error::{HearError, HearResult};
