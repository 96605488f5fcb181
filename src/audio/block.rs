//! Channel-separated audio blocks and the sink that fills them.
//!
//! JACK hands us one planar buffer per port while cpal hands us a single
//! interleaved buffer. Both are funneled through [`BlockSink`] so the user
//! callback always sees one `Vec<f32>` per channel.

use std::sync::{Arc, Mutex};
use tracing::error;

use super::stop::{StopReason, StopSignal};

/// One captured block: `channels` buffers of `frames` samples each.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    channels: Vec<Vec<f32>>,
    frames: usize,
}

impl Block {
    /// Empty block with room for `frames` samples per channel.
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            channels: (0..channels).map(|_| Vec::with_capacity(frames)).collect(),
            frames: 0,
        }
    }

    /// Number of channel buffers. Always the channel count the session opened with.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Samples per channel in this block.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// Fill from one buffer per channel, in channel order.
    fn fill_planar<'a>(&mut self, buffers: impl IntoIterator<Item = &'a [f32]>) {
        let mut frames = 0;
        for (channel, buffer) in self.channels.iter_mut().zip(buffers) {
            channel.clear();
            channel.extend_from_slice(buffer);
            frames = buffer.len();
        }
        self.frames = frames;
    }

    /// Fill from a row-major `(frames, channels)` interleaved buffer.
    fn fill_interleaved(&mut self, data: &[f32]) {
        self.frames = deinterleave(data, &mut self.channels);
    }
}

impl std::ops::Index<usize> for Block {
    type Output = [f32];

    fn index(&self, index: usize) -> &[f32] {
        self.channel(index)
    }
}

/// Split an interleaved buffer into one column per entry of `out`.
///
/// Returns the number of frames written. Samples past the last whole frame are dropped.
pub fn deinterleave(data: &[f32], out: &mut [Vec<f32>]) -> usize {
    let channels = out.len();
    if channels == 0 {
        return 0;
    }

    let frames = data.len() / channels;
    for (c, column) in out.iter_mut().enumerate() {
        column.clear();
        column.extend(data.chunks_exact(channels).map(|frame| frame[c]));
    }

    frames
}

/// Interleave per-channel buffers back into one row-major buffer.
///
/// The inverse of [`deinterleave`]. All buffers must have the same length.
pub fn interleave(channels: &[Vec<f32>]) -> Vec<f32> {
    let frames = channels.first().map_or(0, Vec::len);
    let mut data = Vec::with_capacity(frames * channels.len());
    for frame in 0..frames {
        data.extend(channels.iter().map(|channel| channel[frame]));
    }
    data
}

/// Boxed user callback invoked once per block.
pub type BlockCallback = Box<dyn FnMut(&Block) -> anyhow::Result<()> + Send>;

/// First error raised by the user callback during a session.
#[derive(Clone, Default)]
pub struct FaultSlot {
    inner: Arc<Mutex<Option<anyhow::Error>>>,
}

impl FaultSlot {
    fn record(&self, err: anyhow::Error) {
        let mut slot = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    pub fn take(&self) -> Option<anyhow::Error> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

/// Normalized "next block ready" handler shared by every backend.
///
/// Owns the user callback and a reusable [`Block`]. Once the callback fails the
/// sink stops delivering, records the error and raises the session's stop signal.
pub struct BlockSink {
    callback: BlockCallback,
    block: Block,
    fault: FaultSlot,
    stop: StopSignal,
    failed: bool,
}

impl BlockSink {
    pub fn new(
        callback: BlockCallback,
        channels: usize,
        frames_hint: usize,
        fault: FaultSlot,
        stop: StopSignal,
    ) -> Self {
        Self {
            callback,
            block: Block::new(channels, frames_hint),
            fault,
            stop,
            failed: false,
        }
    }

    pub fn channels(&self) -> usize {
        self.block.len()
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Deliver a block given as one buffer per channel (JACK ports).
    pub fn deliver_planar<'a>(&mut self, buffers: impl IntoIterator<Item = &'a [f32]>) -> bool {
        if self.failed {
            return false;
        }
        self.block.fill_planar(buffers);
        self.dispatch()
    }

    /// Deliver a block given as one interleaved buffer (cpal streams).
    pub fn deliver_interleaved(&mut self, data: &[f32]) -> bool {
        if self.failed {
            return false;
        }
        self.block.fill_interleaved(data);
        self.dispatch()
    }

    fn dispatch(&mut self) -> bool {
        match (self.callback)(&self.block) {
            Ok(()) => true,
            Err(e) => {
                error!("Capture callback failed: {:#}", e);
                self.failed = true;
                self.fault.record(e);
                self.stop.trigger(StopReason::CallbackFailed);
                false
            }
        }
    }
}
