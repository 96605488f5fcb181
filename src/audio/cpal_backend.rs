//! Capture through cpal's default host and default input device.
//!
//! cpal pushes one interleaved buffer per callback. The sink splits it into
//! per-channel columns before the user callback sees it.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, info, warn};

use super::backend::{capture, Backend, BackendKind, CaptureParams, Session};
use super::block::{Block, BlockSink};
use super::quiet::{quietly, Streams};
use super::stop::StopSignal;
use crate::error::{HearError, HearResult};

/// cpal's default host (ALSA, CoreAudio, WASAPI, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalBackend;

pub struct CpalSession {
    stream: Option<cpal::Stream>,
    device_name: String,
}

impl Backend for CpalBackend {
    type Session = CpalSession;

    fn kind(&self) -> BackendKind {
        BackendKind::General
    }

    fn open(&self, params: &CaptureParams, mut sink: BlockSink) -> HearResult<CpalSession> {
        let (host, device) = quietly(Streams::Both, || {
            let host = cpal::default_host();
            let device = host.default_input_device();
            (host, device)
        });
        let device = device.ok_or(HearError::NoInputDevice)?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        info!(
            "Capturing from '{}' via {}: {} channel(s), {}Hz, {} frames per buffer",
            device_name,
            host.id().name(),
            params.channels,
            params.rate,
            params.frames_per_buffer
        );

        let config = cpal::StreamConfig {
            channels: params.channels,
            sample_rate: cpal::SampleRate(params.rate),
            buffer_size: cpal::BufferSize::Fixed(params.frames_per_buffer),
        };

        let err_fn = |err| error!("Audio stream error: {}", err);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    sink.deliver_interleaved(data);
                },
                err_fn,
                None,
            )
            .map_err(|e| HearError::stream("Failed to open input stream", e))?;

        Ok(CpalSession {
            stream: Some(stream),
            device_name,
        })
    }
}

impl Session for CpalSession {
    fn start(&mut self) -> HearResult<()> {
        if let Some(stream) = &self.stream {
            stream
                .play()
                .map_err(|e| HearError::stream("Failed to start input stream", e))?;
            debug!("Input stream on '{}' started", self.device_name);
        }
        Ok(())
    }

    fn close(mut self) -> HearResult<()> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };

        let paused = stream.pause();
        drop(stream);
        debug!("Input stream on '{}' closed", self.device_name);

        paused.map_err(|e| HearError::stream("Failed to stop input stream", e))
    }
}

impl Drop for CpalSession {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!("Dropping open CpalSession, cleaning up");
            if let Err(e) = stream.pause() {
                warn!("Failed to stop input stream: {}", e);
            }
        }
    }
}

/// Capture from cpal's default input device, running `body` for the duration.
pub fn hear_general<F, B>(
    callback: F,
    channels: u16,
    body: B,
    rate: u32,
    frames_per_buffer: u32,
) -> HearResult<()>
where
    F: FnMut(&Block) -> anyhow::Result<()> + Send + 'static,
    B: FnOnce() -> anyhow::Result<()>,
{
    let params = CaptureParams {
        channels,
        rate,
        frames_per_buffer,
        ..Default::default()
    };
    capture(&CpalBackend, &params, callback, body, StopSignal::default())
}
