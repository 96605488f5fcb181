//! `hear listen`: a peak meter over whatever backend the probe picks.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use super::args::ListenCliArgs;
use crate::audio::Block;
use crate::config::Config;
use crate::dispatch::hear;

/// Peak level of a buffer in dBFS. Silence reports `-inf`.
pub fn peak_dbfs(samples: &[f32]) -> f32 {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    20.0 * peak.log10()
}

/// Tracks the loudest sample per channel between reports.
pub struct LevelMeter {
    peaks: Vec<f32>,
    blocks: usize,
    every: usize,
}

impl LevelMeter {
    pub fn new(channels: usize, every: usize) -> Self {
        Self {
            peaks: vec![f32::NEG_INFINITY; channels],
            blocks: 0,
            every: every.max(1),
        }
    }

    /// Fold a block in. Returns a report line every `every` blocks.
    pub fn push(&mut self, block: &Block) -> Option<String> {
        for (peak, channel) in self.peaks.iter_mut().zip(block.iter()) {
            *peak = peak.max(peak_dbfs(channel));
        }
        self.blocks += 1;

        if self.blocks % self.every != 0 {
            return None;
        }

        let line = self
            .peaks
            .iter()
            .enumerate()
            .map(|(i, db)| format!("ch{} {:>6.1} dBFS", i + 1, db.max(-99.9)))
            .collect::<Vec<_>>()
            .join(" | ");
        self.peaks.fill(f32::NEG_INFINITY);
        Some(line)
    }
}

pub fn handle_listen_command(args: ListenCliArgs, config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let mut params = config.capture;
    args.apply(&mut params);
    info!(
        "Listening on {} channel(s), press Ctrl+C to stop",
        params.channels
    );

    let mut meter = LevelMeter::new(params.channels as usize, args.every);
    hear(
        move |block: &Block| {
            if let Some(line) = meter.push(block) {
                println!("{}", line);
            }
            Ok(())
        },
        &params,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BlockCallback, BlockSink, FaultSlot, StopSignal};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_peak_dbfs() {
        assert_eq!(peak_dbfs(&[0.0, 1.0, -0.5]), 0.0);
        assert!((peak_dbfs(&[0.5]) - -6.0206).abs() < 0.001);
        assert_eq!(peak_dbfs(&[0.0; 8]), f32::NEG_INFINITY);
        assert_eq!(peak_dbfs(&[]), f32::NEG_INFINITY);
    }

    #[test]
    fn test_meter_reports_every_n_blocks() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let lines_clone = lines.clone();
        let mut meter = LevelMeter::new(2, 2);
        let callback: BlockCallback = Box::new(move |block: &Block| {
            if let Some(line) = meter.push(block) {
                lines_clone.lock().unwrap().push(line);
            }
            Ok(())
        });
        let mut sink = BlockSink::new(callback, 2, 4, FaultSlot::default(), StopSignal::default());

        sink.deliver_interleaved(&[1.0, 0.0, 0.5, 0.0]);
        assert!(lines.lock().unwrap().is_empty());
        sink.deliver_interleaved(&[0.25, 0.0, 0.0, 0.0]);

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], "ch1    0.0 dBFS | ch2  -99.9 dBFS");
    }
}
