//! Player session: one loaded file, its pads and the controller driving them

use padchop_core::analysis::AnalysisWorker;
use padchop_core::control::{Controller, Notice, PadBank, PlaybackParams};
use padchop_core::{Direction, Source};

use crate::commands::{Command, HELP};

/// Whether the command loop keeps running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    controller: Controller,
    pads: PadBank,
    pad_template: PlaybackParams,
    pad_count: usize,
    analysis: Option<AnalysisWorker>,
    load_id: u64,
}

impl Session {
    pub fn new(
        controller: Controller,
        pad_count: usize,
        pad_template: PlaybackParams,
        analysis: Option<AnalysisWorker>,
    ) -> Self {
        Self {
            controller,
            pads: PadBank::new(),
            pad_template,
            pad_count,
            analysis,
            load_id: 0,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn pads(&self) -> &PadBank {
        &self.pads
    }

    /// Hand `source` to the engine and chop it into the configured pads
    pub fn load(&mut self, source: Source) -> anyhow::Result<()> {
        self.load_id += 1;
        if let Some(worker) = &self.analysis {
            if let Err(e) = worker.submit(self.load_id, source.mono_mix(), source.sample_rate()) {
                log::warn!("Analysis not started: {}", e);
            }
        }

        self.controller.load(source)?;
        let duration = self.controller.duration();
        let assigned = self
            .pads
            .chop_evenly(duration, self.pad_count, self.pad_template);
        println!("{:.2}s loaded, {} pads", duration, assigned);
        Ok(())
    }

    pub fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Play => self.controller.play(),
            Command::Pause => self.controller.pause(),
            Command::Seek(seconds) => self.controller.seek(seconds),
            Command::Pad { pad, reverse } => {
                let Some(slot) = self.pads.get(pad) else {
                    println!("{} is not assigned", pad);
                    return Flow::Continue;
                };
                let mut params = slot.params;
                if reverse {
                    params.direction = match params.direction {
                        Direction::Forward => Direction::Reverse,
                        Direction::Reverse => Direction::Forward,
                    };
                }
                if let Err(e) = self.controller.trigger_pad(pad, slot.cue_seconds, params) {
                    println!("{}", e);
                }
            }
            Command::Release => self.controller.stop_pad(),
            Command::Pitch(semitones) => self.controller.set_global_pitch_offset(semitones),
            Command::Speed(multiplier) => self.controller.set_global_speed(multiplier),
            Command::Gain(gain) => self.controller.set_master_gain(gain),
            Command::Chop(count) => {
                let duration = self.controller.duration();
                let assigned = self.pads.chop_evenly(duration, count, self.pad_template);
                let cues: Vec<String> = self.pads.cues().iter().map(|c| format!("{:.2}", c)).collect();
                println!("{} pads at [{}]", assigned, cues.join(", "));
            }
            Command::Position => println!(
                "{} {:.3}s / {:.3}s{}",
                self.controller.mode(),
                self.controller.position(),
                self.controller.duration(),
                if self.controller.is_playing() { " (playing)" } else { "" }
            ),
            Command::Stats => println!("{:?}", self.controller.stats()),
            Command::Help => println!("{}", HELP),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Poll the controller and the analysis worker
    pub fn poll(&mut self) -> Vec<Notice> {
        let notices = self.controller.tick();
        for notice in &notices {
            match notice {
                Notice::Completed { mode, position } => {
                    println!("{} finished at {:.3}s", mode, position)
                }
                Notice::Released { pad } => println!("{} released", pad),
                Notice::InitFailed(reason) => println!("engine failed: {}", reason),
                Notice::Ready => {}
            }
        }

        if let Some(result) = self.analysis.as_ref().and_then(|w| w.try_recv()) {
            if result.load_id == self.load_id {
                match result.result {
                    Ok(analysis) => println!(
                        "bpm: {}, key: {}",
                        analysis.bpm.map_or("?".to_string(), |b| format!("{:.1}", b)),
                        analysis.key.as_deref().unwrap_or("?")
                    ),
                    Err(e) => log::warn!("Analysis failed: {}", e),
                }
            }
        }
        notices
    }
}
