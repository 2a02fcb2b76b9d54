//! Pad bank: cue points chopped out of the loaded recording

use serde::{Deserialize, Serialize};

use super::params::PlaybackParams;
use crate::types::{PadId, NUM_PADS};

/// One pad slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    /// Source position the pad starts playing from
    pub cue_seconds: f64,
    pub params: PlaybackParams,
}

/// Fixed set of [`NUM_PADS`] pad slots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PadBank {
    slots: [Option<Pad>; NUM_PADS],
}

impl PadBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pad: PadId) -> Option<&Pad> {
        self.slots.get(pad.index()).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, pad: PadId) -> Option<&mut Pad> {
        self.slots.get_mut(pad.index()).and_then(|slot| slot.as_mut())
    }

    pub fn set(&mut self, pad: PadId, value: Pad) {
        if let Some(slot) = self.slots.get_mut(pad.index()) {
            *slot = Some(value);
        }
    }

    pub fn clear(&mut self) {
        self.slots = [None; NUM_PADS];
    }

    /// Number of assigned pads
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assigned pads in slot order
    pub fn iter(&self) -> impl Iterator<Item = (PadId, &Pad)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|pad| (PadId(i as u8), pad)))
    }

    /// Cue points of assigned pads in slot order
    pub fn cues(&self) -> Vec<f64> {
        self.iter().map(|(_, pad)| pad.cue_seconds).collect()
    }

    /// Replace the bank with `count` pads spaced evenly across `duration`
    ///
    /// Pad `i` cues at `i * duration / count`. `count` is capped at
    /// [`NUM_PADS`]. Returns the number of pads assigned.
    pub fn chop_evenly(&mut self, duration: f64, count: usize, template: PlaybackParams) -> usize {
        self.clear();
        let count = count.min(NUM_PADS);
        if count == 0 || !(duration > 0.0) {
            return 0;
        }
        let step = duration / count as f64;
        for (i, slot) in self.slots.iter_mut().take(count).enumerate() {
            *slot = Some(Pad {
                cue_seconds: i as f64 * step,
                params: template,
            });
        }
        count
    }

    /// Replace the bank with pads at the given cue points
    ///
    /// Non-finite and negative cues are skipped; at most [`NUM_PADS`] are
    /// kept. Returns the number of pads assigned.
    pub fn chop_at(&mut self, cues: &[f64], template: PlaybackParams) -> usize {
        self.clear();
        let valid = cues.iter().copied().filter(|c| c.is_finite() && *c >= 0.0);
        let mut assigned = 0;
        for (slot, cue) in self.slots.iter_mut().zip(valid) {
            *slot = Some(Pad {
                cue_seconds: cue,
                params: template,
            });
            assigned += 1;
        }
        assigned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chop_evenly() {
        let mut bank = PadBank::new();
        assert_eq!(bank.chop_evenly(8.0, 4, PlaybackParams::default()), 4);
        assert_eq!(bank.cues(), vec![0.0, 2.0, 4.0, 6.0]);
        assert!(bank.get(PadId(4)).is_none());
    }

    #[test]
    fn test_chop_evenly_caps_count() {
        let mut bank = PadBank::new();
        assert_eq!(bank.chop_evenly(10.0, 40, PlaybackParams::default()), NUM_PADS);
        assert_eq!(bank.len(), NUM_PADS);
        assert_eq!(bank.chop_evenly(0.0, 4, PlaybackParams::default()), 0);
        assert!(bank.is_empty());
    }

    #[test]
    fn test_chop_at_skips_invalid_cues() {
        let mut bank = PadBank::new();
        let template = PlaybackParams::default().reversed();
        assert_eq!(bank.chop_at(&[1.0, -2.0, f64::NAN, 3.5], template), 2);
        let pad = bank.get(PadId(1)).unwrap();
        assert_eq!(pad.cue_seconds, 3.5);
        assert!(pad.params.is_reverse());
    }

    #[test]
    fn test_set_and_edit() {
        let mut bank = PadBank::new();
        bank.set(
            PadId(7),
            Pad {
                cue_seconds: 1.25,
                params: PlaybackParams::default(),
            },
        );
        bank.get_mut(PadId(7)).unwrap().params.volume = 0.5;
        assert_eq!(bank.get(PadId(7)).unwrap().params.volume, 0.5);
        let ids: Vec<PadId> = bank.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![PadId(7)]);
    }
}
