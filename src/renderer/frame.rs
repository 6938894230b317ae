// Frame state machine
//
// Idle -> Recording (begin) -> Idle (end). The slot index cycles through
// the frames in flight and only moves once a frame has been handed off.

use crate::error::{RenderError, RenderResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    /// Recording into the current slot's command buffer for this image
    Recording { image_index: u32 },
}

#[derive(Debug)]
pub struct FrameState {
    phase: FramePhase,
    slot: usize,
    slot_count: usize,
}

impl FrameState {
    pub fn new(slot_count: usize) -> Self {
        Self {
            phase: FramePhase::Idle,
            slot: 0,
            slot_count: slot_count.max(1),
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.phase, FramePhase::Recording { .. })
    }

    /// Image acquired for the frame being recorded
    pub fn image_index(&self) -> Option<u32> {
        match self.phase {
            FramePhase::Recording { image_index } => Some(image_index),
            FramePhase::Idle => None,
        }
    }

    pub fn begin(&mut self, image_index: u32) -> RenderResult<()> {
        if self.is_recording() {
            return Err(RenderError::PreconditionViolation(
                "a frame is already being recorded",
            ));
        }
        self.phase = FramePhase::Recording { image_index };
        Ok(())
    }

    /// Leave Recording and hand back the image index. The slot stays put
    /// until `advance`.
    pub fn end(&mut self) -> RenderResult<u32> {
        let image_index = self.image_index().ok_or(RenderError::PreconditionViolation(
            "end_frame called without a recording frame",
        ))?;
        self.phase = FramePhase::Idle;
        Ok(image_index)
    }

    pub fn advance(&mut self) {
        self.slot = (self.slot + 1) % self.slot_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_cycle_modulo_count() {
        let mut state = FrameState::new(3);
        let mut seen = Vec::new();
        for image in 0..7 {
            seen.push(state.slot());
            state.begin(image).unwrap();
            state.end().unwrap();
            state.advance();
        }
        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn double_begin_is_rejected() {
        let mut state = FrameState::new(2);
        state.begin(1).unwrap();
        assert!(matches!(
            state.begin(0),
            Err(RenderError::PreconditionViolation(_))
        ));
        // The first frame is untouched
        assert_eq!(state.image_index(), Some(1));
    }

    #[test]
    fn end_requires_recording() {
        let mut state = FrameState::new(2);
        assert!(state.end().is_err());
        state.begin(0).unwrap();
        assert_eq!(state.end().unwrap(), 0);
        assert_eq!(state.phase(), FramePhase::Idle);
        assert_eq!(state.slot(), 0);
    }

    #[test]
    fn zero_slots_means_one() {
        let mut state = FrameState::new(0);
        state.advance();
        assert_eq!(state.slot(), 0);
        assert_eq!(state.slot_count(), 1);
    }
}
