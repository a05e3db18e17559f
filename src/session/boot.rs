// src/session/boot.rs

//! Startup logo animation, counted in frames.
//!
//! For the first 59 frames the screen stays dark. The logo then fades in
//! and the chime plays once it is fully opaque. After the start timer runs
//! out the logo holds, then fades out over the last 90 frames of the logo
//! timer.

const START_TICKS: u32 = 180;
const LOGO_TICKS: u32 = 120;
const FADE_IN_BELOW: u32 = 120;
const FADE_OUT_BELOW: u32 = 90;
const ALPHA_STEP: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootSequence {
    start_timer: u32,
    logo_timer: u32,
    alpha: u8,
    chimed: bool,
    finished: bool,
}

/// What happened during one frame of the boot sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootTick {
    pub play_chime: bool,
    pub finished: bool,
}

impl Default for BootSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl BootSequence {
    pub fn new() -> Self {
        Self {
            start_timer: START_TICKS,
            logo_timer: LOGO_TICKS,
            alpha: 0,
            chimed: false,
            finished: false,
        }
    }

    /// A sequence that is already over.
    pub fn finished() -> Self {
        Self {
            start_timer: 0,
            logo_timer: 0,
            alpha: 0,
            chimed: true,
            finished: true,
        }
    }

    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn advance(&mut self) -> BootTick {
        let mut tick = BootTick::default();
        if self.finished {
            tick.finished = true;
            return tick;
        }

        if self.start_timer > 0 {
            self.start_timer -= 1;
            if self.start_timer <= FADE_IN_BELOW {
                if self.alpha < u8::MAX {
                    self.alpha = self.alpha.saturating_add(ALPHA_STEP);
                } else if !self.chimed {
                    self.chimed = true;
                    tick.play_chime = true;
                }
            }
        } else if self.logo_timer > 0 {
            self.logo_timer -= 1;
            if self.logo_timer <= FADE_OUT_BELOW {
                self.alpha = self.alpha.saturating_sub(ALPHA_STEP);
            }
        } else {
            self.alpha = self.alpha.saturating_sub(ALPHA_STEP);
            self.finished = self.alpha == 0;
        }

        tick.finished = self.finished;
        tick
    }
}
