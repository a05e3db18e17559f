// src/present/mod.rs

//! Presentation ports.
//!
//! The session never draws, plays, or polls anything itself. It hands a
//! [`Frame`] to a [`RenderSink`], a sound to an [`AudioSink`], and asks an
//! [`InputSource`] for whatever happened since the last frame.

use crate::present::assets::SoundHandle;

pub mod assets;
pub mod frame;
pub mod terminal;

pub use frame::{Drawable, Frame, Rect, Sprite};

/// Discrete operator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    Up,
    Down,
    Left,
    Right,
    Confirm,
    Cancel,
    Quit,
}

pub trait RenderSink: Send {
    fn present(&mut self, frame: &Frame);
}

/// Fire-and-forget playback.
pub trait AudioSink: Send {
    fn play(&mut self, sound: &SoundHandle);
}

pub trait InputSource: Send {
    /// Events since the previous call, oldest first.
    fn poll(&mut self) -> Vec<InputEvent>;
}
