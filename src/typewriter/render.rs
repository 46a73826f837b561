//! Render frames and the targets that display them

use std::io;

use crossbeam_channel::Sender;
use thiserror::Error;

/// Glyph shown while the cursor is on
pub const CURSOR_GLYPH: char = '|';

/// Size and colour applied to the rendered text
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    /// Hex RGB, e.g. `#757575`
    pub color: String,
}

impl TextStyle {
    /// Style of the slogan line on the login screen
    pub fn slogan() -> Self {
        Self {
            size: 12.0,
            color: "#3949AB".to_string(),
        }
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 16.0,
            color: "#757575".to_string(),
        }
    }
}

/// Display state owned by the compositor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationSnapshot {
    pub sentence_index: usize,
    pub displayed_prefix: String,
    pub cursor_on: bool,
}

impl Default for AnimationSnapshot {
    fn default() -> Self {
        Self {
            sentence_index: 0,
            displayed_prefix: String::new(),
            cursor_on: true,
        }
    }
}

/// One rendered state of an animated text view
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub snapshot: AnimationSnapshot,
    pub style: TextStyle,
}

impl Frame {
    /// Prefix followed by the cursor glyph, or a blank when the cursor is off
    pub fn text(&self) -> String {
        let mut text = self.snapshot.displayed_prefix.clone();
        text.push(if self.snapshot.cursor_on { CURSOR_GLYPH } else { ' ' });
        text
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    /// The receiving view is gone; no further frames can be shown
    #[error("render target closed")]
    Closed,

    #[error("render failed: {0}")]
    Io(#[from] io::Error),
}

/// Receiver of composed frames
pub trait RenderTarget: Send + 'static {
    fn render(&mut self, frame: &Frame) -> Result<(), RenderError>;
}

impl<F> RenderTarget for F
where
    F: FnMut(&Frame) -> Result<(), RenderError> + Send + 'static,
{
    fn render(&mut self, frame: &Frame) -> Result<(), RenderError> {
        self(frame)
    }
}

/// Forwards frames to the UI thread, which applies them to its widgets
pub struct ChannelTarget {
    tx: Sender<Frame>,
}

impl ChannelTarget {
    pub fn new(tx: Sender<Frame>) -> Self {
        Self { tx }
    }
}

impl RenderTarget for ChannelTarget {
    fn render(&mut self, frame: &Frame) -> Result<(), RenderError> {
        self.tx.send(frame.clone()).map_err(|_| RenderError::Closed)
    }
}
