//! Wire-level request model and the hard input limits applied before any
//! renderer work.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::lines::segment_text;
pub use super::lines::MAX_LINE_CHARS;

pub const DEFAULT_STYLE: u32 = 9;
pub const DEFAULT_BIAS: f64 = 0.75;
pub const DEFAULT_LINE_SPACING: f64 = 0.75;
pub const DEFAULT_FONT_SIZE: f64 = 1.0;
/// Total input budget; the line cap below is its ceiling division by the
/// per-line budget.
pub const MAX_TEXT_CHARS: usize = 500;
pub const MAX_LINES: usize = MAX_TEXT_CHARS.div_ceil(MAX_LINE_CHARS);

/// Horizontal placement of rendered lines on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// How the finished artifact is returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// The SVG is the response body; the spool entry is removed once the
    /// body has been fully sent (or the client goes away).
    #[default]
    Stream,
    /// The SVG is read back and embedded in a JSON object; the spool entry
    /// is removed before the response is built.
    Inline,
}

/// A handwriting generation request as received on the wire.
///
/// Every field except `text` is optional and takes the documented default.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub text: String,
    /// Index into the renderer's pretrained style set.
    #[serde(default = "default_style")]
    pub style: u32,
    /// Legibility/variability trade-off, in `(0, 1]`.
    #[serde(default = "default_bias")]
    pub bias: f64,
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f64,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub text_align: TextAlign,
    /// When absent, the server-configured default mode applies.
    #[serde(default)]
    pub delivery: Option<DeliveryMode>,
}

fn default_style() -> u32 {
    DEFAULT_STYLE
}

fn default_bias() -> f64 {
    DEFAULT_BIAS
}

fn default_line_spacing() -> f64 {
    DEFAULT_LINE_SPACING
}

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

/// Hard input limits. All three are configurable; the defaults reproduce the
/// deployed values (500 characters, 75 per line, 7 lines).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_text_chars: NonZeroUsize,
    pub max_line_chars: NonZeroUsize,
    pub max_lines: NonZeroUsize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_text_chars: const { NonZeroUsize::new(MAX_TEXT_CHARS).unwrap() },
            max_line_chars: const { NonZeroUsize::new(MAX_LINE_CHARS).unwrap() },
            max_lines: const { NonZeroUsize::new(MAX_LINES).unwrap() },
        }
    }
}

impl GenerateRequest {
    /// Apply the validation rules in order and return the segmented lines.
    ///
    /// Rule order is part of the contract: required text, then the total
    /// character cap (counted on the raw text, as received), then numeric
    /// ranges, then the post-segmentation line cap. The first failing rule
    /// wins and nothing downstream runs.
    pub fn validated(&self, limits: &Limits) -> Result<Vec<String>, DomainError> {
        if self.text.trim().is_empty() {
            return Err(DomainError::validation("Text is required"));
        }

        let total_chars = self.text.chars().count();
        if total_chars > limits.max_text_chars.get() {
            return Err(DomainError::validation(format!(
                "Text is too long: {total_chars} characters (limit {})",
                limits.max_text_chars
            )));
        }

        if !(self.bias > 0.0 && self.bias <= 1.0) {
            return Err(DomainError::invalid_field("bias", "must be within (0, 1]"));
        }
        if !(self.line_spacing > 0.0) {
            return Err(DomainError::invalid_field(
                "line_spacing",
                "must be greater than zero",
            ));
        }
        if !(self.font_size > 0.0) {
            return Err(DomainError::invalid_field(
                "font_size",
                "must be greater than zero",
            ));
        }

        let lines = segment_text(&self.text, limits.max_line_chars);
        if lines.len() > limits.max_lines.get() {
            return Err(DomainError::validation(format!(
                "Text wraps to {} lines (limit {})",
                lines.len(),
                limits.max_lines
            )));
        }

        Ok(lines)
    }
}
