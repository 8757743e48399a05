use crate::foundation::color::Color;
use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Base subtitle font size in pixels before the style's size scale is applied.
pub const BASE_FONT_PX: f32 = 85.0;

/// Vertical placement used when the configured position is zero.
const FALLBACK_VERTICAL_FRACTION: f64 = 0.85;

/// Animation applied to the active subtitle word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleAnimation {
    /// Static render.
    None,
    /// Sinusoidal scale oscillation.
    #[default]
    Pop,
    /// Static full-opacity render.
    Fade,
    /// Sinusoidal vertical displacement.
    Bounce,
    /// Words after the active one are hidden instead of dimmed.
    Typewriter,
    /// Soft blurred halo in the active color.
    Glow,
}

/// Subtitle styling snapshot. Passed by reference into every render; never mutated mid-render.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SubtitleStyle {
    /// Draw subtitles at all.
    pub visible: bool,
    /// Font family name (informational; glyphs come from the loaded font file).
    pub font_family: String,
    /// Scale applied to [`BASE_FONT_PX`].
    pub font_size: f32,
    /// Color of inactive words.
    pub text_color: Color,
    /// Color of the active word.
    pub active_text_color: Color,
    /// Outline color.
    pub outline_color: Color,
    /// Outline width in pixels.
    pub stroke_width: f32,
    /// Background box color.
    pub background_color: Color,
    /// Background box opacity; `0` disables the box.
    pub background_opacity: f32,
    /// Vertical text center as a percentage (0..=100) of canvas height.
    pub vertical_position: f32,
    /// Show words after the active one (dimmed). When `false` they are hidden.
    pub show_future_text: bool,
    /// Active-word animation.
    pub animation: SubtitleAnimation,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            visible: true,
            font_family: "Roboto".to_owned(),
            font_size: 1.0,
            text_color: Color::WHITE,
            active_text_color: Color::rgb(0xFB, 0xBF, 0x24),
            outline_color: Color::BLACK,
            stroke_width: 4.0,
            background_color: Color::BLACK,
            background_opacity: 0.0,
            vertical_position: 85.0,
            show_future_text: true,
            animation: SubtitleAnimation::Pop,
        }
    }
}

impl SubtitleStyle {
    /// Validate numeric ranges.
    pub fn validate(&self) -> StoryreelResult<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(StoryreelError::validation(
                "subtitle font_size must be finite and > 0",
            ));
        }
        if !self.stroke_width.is_finite() || self.stroke_width < 0.0 {
            return Err(StoryreelError::validation(
                "subtitle stroke_width must be finite and >= 0",
            ));
        }
        if !(0.0..=100.0).contains(&self.vertical_position) {
            return Err(StoryreelError::validation(
                "subtitle vertical_position must be within 0..=100",
            ));
        }
        if !(0.0..=1.0).contains(&self.background_opacity) {
            return Err(StoryreelError::validation(
                "subtitle background_opacity must be within 0..=1",
            ));
        }
        Ok(())
    }

    /// Font size in pixels at base resolution.
    pub fn font_px(&self) -> f32 {
        BASE_FONT_PX * self.font_size
    }

    /// Vertical text center as a fraction of canvas height.
    pub fn vertical_fraction(&self) -> f64 {
        let f = f64::from(self.vertical_position) / 100.0;
        if f > 0.0 { f } else { FALLBACK_VERTICAL_FRACTION }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/style.rs"]
mod tests;
