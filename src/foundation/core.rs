use crate::foundation::error::{StoryreelError, StoryreelResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Absolute 0-based frame index in capture space.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> StoryreelResult<Self> {
        if den == 0 {
            return Err(StoryreelError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(StoryreelError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Convert frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    /// Smallest frame count whose duration covers `secs`.
    pub fn secs_to_frames_ceil(self, secs: f64) -> u64 {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        // Guard against `3.0000000001 * 30` style float noise adding a whole frame.
        let frames = secs * self.as_f64();
        let rounded = frames.round();
        if (frames - rounded).abs() < 1e-9 {
            rounded as u64
        } else {
            frames.ceil() as u64
        }
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Canvas size used for a project aspect ratio.
    pub fn for_aspect(aspect: AspectRatio) -> Self {
        match aspect {
            AspectRatio::Portrait => Self {
                width: 1080,
                height: 1920,
            },
            AspectRatio::Landscape => Self {
                width: 1920,
                height: 1080,
            },
            AspectRatio::Square => Self {
                width: 1080,
                height: 1080,
            },
        }
    }

    /// Center point of the canvas.
    pub fn center(self) -> Point {
        Point::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }
}

/// Project aspect ratio. Selected once per session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AspectRatio {
    /// 16:9, rendered at 1920x1080.
    #[serde(rename = "16:9", alias = "landscape")]
    Landscape,
    /// 9:16, rendered at 1080x1920.
    #[default]
    #[serde(rename = "9:16", alias = "portrait")]
    Portrait,
    /// 1:1, rendered at 1080x1080.
    #[serde(rename = "1:1", alias = "square")]
    Square,
}

/// Format seconds as zero-padded `mm:ss` for status lines.
pub fn format_mm_ss(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
