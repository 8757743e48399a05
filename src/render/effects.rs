use crate::foundation::core::{Affine, Canvas, Vec2};
use crate::foundation::math::{clamp01, lerp};
use crate::scene::model::VisualEffect;

/// Maximum pan/tilt travel in canvas pixels.
pub const MAX_TRAVEL_PX: f64 = 150.0;

/// Scale and offset of a scene image at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    /// Uniform scale about the canvas center.
    pub scale: f64,
    /// Offset applied after scaling, in canvas pixels.
    pub offset: Vec2,
}

impl CameraPose {
    /// Untransformed pose.
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        offset: Vec2::ZERO,
    };

    /// Pose of `effect` at normalized progress `p` (clamped to `[0, 1]`).
    pub fn at(effect: VisualEffect, p: f64) -> Self {
        let p = clamp01(p);
        let scale = |from: f64, to: f64| Self {
            scale: lerp(from, to, p),
            offset: Vec2::ZERO,
        };
        let shift = |dx: f64, dy: f64| Self {
            scale: 1.0,
            offset: Vec2::new(dx * p, dy * p),
        };
        match effect {
            VisualEffect::Static => Self::IDENTITY,
            VisualEffect::ZoomIn => scale(1.0, 1.15),
            VisualEffect::ZoomOut => scale(1.15, 1.0),
            VisualEffect::DollyIn => scale(1.0, 1.4),
            VisualEffect::DollyOut => scale(1.4, 1.0),
            VisualEffect::PanLeft => shift(-MAX_TRAVEL_PX, 0.0),
            VisualEffect::PanRight => shift(MAX_TRAVEL_PX, 0.0),
            VisualEffect::TiltUp => shift(0.0, -MAX_TRAVEL_PX),
            VisualEffect::TiltDown => shift(0.0, MAX_TRAVEL_PX),
        }
    }

    /// Transform mapping an `image_w x image_h` image onto the canvas under this pose.
    ///
    /// The image is stretched to fill the canvas, scaled about the canvas center, then offset.
    pub fn image_transform(self, canvas: Canvas, image_w: u32, image_h: u32) -> Affine {
        let fit = Affine::scale_non_uniform(
            f64::from(canvas.width) / f64::from(image_w.max(1)),
            f64::from(canvas.height) / f64::from(image_h.max(1)),
        );
        Affine::translate(self.offset) * Affine::scale_about(self.scale, canvas.center()) * fit
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/effects.rs"]
mod tests;
