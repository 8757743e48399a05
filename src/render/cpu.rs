use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vello_cpu::kurbo::Shape as _;

use crate::audio::timeline::Timeline;
use crate::foundation::color::Color;
use crate::foundation::core::{Affine, Canvas};
use crate::foundation::error::StoryreelResult;
use crate::render::blur::{blur_rgba8_premul_q16, gaussian_kernel_q16};
use crate::render::effects::CameraPose;
use crate::render::frame::FrameRGBA;
use crate::render::images::{ImagePaint, ImageStore, paint_from_pixmap, pixmap_from_premul_bytes};
use crate::render::subtitles::{GLOW_BLUR_PX, WordCue, plan_subtitles};
use crate::render::text::{ShapedText, TextLayoutEngine, resolve_font};
use crate::scene::model::{MediaType, Project, Scene, SceneId};
use crate::scene::style::SubtitleStyle;

/// Watermark width as a fraction of the canvas width.
pub const WATERMARK_WIDTH_FRACTION: f64 = 0.18;
/// Watermark opacity.
pub const WATERMARK_OPACITY: f32 = 0.85;
/// Watermark inset from the top-right corner as a fraction of the canvas width.
pub const WATERMARK_MARGIN_FRACTION: f64 = 0.03;

/// Options for [`RenderEngine::new`].
#[derive(Clone, Debug)]
pub struct RenderOpts {
    /// Font file for subtitles. When unset, an installed face for the style's family is used.
    pub font_path: Option<PathBuf>,
    /// Color behind the scene image (and of frames with no usable image).
    pub background: Color,
    /// Output size override. Defaults to the project's aspect-ratio canvas.
    pub canvas: Option<Canvas>,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            font_path: None,
            background: Color::BLACK,
            canvas: None,
        }
    }
}

/// Composites one frame for a timeline position.
///
/// Scenes, timeline and style are snapshots taken at construction; [`RenderEngine::set_style`]
/// swaps the style between frames. Missing or undecodable visuals render as the background
/// color and are reported once per scene; rendering itself never fails.
pub struct RenderEngine {
    canvas: Canvas,
    scenes: Arc<[Scene]>,
    timeline: Arc<Timeline>,
    style: SubtitleStyle,
    watermark: Option<String>,
    background: Color,
    images: ImageStore,
    text: Option<TextLayoutEngine>,
    font_path: Option<PathBuf>,
    font_warned: bool,
    warned_scenes: HashSet<SceneId>,
    ctx: Option<vello_cpu::RenderContext>,
    glow_kernel: Option<Arc<Vec<u32>>>,
    blur_scratch: Vec<u8>,
}

impl RenderEngine {
    /// Build an engine for `project`, resolving visuals relative to `root`.
    pub fn new(project: &Project, root: &Path, timeline: Arc<Timeline>, opts: RenderOpts) -> Self {
        let canvas = opts
            .canvas
            .filter(|c| c.width > 0 && c.height > 0)
            .filter(|c| {
                let fits = u16::try_from(c.width).is_ok() && u16::try_from(c.height).is_ok();
                if !fits {
                    tracing::warn!(
                        width = c.width,
                        height = c.height,
                        "canvas override exceeds the raster limit, using the project canvas"
                    );
                }
                fits
            })
            .unwrap_or_else(|| project.canvas());
        Self {
            canvas,
            scenes: project.scene_snapshot(),
            timeline,
            style: project.subtitles.clone(),
            watermark: project.watermark.clone(),
            background: opts.background,
            images: ImageStore::new(root, canvas),
            text: None,
            font_path: opts.font_path,
            font_warned: false,
            warned_scenes: HashSet::new(),
            ctx: None,
            glow_kernel: None,
            blur_scratch: Vec::new(),
        }
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Current subtitle style.
    pub fn style(&self) -> &SubtitleStyle {
        &self.style
    }

    /// Replace the subtitle style for subsequent frames.
    pub fn set_style(&mut self, style: SubtitleStyle) {
        if style.font_family != self.style.font_family && self.font_path.is_none() {
            self.text = None;
            self.font_warned = false;
        }
        self.style = style;
    }

    /// Decode every scene visual and the watermark up front, in parallel.
    #[tracing::instrument(skip(self))]
    pub fn preload(&mut self) {
        let refs: Vec<&str> = self
            .scenes
            .iter()
            .filter(|s| s.media_type == MediaType::Image)
            .filter_map(|s| s.media.as_deref())
            .chain(self.watermark.as_deref())
            .collect();
        self.images.preload(refs);
    }

    /// Render the frame at timeline `position`.
    ///
    /// `anim_secs` is the wall/audio clock driving subtitle oscillations.
    pub fn render_frame(&mut self, position: f64, anim_secs: f64) -> FrameRGBA {
        let (w, h) = (
            u16::try_from(self.canvas.width).unwrap_or(u16::MAX),
            u16::try_from(self.canvas.height).unwrap_or(u16::MAX),
        );
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        ctx.reset();
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(self.background.to_cpu());
        ctx.fill_rect(&self.canvas_rect());

        let scenes = Arc::clone(&self.scenes);
        let timeline = Arc::clone(&self.timeline);
        if let Some(cursor) = timeline.resolve(position)
            && let Some(scene) = scenes.get(cursor.index)
        {
            self.draw_scene_image(&mut ctx, scene, cursor.progress);
            let duration = timeline.segments()[cursor.index].duration;
            self.draw_subtitles(&mut ctx, scene, cursor.elapsed, duration, anim_secs);
        }
        self.draw_watermark(&mut ctx);

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        self.ctx = Some(ctx);

        FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        }
    }

    fn canvas_rect(&self) -> vello_cpu::kurbo::Rect {
        vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.canvas.width),
            f64::from(self.canvas.height),
        )
    }

    fn warn_scene_once(&mut self, scene: &Scene, reason: &str) {
        if self.warned_scenes.insert(scene.id.clone()) {
            tracing::warn!(scene = %scene.id, reason, "scene visual unavailable; rendering background");
        }
    }

    fn draw_scene_image(&mut self, ctx: &mut vello_cpu::RenderContext, scene: &Scene, progress: f64) {
        let Some(media) = scene.media.as_deref() else {
            return;
        };
        if scene.media_type == MediaType::Video {
            self.warn_scene_once(scene, "video media is not composited");
            return;
        }
        let paint = match self.images.get(media) {
            Ok(p) => p,
            Err(e) => {
                self.warn_scene_once(scene, &e);
                return;
            }
        };
        let pose = CameraPose::at(scene.effective_effect(), progress);
        let tr = pose.image_transform(self.canvas, paint.w, paint.h);
        fill_image(ctx, &paint, tr, 1.0);
    }

    fn draw_watermark(&mut self, ctx: &mut vello_cpu::RenderContext) {
        let Some(reference) = self.watermark.clone() else {
            return;
        };
        let paint = match self.images.get(&reference) {
            Ok(p) => p,
            Err(e) => {
                if self.warned_scenes.insert(SceneId(format!("watermark:{reference}"))) {
                    tracing::warn!(reason = %e, "watermark unavailable");
                }
                return;
            }
        };
        let cw = f64::from(self.canvas.width);
        let target_w = cw * WATERMARK_WIDTH_FRACTION;
        let s = target_w / f64::from(paint.w.max(1));
        let margin = cw * WATERMARK_MARGIN_FRACTION;
        let tr = Affine::translate((cw - target_w - margin, margin)) * Affine::scale(s);
        fill_image(ctx, &paint, tr, WATERMARK_OPACITY);
    }

    fn ensure_text(&mut self) -> bool {
        if self.text.is_some() {
            return true;
        }
        if self.font_warned {
            return false;
        }
        match resolve_font(&self.style.font_family, self.font_path.as_deref())
            .and_then(TextLayoutEngine::new)
        {
            Ok(engine) => {
                tracing::debug!(family = engine.family_name(), "subtitle font loaded");
                self.text = Some(engine);
                true
            }
            Err(e) => {
                self.font_warned = true;
                tracing::warn!(error = %e, "no subtitle font; subtitles disabled");
                false
            }
        }
    }

    fn draw_subtitles(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        scene: &Scene,
        elapsed: f64,
        duration: f64,
        anim_secs: f64,
    ) {
        let style = self.style.clone();
        let Some(plan) = plan_subtitles(&scene.script, elapsed, duration, &style, anim_secs) else {
            return;
        };
        if !self.ensure_text() {
            return;
        }
        let shaped = match self.shape_chunk(&plan.words, style.font_px()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(scene = %scene.id, error = %e, "subtitle shaping failed");
                return;
            }
        };
        let Some(text) = self.text.as_ref() else {
            return;
        };
        let font = text.font().clone();

        let total: f64 = shaped.iter().map(|(_, slot)| *slot).sum();
        let y = f64::from(self.canvas.height) * style.vertical_fraction();
        let mut cur_x = f64::from(self.canvas.width) / 2.0 - total / 2.0;

        if style.background_opacity > 0.0
            && let Some((first, _)) = shaped.first()
        {
            let pad = f64::from(style.font_px()) * 0.25;
            let half_h = f64::from(first.ascent + first.descent) / 2.0;
            let rect = vello_cpu::kurbo::RoundedRect::new(
                cur_x - pad,
                y - half_h - pad,
                cur_x + total + pad,
                y + half_h + pad,
                f64::from(style.font_px()) * 0.2,
            );
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(
                style
                    .background_color
                    .with_opacity(style.background_opacity)
                    .to_cpu(),
            );
            ctx.fill_path(&rect.to_path(0.1));
        }

        for (cue, (word, slot)) in plan.words.iter().zip(&shaped) {
            let center_x = cur_x + slot / 2.0;
            cur_x += slot;
            if cue.opacity <= 0.0 {
                continue;
            }
            let word_tr = Affine::translate((center_x, y + cue.dy))
                * Affine::scale(cue.scale)
                * Affine::translate((-f64::from(word.advance) / 2.0, word.middle_baseline(0.0)));

            if cue.glow
                && let Some((glow, pad)) = self.glow_paint(&font, word, cue.color)
            {
                let tr = word_tr * Affine::translate((-pad, -pad - f64::from(word.ascent)));
                fill_image(ctx, &glow, tr, cue.opacity);
            }

            if cue.opacity < 1.0 {
                ctx.push_opacity_layer(cue.opacity);
            }
            ctx.set_transform(affine_to_cpu(word_tr));
            if style.stroke_width > 0.0 {
                ctx.set_stroke(
                    vello_cpu::kurbo::Stroke::new(f64::from(style.stroke_width))
                        .with_join(vello_cpu::kurbo::Join::Round),
                );
                ctx.set_paint(style.outline_color.to_cpu());
                ctx.glyph_run(&font)
                    .font_size(word.size_px)
                    .stroke_glyphs(word.glyphs.iter().cloned());
            }
            ctx.set_paint(cue.color.to_cpu());
            ctx.glyph_run(&font)
                .font_size(word.size_px)
                .fill_glyphs(word.glyphs.iter().cloned());
            if cue.opacity < 1.0 {
                ctx.pop_layer();
            }
        }
    }

    /// Shape each cue word and return it with its slot width (word plus one space).
    fn shape_chunk(
        &mut self,
        cues: &[WordCue<'_>],
        size_px: f32,
    ) -> StoryreelResult<Vec<(ShapedText, f64)>> {
        let Some(text) = self.text.as_mut() else {
            return Ok(Vec::new());
        };
        let space = text.shape(" ", size_px)?.advance;
        cues.iter()
            .map(|c| {
                let word = text.shape(c.text, size_px)?;
                let slot = f64::from(word.advance + space);
                Ok((word, slot))
            })
            .collect()
    }

    /// Blurred halo of `word` in `color`, plus the padding around the glyph box.
    fn glow_paint(
        &mut self,
        font: &vello_cpu::peniko::FontData,
        word: &ShapedText,
        color: Color,
    ) -> Option<(ImagePaint, f64)> {
        let sigma = GLOW_BLUR_PX / 2.0;
        let radius = (sigma * 3.0).ceil() as u32;
        let kernel = match &self.glow_kernel {
            Some(k) => Arc::clone(k),
            None => {
                let k = Arc::new(gaussian_kernel_q16(radius, sigma).ok()?);
                self.glow_kernel = Some(Arc::clone(&k));
                k
            }
        };

        let pad = f64::from(radius);
        let w = (f64::from(word.advance) + 2.0 * pad).ceil();
        let h = (f64::from(word.ascent + word.descent) + 2.0 * pad).ceil();
        let (w, h) = (u16::try_from(w as u32).ok()?, u16::try_from(h as u32).ok()?);

        let mut glow_ctx = vello_cpu::RenderContext::new(w, h);
        glow_ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            pad,
            pad + f64::from(word.ascent),
        )));
        glow_ctx.set_paint(color.to_cpu());
        glow_ctx
            .glyph_run(font)
            .font_size(word.size_px)
            .fill_glyphs(word.glyphs.iter().cloned());
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        glow_ctx.flush();
        glow_ctx.render_to_pixmap(&mut pixmap);

        let mut bytes = pixmap.data_as_u8_slice().to_vec();
        blur_rgba8_premul_q16(
            &mut bytes,
            &mut self.blur_scratch,
            u32::from(w),
            u32::from(h),
            &kernel,
        );
        let pixmap = pixmap_from_premul_bytes(&bytes, u32::from(w), u32::from(h)).ok()?;
        Some((paint_from_pixmap(pixmap), pad))
    }
}

fn fill_image(ctx: &mut vello_cpu::RenderContext, paint: &ImagePaint, tr: Affine, opacity: f32) {
    ctx.set_transform(affine_to_cpu(tr));
    ctx.set_paint(paint.paint.clone());
    if opacity < 1.0 {
        ctx.push_opacity_layer(opacity);
    }
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(paint.w),
        f64::from(paint.h),
    ));
    if opacity < 1.0 {
        ctx.pop_layer();
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
