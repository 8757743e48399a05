use std::path::Path;

use anyhow::Context as _;
use usvg::fontdb;

use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Weight used for subtitle text.
pub const SUBTITLE_WEIGHT: f32 = 900.0;

/// Font bytes selected for subtitles.
#[derive(Clone)]
pub(crate) struct LoadedFont {
    pub(crate) bytes: Vec<u8>,
    pub(crate) index: u32,
}

/// Locate a font for `family`, preferring an explicit file, then installed system fonts.
///
/// Falls back to any sans-serif face when the family is not installed.
pub(crate) fn resolve_font(family: &str, explicit: Option<&Path>) -> StoryreelResult<LoadedFont> {
    if let Some(path) = explicit {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        return Ok(LoadedFont { bytes, index: 0 });
    }

    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    let families = [fontdb::Family::Name(family), fontdb::Family::SansSerif];
    let query = fontdb::Query {
        families: &families,
        weight: fontdb::Weight(SUBTITLE_WEIGHT as u16),
        ..fontdb::Query::default()
    };
    let id = db.query(&query).ok_or_else(|| {
        StoryreelError::validation(format!("no installed font matches '{family}' or sans-serif"))
    })?;
    db.with_face_data(id, |data, index| LoadedFont {
        bytes: data.to_vec(),
        index,
    })
    .ok_or_else(|| StoryreelError::validation("font face data unavailable"))
}

/// A shaped single-line run of text.
#[derive(Clone, Debug, Default)]
pub(crate) struct ShapedText {
    /// Glyphs positioned relative to the run origin (x from 0, y on the baseline).
    pub(crate) glyphs: Vec<vello_cpu::Glyph>,
    /// Horizontal advance of the whole run.
    pub(crate) advance: f32,
    /// Font size the run was shaped at.
    pub(crate) size_px: f32,
    /// Baseline offset from the top of the line box.
    pub(crate) baseline: f32,
    /// Ascent above the baseline.
    pub(crate) ascent: f32,
    /// Descent below the baseline.
    pub(crate) descent: f32,
}

impl ShapedText {
    /// Baseline offset that centers the em box on `y` (canvas `textBaseline = middle`).
    pub(crate) fn middle_baseline(&self, y: f64) -> f64 {
        y + f64::from(self.ascent - self.descent) / 2.0
    }
}

/// Stateful helper for shaping text with Parley against one registered font.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    family_name: String,
    font: vello_cpu::peniko::FontData,
}

impl TextLayoutEngine {
    /// Register `font` and prepare fresh Parley contexts.
    pub(crate) fn new(font: LoadedFont) -> StoryreelResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font.bytes.clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            StoryreelError::validation("no font families registered from font bytes")
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| StoryreelError::validation("registered font family has no name"))?
            .to_string();
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font.bytes),
            font.index,
        );
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            font,
        })
    }

    /// Font handed to the rasterizer for glyph runs.
    pub(crate) fn font(&self) -> &vello_cpu::peniko::FontData {
        &self.font
    }

    /// Family name registered for the loaded font.
    pub(crate) fn family_name(&self) -> &str {
        &self.family_name
    }

    /// Shape `text` on a single unbroken line.
    pub(crate) fn shape(&mut self, text: &str, size_px: f32) -> StoryreelResult<ShapedText> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(StoryreelError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(SUBTITLE_WEIGHT),
        ));
        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);

        let mut out = ShapedText {
            size_px,
            ..ShapedText::default()
        };
        if let Some(line) = layout.lines().next() {
            let m = line.metrics();
            out.baseline = m.baseline;
            out.ascent = m.ascent;
            out.descent = m.descent;
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                out.advance += run.advance();
                out.glyphs
                    .extend(run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y - m.baseline,
                    }));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
