use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use base64::Engine as _;
use rayon::prelude::*;

use crate::foundation::core::Canvas;
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::scene::model::Project;

/// Raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub(crate) struct PreparedImage {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) rgba8_premul: Vec<u8>,
}

/// Rasterizer-ready image paint and its pixel size.
#[derive(Clone)]
pub(crate) struct ImagePaint {
    pub(crate) paint: vello_cpu::Image,
    pub(crate) w: u32,
    pub(crate) h: u32,
}

/// Decode encoded raster bytes (PNG/JPEG/WebP/...) and premultiply.
pub(crate) fn decode_image(bytes: &[u8]) -> StoryreelResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);
    Ok(PreparedImage {
        width,
        height,
        rgba8_premul,
    })
}

/// Parse SVG bytes and rasterize them to `target` pixels.
pub(crate) fn rasterize_svg(bytes: &[u8], target: Canvas) -> StoryreelResult<PreparedImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;
    let (width, height) = (target.width.max(1), target.height.max(1));
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| StoryreelError::validation("failed to allocate svg pixmap"))?;
    let size = tree.size();
    let xform = resvg::tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, xform, &mut pixmap.as_mut());
    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: pixmap.data().to_vec(),
    })
}

fn looks_like_svg(reference: &str, bytes: &[u8]) -> bool {
    if reference.starts_with("data:image/svg") {
        return true;
    }
    if Path::new(reference)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
    {
        return true;
    }
    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

/// Build a `vello_cpu` pixmap from premultiplied RGBA8 bytes.
pub(crate) fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> StoryreelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| StoryreelError::validation("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| StoryreelError::validation("pixmap height exceeds u16"))?;
    if bytes.len() != (width as usize) * (height as usize) * 4 {
        return Err(StoryreelError::validation("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

/// Wrap a pixmap as an image paint.
pub(crate) fn paint_from_pixmap(pixmap: vello_cpu::Pixmap) -> ImagePaint {
    let (w, h) = (u32::from(pixmap.width()), u32::from(pixmap.height()));
    ImagePaint {
        paint: vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        },
        w,
        h,
    }
}

/// Decoded scene visuals keyed by their project reference.
///
/// References may be project-relative paths, absolute paths or `data:` URLs with base64
/// payloads. Failures are remembered so a broken asset is only read once.
pub(crate) struct ImageStore {
    root: PathBuf,
    canvas: Canvas,
    cache: HashMap<String, Result<ImagePaint, String>>,
}

impl ImageStore {
    pub(crate) fn new(root: impl Into<PathBuf>, canvas: Canvas) -> Self {
        Self {
            root: root.into(),
            canvas,
            cache: HashMap::new(),
        }
    }

    /// Decode every not-yet-cached reference in parallel.
    pub(crate) fn preload<'a>(&mut self, refs: impl IntoIterator<Item = &'a str>) {
        let mut pending: Vec<&str> = refs
            .into_iter()
            .filter(|r| !self.cache.contains_key(*r))
            .collect();
        pending.sort_unstable();
        pending.dedup();
        if pending.is_empty() {
            return;
        }

        let (root, canvas) = (&self.root, self.canvas);
        let decoded: Vec<(String, StoryreelResult<PreparedImage>)> = pending
            .par_iter()
            .map(|r| ((*r).to_owned(), load_prepared(root, canvas, r)))
            .collect();

        for (reference, prepared) in decoded {
            let entry = prepared
                .and_then(|p| pixmap_from_premul_bytes(&p.rgba8_premul, p.width, p.height))
                .map(paint_from_pixmap)
                .map_err(|e| e.to_string());
            self.cache.insert(reference, entry);
        }
        tracing::debug!(count = self.cache.len(), "images preloaded");
    }

    /// Paint for `reference`, decoding on first use.
    pub(crate) fn get(&mut self, reference: &str) -> Result<ImagePaint, String> {
        if !self.cache.contains_key(reference) {
            self.preload([reference]);
        }
        self.cache
            .get(reference)
            .cloned()
            .unwrap_or_else(|| Err(format!("image '{reference}' not loaded")))
    }
}

fn load_prepared(root: &Path, canvas: Canvas, reference: &str) -> StoryreelResult<PreparedImage> {
    let bytes = read_reference(root, reference)?;
    if looks_like_svg(reference, &bytes) {
        rasterize_svg(&bytes, canvas)
    } else {
        decode_image(&bytes)
    }
}

fn read_reference(root: &Path, reference: &str) -> StoryreelResult<Vec<u8>> {
    if let Some(rest) = reference.strip_prefix("data:") {
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| StoryreelError::validation("malformed data url"))?;
        if !meta.ends_with(";base64") {
            return Err(StoryreelError::validation("data url must be base64 encoded"));
        }
        return base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| StoryreelError::validation(format!("invalid data url payload: {e}")));
    }
    let path = Project::resolve(root, reference);
    let bytes =
        std::fs::read(&path).with_context(|| format!("read image '{}'", path.display()))?;
    Ok(bytes)
}

#[cfg(test)]
#[path = "../../tests/unit/render/images.rs"]
mod tests;
