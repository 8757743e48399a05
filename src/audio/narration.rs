use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::audio::decode::NarrationEncoding;
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::scene::model::SceneId;

/// One narration synthesis request.
#[derive(Clone, Copy, Debug)]
pub struct NarrationRequest<'a> {
    /// Scene the narration belongs to.
    pub scene_id: &'a SceneId,
    /// Text to be spoken.
    pub script: &'a str,
    /// Language tag, e.g. `en`.
    pub language: &'a str,
    /// Voice identifier understood by the source.
    pub voice: &'a str,
}

/// Encoded narration returned by a [`NarrationSource`].
#[derive(Clone, Debug)]
pub struct NarrationAudio {
    /// Raw bytes as produced by the source.
    pub bytes: Vec<u8>,
    /// Declared encoding of `bytes`.
    pub encoding: NarrationEncoding,
}

/// Produces narration audio for a scene script.
///
/// Called once per scene, strictly in scene order, by
/// [`build_timeline`](crate::audio::timeline::build_timeline).
pub trait NarrationSource: Send + Sync {
    /// Synthesize (or look up) narration for `req`.
    fn synthesize(&self, req: &NarrationRequest<'_>) -> StoryreelResult<NarrationAudio>;
}

/// Narration pre-generated on disk as `<root>/<scene-id>.{wav,pcm,b64}`.
#[derive(Clone, Debug)]
pub struct DirNarrationSource {
    root: PathBuf,
}

impl DirNarrationSource {
    const CANDIDATES: [(&'static str, NarrationEncoding); 3] = [
        ("wav", NarrationEncoding::Wav),
        ("pcm", NarrationEncoding::RawPcm16),
        ("b64", NarrationEncoding::Base64Pcm16),
    ];

    /// Look up narration files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory searched for narration files.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl NarrationSource for DirNarrationSource {
    fn synthesize(&self, req: &NarrationRequest<'_>) -> StoryreelResult<NarrationAudio> {
        for (ext, encoding) in Self::CANDIDATES {
            let path = self.root.join(format!("{}.{ext}", req.scene_id));
            if !path.is_file() {
                continue;
            }
            let bytes = std::fs::read(&path)
                .with_context(|| format!("read narration '{}'", path.display()))?;
            // `.b64` may wrap either a container or raw PCM.
            let encoding = if encoding == NarrationEncoding::Base64Pcm16
                && looks_like_base64_wav(&bytes)
            {
                NarrationEncoding::Base64Wav
            } else {
                encoding
            };
            tracing::debug!(scene = %req.scene_id, path = %path.display(), "narration file");
            return Ok(NarrationAudio { bytes, encoding });
        }
        Err(StoryreelError::validation(format!(
            "no narration file for scene '{}' under '{}'",
            req.scene_id,
            self.root.display()
        )))
    }
}

fn looks_like_base64_wav(bytes: &[u8]) -> bool {
    // "RIFF" encodes to "UklG".
    bytes
        .iter()
        .skip_while(|b| b.is_ascii_whitespace())
        .take(4)
        .eq(b"UklG".iter())
}

/// Closure-backed narration source.
pub struct FnNarrationSource<F>(pub F);

impl<F> NarrationSource for FnNarrationSource<F>
where
    F: Fn(&NarrationRequest<'_>) -> StoryreelResult<NarrationAudio> + Send + Sync,
{
    fn synthesize(&self, req: &NarrationRequest<'_>) -> StoryreelResult<NarrationAudio> {
        (self.0)(req)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/narration.rs"]
mod tests;
