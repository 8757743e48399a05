use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::render::frame::FrameRGBA;

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Capture frame rate.
    pub fps: Fps,
    /// Format of audio delivered through [`FrameSink::push_audio`], if any.
    pub audio: Option<AudioFormat>,
}

/// Interleaved `f32` PCM layout of captured audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// Consumer of captured frames and audio.
///
/// `push_frame` is called in strictly increasing `FrameIndex` order. Audio may arrive in any
/// number of chunks, always in capture order. After a failure the pipeline calls
/// [`FrameSink::abort`] instead of [`FrameSink::end`]; a sink must not leave a finished-looking
/// artifact behind in that case.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> StoryreelResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> StoryreelResult<()>;
    /// Append captured audio. Sinks without audio support ignore it.
    fn push_audio(&mut self, samples_interleaved: &[f32]) -> StoryreelResult<()> {
        let _ = samples_interleaved;
        Ok(())
    }
    /// Finalize the output after the last frame.
    fn end(&mut self) -> StoryreelResult<()>;
    /// Discard everything written so far.
    fn abort(&mut self) {}
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    audio: Vec<f32>,
    finished: bool,
    aborted: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    /// Captured interleaved audio.
    pub fn audio(&self) -> &[f32] {
        &self.audio
    }

    /// Whether `end` completed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the capture was aborted.
    pub fn was_aborted(&self) -> bool {
        self.aborted
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> StoryreelResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.audio.clear();
        self.finished = false;
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> StoryreelResult<()> {
        if let Some((last, _)) = self.frames.last()
            && idx <= *last
        {
            return Err(StoryreelError::capture("out-of-order frame index"));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn push_audio(&mut self, samples_interleaved: &[f32]) -> StoryreelResult<()> {
        self.audio.extend_from_slice(samples_interleaved);
        Ok(())
    }

    fn end(&mut self) -> StoryreelResult<()> {
        self.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.audio.clear();
        self.aborted = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
