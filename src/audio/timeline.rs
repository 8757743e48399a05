use std::sync::Arc;

use crate::audio::decode::{AudioPcm, decode_narration};
use crate::audio::narration::{NarrationRequest, NarrationSource};
use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::foundation::math::clamp01;
use crate::scene::model::{Scene, SceneId};

/// One scene's narration placed on the master timeline.
#[derive(Clone, Debug)]
pub struct AudioSegment {
    /// Scene the segment narrates.
    pub scene_id: SceneId,
    /// Position of the scene in the project.
    pub scene_index: usize,
    /// Decoded narration, shared with the audio graph.
    pub pcm: Arc<AudioPcm>,
    /// Absolute start in seconds.
    pub start: f64,
    /// Intrinsic duration of `pcm` in seconds.
    pub duration: f64,
}

impl AudioSegment {
    /// Absolute end in seconds (exclusive).
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Whether `t` lies in `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end()
    }

    /// Normalized progress `clamp((t - start) / duration, 0, 1)`.
    pub fn progress(&self, t: f64) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        clamp01((t - self.start) / self.duration)
    }

    /// Seconds elapsed inside the segment, clamped to `[0, duration]`.
    pub fn elapsed(&self, t: f64) -> f64 {
        (t - self.start).clamp(0.0, self.duration.max(0.0))
    }
}

/// Where a timeline position lands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineCursor {
    /// Index of the active segment.
    pub index: usize,
    /// Seconds elapsed inside the active segment.
    pub elapsed: f64,
    /// Normalized progress inside the active segment.
    pub progress: f64,
}

/// Ordered, contiguous narration segments.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    segments: Vec<AudioSegment>,
    total: f64,
}

impl Timeline {
    /// Lay out decoded narration back to back, in the given order.
    pub fn from_decoded(items: impl IntoIterator<Item = (SceneId, AudioPcm)>) -> Self {
        let mut segments = Vec::new();
        let mut accumulated = 0.0f64;
        for (scene_index, (scene_id, pcm)) in items.into_iter().enumerate() {
            let duration = pcm.duration_secs();
            segments.push(AudioSegment {
                scene_id,
                scene_index,
                pcm: Arc::new(pcm),
                start: accumulated,
                duration,
            });
            accumulated += duration;
        }
        Self {
            segments,
            total: accumulated,
        }
    }

    /// All segments in start order.
    pub fn segments(&self) -> &[AudioSegment] {
        &self.segments
    }

    /// Sum of all segment durations.
    pub fn total_duration(&self) -> f64 {
        self.total
    }

    /// Whether the timeline has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index of the segment whose `[start, end)` contains `t`.
    pub fn segment_at(&self, t: f64) -> Option<usize> {
        if !t.is_finite() {
            return None;
        }
        let after = self.segments.partition_point(|s| s.start <= t);
        let idx = after.checked_sub(1)?;
        self.segments[idx].contains(t).then_some(idx)
    }

    /// Active segment for rendering.
    ///
    /// Positions before the first start map to the first segment at progress 0; positions at or
    /// after the end map to the last segment frozen at progress 1. Returns `None` only for an
    /// empty timeline.
    pub fn resolve(&self, t: f64) -> Option<TimelineCursor> {
        let last = self.segments.len().checked_sub(1)?;
        let index = if t.is_nan() || t < 0.0 {
            0
        } else if t >= self.total {
            last
        } else {
            self.segment_at(t).unwrap_or(last)
        };
        let seg = &self.segments[index];
        let t = if t.is_nan() { seg.start } else { t };
        Some(TimelineCursor {
            index,
            elapsed: seg.elapsed(t),
            progress: seg.progress(t),
        })
    }

    /// Progress of segment `index` at `t`.
    pub fn progress(&self, index: usize, t: f64) -> Option<f64> {
        self.segments.get(index).map(|s| s.progress(t))
    }
}

/// Build the timeline by requesting and decoding narration for every scene, in order.
///
/// The first failing scene aborts the whole build with [`StoryreelError::TimelineBuild`]; no
/// partial timeline is returned. `cancel` is checked before each narration request.
#[tracing::instrument(skip_all, fields(scenes = scenes.len()))]
pub fn build_timeline(
    scenes: &[Scene],
    source: &dyn NarrationSource,
    language: &str,
    voice: &str,
    cancel: &CancelToken,
) -> StoryreelResult<Timeline> {
    let mut decoded = Vec::with_capacity(scenes.len());
    for (scene_index, scene) in scenes.iter().enumerate() {
        cancel.check()?;
        let req = NarrationRequest {
            scene_id: &scene.id,
            script: &scene.script,
            language,
            voice,
        };
        let pcm = source
            .synthesize(&req)
            .and_then(|audio| decode_narration(&audio.bytes, audio.encoding))
            .map_err(|e| match e {
                StoryreelError::Cancelled => StoryreelError::Cancelled,
                other => StoryreelError::timeline_build(scene_index, scene.id.as_str(), other),
            })?;
        tracing::debug!(
            scene = %scene.id,
            secs = pcm.duration_secs(),
            rate = pcm.sample_rate,
            "narration decoded"
        );
        decoded.push((scene.id.clone(), pcm));
    }
    let timeline = Timeline::from_decoded(decoded);
    tracing::info!(total_secs = timeline.total_duration(), "timeline built");
    Ok(timeline)
}

#[cfg(test)]
#[path = "../../tests/unit/audio/timeline.rs"]
mod tests;
