use std::time::Instant;

use crate::audio::playback::PlaybackMode;
use crate::foundation::core::format_mm_ss;
use crate::foundation::error::StoryreelResult;
use crate::render::frame::FrameRGBA;
use crate::session::story::StorySession;

/// Output of one [`PreviewLoop::tick`].
#[derive(Clone, Debug)]
pub struct PreviewTick {
    /// Composited frame.
    pub frame: FrameRGBA,
    /// Timeline position the frame was rendered at.
    pub position: f64,
    /// Whether this tick reached the end and paused playback.
    pub ended: bool,
    /// `mm:ss / mm:ss` status line.
    pub status: String,
}

/// Host-driven preview: the host calls [`PreviewLoop::tick`] once per display refresh and
/// [`PreviewLoop::toggle`] on pointer input.
///
/// Ticks only read the published playback position; they never advance audio themselves.
pub struct PreviewLoop<'a> {
    session: &'a StorySession,
    mode: PlaybackMode,
    epoch: Instant,
}

impl<'a> PreviewLoop<'a> {
    /// Preview `session`, playing in `mode` when toggled on.
    pub fn new(session: &'a StorySession, mode: PlaybackMode) -> Self {
        Self {
            session,
            mode,
            epoch: Instant::now(),
        }
    }

    /// Play/pause. Returns whether playback is now running.
    pub fn toggle(&self) -> StoryreelResult<bool> {
        self.session.toggle(self.mode)
    }

    /// Whether preview playback is running.
    pub fn is_playing(&self) -> bool {
        self.session.playback().is_playing()
    }

    /// Render the current frame, animating subtitles on wall-clock time.
    pub fn tick(&self) -> PreviewTick {
        self.tick_at(self.epoch.elapsed().as_secs_f64())
    }

    /// Render the current frame with subtitle animation at `anim_secs`.
    pub fn tick_at(&self, anim_secs: f64) -> PreviewTick {
        let total = self.session.total_duration();
        let mut position = self.session.playback().published_position();
        let mut ended = false;
        if position >= total && self.session.playback().is_playing() {
            self.session.pause();
            self.session.seek(total);
            position = total;
            ended = true;
            tracing::debug!(total, "preview reached the end");
        }
        let frame = self.session.render_at(position, anim_secs);
        PreviewTick {
            frame,
            position,
            ended,
            status: format!(
                "{} / {}",
                format_mm_ss(position.min(total)),
                format_mm_ss(total)
            ),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/preview.rs"]
mod tests;
