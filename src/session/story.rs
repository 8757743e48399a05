use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context as _;
use parking_lot::Mutex;

use crate::audio::clock::{AudioClock, SystemClock};
use crate::audio::decode::decode_wav;
use crate::audio::graph::{AudioSink, MusicTrack, OUTPUT_CHANNELS};
use crate::audio::mix::{mixdown, write_wav_16};
use crate::audio::narration::NarrationSource;
use crate::audio::playback::{PlaybackController, PlaybackMode, PlaybackOpts};
use crate::audio::timeline::{Timeline, build_timeline};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::FrameSink;
use crate::export::artifact::{ExportKind, PendingArtifact};
use crate::export::filename::sanitize_filename;
use crate::export::pipeline::{CaptureReport, ExportOpts, capture};
use crate::export::script::script_transcript;
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::Canvas;
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::render::cpu::{RenderEngine, RenderOpts};
use crate::render::frame::FrameRGBA;
use crate::scene::model::Project;
use crate::scene::style::SubtitleStyle;

/// Options for [`StorySession`].
#[derive(Clone, Debug)]
pub struct SessionOpts {
    /// Frame rendering options shared by preview and export.
    pub render: RenderOpts,
    /// Capture options for video exports.
    pub export: ExportOpts,
    /// Directory artifacts are written to.
    pub out_dir: PathBuf,
    /// Block size of the background audio driver. `None` leaves pumping to the caller.
    pub driver_block: Option<Duration>,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            render: RenderOpts::default(),
            export: ExportOpts::default(),
            out_dir: PathBuf::from("."),
            driver_block: Some(Duration::from_millis(10)),
        }
    }
}

/// Result of [`StorySession::export`].
#[derive(Clone, Debug)]
pub struct ExportReport {
    /// Exported artifact kind.
    pub kind: ExportKind,
    /// Published artifact path.
    pub path: PathBuf,
    /// Capture summary for video exports.
    pub capture: Option<CaptureReport>,
}

/// One project loaded for preview and export.
///
/// The timeline is built once when the session opens. Preview playback runs against the
/// session clock; exports capture on their own virtual clock. Only one export runs at a time,
/// and monitored playback is refused while it does.
pub struct StorySession {
    project: Project,
    root: PathBuf,
    timeline: Arc<Timeline>,
    music: Option<MusicTrack>,
    engine: Mutex<RenderEngine>,
    playback: PlaybackController,
    exporting: AtomicBool,
    opts: SessionOpts,
}

impl StorySession {
    /// Validate `project`, synthesize and decode every scene's narration, and prepare preview.
    ///
    /// Relative media paths resolve against `root`.
    #[tracing::instrument(skip_all, fields(title = %project.title, scenes = project.scenes.len()))]
    pub fn open(
        project: Project,
        root: impl Into<PathBuf>,
        source: &dyn NarrationSource,
        opts: SessionOpts,
        cancel: &CancelToken,
    ) -> StoryreelResult<Self> {
        project.validate()?;
        let timeline = build_timeline(
            &project.scenes,
            source,
            &project.language,
            &project.voice,
            cancel,
        )?;
        Ok(Self::new(
            project,
            root,
            timeline,
            Arc::new(SystemClock::new()),
            opts,
        ))
    }

    /// Session over an already built timeline, driven by `clock`.
    pub fn new(
        project: Project,
        root: impl Into<PathBuf>,
        timeline: Timeline,
        clock: Arc<dyn AudioClock>,
        opts: SessionOpts,
    ) -> Self {
        let root = root.into();
        let timeline = Arc::new(timeline);
        let music = load_music(&project, &root);
        let mut engine = RenderEngine::new(
            &project,
            &root,
            Arc::clone(&timeline),
            opts.render.clone(),
        );
        engine.preload();

        let mut playback = PlaybackController::new(
            Arc::clone(&timeline),
            clock,
            PlaybackOpts {
                narration_volume: project.narration_volume,
                music: music.clone(),
                ..PlaybackOpts::default()
            },
        );
        if let Some(block) = opts.driver_block {
            playback.spawn_driver(block);
        }

        Self {
            project,
            root,
            timeline,
            music,
            engine: Mutex::new(engine),
            playback,
            exporting: AtomicBool::new(false),
            opts,
        }
    }

    /// Project snapshot.
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Directory media paths resolve against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Narration timeline.
    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    /// Total narration duration in seconds.
    pub fn total_duration(&self) -> f64 {
        self.timeline.total_duration()
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.engine.lock().canvas()
    }

    /// Preview transport.
    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    /// Whether an export is running.
    pub fn is_exporting(&self) -> bool {
        self.exporting.load(Ordering::Acquire)
    }

    /// Start preview playback at `offset`.
    pub fn play(&self, offset: f64, mode: PlaybackMode) -> StoryreelResult<()> {
        self.check_mode(mode)?;
        self.playback.play(offset, mode);
        Ok(())
    }

    /// Pause preview playback, returning the held position.
    pub fn pause(&self) -> f64 {
        self.playback.pause()
    }

    /// Move the preview to `offset`.
    pub fn seek(&self, offset: f64) {
        self.playback.seek(offset);
    }

    /// Pause when playing, otherwise resume in `mode`. Returns whether playback is now running.
    pub fn toggle(&self, mode: PlaybackMode) -> StoryreelResult<bool> {
        if !self.playback.is_playing() {
            self.check_mode(mode)?;
        }
        Ok(self.playback.toggle(mode))
    }

    /// Route monitored preview audio to `monitor`.
    pub fn set_monitor(&self, monitor: Option<Box<dyn AudioSink>>) {
        self.playback.set_monitor(monitor);
    }

    /// Change the narration multiplier for preview and later exports.
    pub fn set_narration_volume(&mut self, volume: f32) {
        self.project.narration_volume = volume;
        self.playback.set_narration_volume(volume);
    }

    /// Swap the subtitle style used by preview and later exports.
    pub fn set_style(&mut self, style: SubtitleStyle) {
        self.project.subtitles = style.clone();
        self.engine.get_mut().set_style(style);
    }

    /// Render the frame at `position`.
    pub fn render_at(&self, position: f64, anim_secs: f64) -> FrameRGBA {
        self.engine.lock().render_frame(position, anim_secs)
    }

    /// Produce one artifact of `kind` in the output directory.
    ///
    /// The artifact is written under a temporary name and only renamed into place once
    /// complete. Fails with [`StoryreelError::ExportBusy`] while another export is running.
    #[tracing::instrument(skip(self, cancel), fields(title = %self.project.title))]
    pub fn export(&self, kind: ExportKind, cancel: &CancelToken) -> StoryreelResult<ExportReport> {
        let stem = sanitize_filename(&self.project.title);
        let file_name = kind.file_name(&stem)?;
        let _guard = ExportGuard::acquire(&self.exporting)?;
        self.release_monitor();

        let pending = PendingArtifact::new(self.opts.out_dir.join(file_name))?;
        let mut capture_report = None;
        match kind {
            ExportKind::Script => {
                std::fs::write(pending.path(), script_transcript(&self.project.scenes))
                    .with_context(|| format!("write script '{}'", pending.path().display()))?;
            }
            ExportKind::Audio => {
                cancel.check()?;
                let samples = self.mixdown();
                write_wav_16(
                    pending.path(),
                    &samples,
                    self.playback_opts().sample_rate,
                    OUTPUT_CHANNELS,
                )?;
            }
            ExportKind::Thumbnail => {
                self.render_at(0.0, 0.0).write_png(pending.path())?;
            }
            ExportKind::Video => {
                let bg = self.opts.render.background;
                let mut sink = FfmpegSink::new(FfmpegSinkOpts {
                    out_path: pending.path().to_path_buf(),
                    overwrite: true,
                    bg_rgba: [bg.r, bg.g, bg.b, 255],
                });
                capture_report = Some(self.capture_into(&mut sink, cancel)?);
            }
            ExportKind::Bundle => {
                return Err(StoryreelError::validation("bundle exports are not supported"));
            }
        }

        let path = pending.commit()?;
        tracing::info!(%kind, path = %path.display(), "export finished");
        Ok(ExportReport {
            kind,
            path,
            capture: capture_report,
        })
    }

    /// Offline narration and music mix over the whole timeline, interleaved stereo.
    pub fn mixdown(&self) -> Vec<f32> {
        mixdown(
            &self.timeline,
            self.project.narration_volume,
            self.music.clone(),
        )
    }

    /// Capture the whole timeline into a caller-provided sink.
    #[tracing::instrument(skip_all)]
    pub fn export_to_sink(
        &self,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
    ) -> StoryreelResult<CaptureReport> {
        let _guard = ExportGuard::acquire(&self.exporting)?;
        self.release_monitor();
        self.capture_into(sink, cancel)
    }

    fn capture_into(
        &self,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
    ) -> StoryreelResult<CaptureReport> {
        // Exports render on their own engine so the preview keeps ticking.
        let mut engine = RenderEngine::new(
            &self.project,
            &self.root,
            Arc::clone(&self.timeline),
            self.opts.render.clone(),
        );
        engine.preload();
        capture(
            &mut engine,
            &self.timeline,
            self.playback_opts(),
            &self.opts.export,
            sink,
            cancel,
        )
    }

    fn playback_opts(&self) -> PlaybackOpts {
        PlaybackOpts {
            narration_volume: self.project.narration_volume,
            music: self.music.clone(),
            ..PlaybackOpts::default()
        }
    }

    fn check_mode(&self, mode: PlaybackMode) -> StoryreelResult<()> {
        if mode == PlaybackMode::Monitored && self.is_exporting() {
            return Err(StoryreelError::PlaybackBusy);
        }
        Ok(())
    }

    fn release_monitor(&self) {
        if self.playback.is_playing() && self.playback.mode() == PlaybackMode::Monitored {
            let at = self.playback.pause();
            tracing::debug!(at, "monitored preview paused for export");
        }
    }
}

/// Holds the session's export slot until dropped.
struct ExportGuard<'a>(&'a AtomicBool);

impl<'a> ExportGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> StoryreelResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| StoryreelError::ExportBusy)?;
        Ok(Self(flag))
    }
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn load_music(project: &Project, root: &Path) -> Option<MusicTrack> {
    let bed = project.music.as_ref()?;
    let path = Project::resolve(root, &bed.source);
    let decoded = std::fs::read(&path)
        .with_context(|| format!("read music '{}'", path.display()))
        .map_err(StoryreelError::from)
        .and_then(|bytes| decode_wav(&bytes));
    match decoded {
        Ok(pcm) => Some(MusicTrack {
            pcm: Arc::new(pcm),
            volume: bed.volume,
        }),
        Err(e) => {
            tracing::warn!(source = %bed.source, error = %e, "music bed unavailable; continuing without it");
            None
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/story.rs"]
mod tests;
