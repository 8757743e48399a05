//! Storyreel composites narrated, subtitled slideshows.
//!
//! A project's scenes are narrated one after another on a single audio timeline. The compositing
//! core renders each frame from that timeline (scene image with a camera move, word-highlighted
//! subtitles, optional watermark) and can capture the whole thing offline into an MP4:
//!
//! - Load a [`Project`] and open a [`StorySession`] with a [`NarrationSource`]
//! - Drive preview playback through [`PreviewLoop`]
//! - Export video, audio, script or thumbnail artifacts with [`StorySession::export`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Narration decoding, timeline, audio graph and playback.
pub mod audio;
/// Frame and audio sinks.
pub mod encode;
/// Export artifacts and the capture pipeline.
pub mod export;
/// Frame compositing.
pub mod render;
/// Project and subtitle-style model.
pub mod scene;
/// Session-level API.
pub mod session;

pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::color::Color;
pub use crate::foundation::core::{
    Affine, AspectRatio, Canvas, Fps, FrameIndex, Point, Rect, Vec2, format_mm_ss,
};
pub use crate::foundation::error::{StoryreelError, StoryreelResult};

pub use crate::audio::clock::{AudioClock, ManualClock, PositionCell, SystemClock};
pub use crate::audio::decode::{
    AudioPcm, MIX_SAMPLE_RATE, NARRATION_SAMPLE_RATE, NarrationEncoding, decode_narration,
};
pub use crate::audio::graph::{AudioSink, CaptureBus, MusicTrack};
pub use crate::audio::narration::{
    DirNarrationSource, FnNarrationSource, NarrationAudio, NarrationRequest, NarrationSource,
};
pub use crate::audio::playback::{PlaybackController, PlaybackMode, PlaybackOpts};
pub use crate::audio::timeline::{AudioSegment, Timeline, TimelineCursor, build_timeline};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::sink::{AudioFormat, FrameSink, InMemorySink, SinkConfig};
pub use crate::export::artifact::ExportKind;
pub use crate::export::filename::sanitize_filename;
pub use crate::export::pipeline::{CaptureReport, ExportOpts};
pub use crate::export::script::script_transcript;
pub use crate::render::cpu::{RenderEngine, RenderOpts};
pub use crate::render::frame::FrameRGBA;
pub use crate::scene::model::{MediaType, MusicBed, Project, Scene, SceneId, VisualEffect};
pub use crate::scene::style::{SubtitleAnimation, SubtitleStyle};
pub use crate::session::preview::{PreviewLoop, PreviewTick};
pub use crate::session::story::{ExportReport, SessionOpts, StorySession};
