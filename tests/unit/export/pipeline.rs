use super::*;

use std::path::Path;

use crate::audio::decode::AudioPcm;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::Canvas;
use crate::render::cpu::RenderOpts;
use crate::scene::model::{Project, Scene, SceneId};

fn timeline(durations: &[f64]) -> Arc<Timeline> {
    Arc::new(Timeline::from_decoded(durations.iter().enumerate().map(
        |(i, d)| {
            (
                SceneId(format!("s{i}")),
                AudioPcm {
                    sample_rate: 1000,
                    channels: 1,
                    interleaved_f32: vec![0.25; (d * 1000.0).round() as usize],
                },
            )
        },
    )))
}

fn engine(timeline: &Arc<Timeline>) -> RenderEngine {
    let scenes = (0..timeline.segments().len())
        .map(|i| Scene::new(format!("s{i}"), "one two three"))
        .collect();
    let mut project = Project::new("t", scenes);
    project.subtitles.visible = false;
    RenderEngine::new(
        &project,
        Path::new("."),
        Arc::clone(timeline),
        RenderOpts {
            canvas: Some(Canvas {
                width: 16,
                height: 16,
            }),
            ..RenderOpts::default()
        },
    )
}

fn playback() -> PlaybackOpts {
    PlaybackOpts {
        sample_rate: 8000,
        ..PlaybackOpts::default()
    }
}

#[test]
fn stop_adds_margin_to_total() {
    assert_eq!(capture_stop(16.0, 0.5), 16.5);
    assert_eq!(capture_stop(-1.0, 0.5), 0.5);
    assert_eq!(capture_stop(f64::NAN, 0.5), 0.5);
}

#[test]
fn capture_covers_timeline_plus_margin() {
    let tl = timeline(&[0.4, 0.3]);
    let mut engine = engine(&tl);
    let mut sink = InMemorySink::new();
    let report = capture(
        &mut engine,
        &tl,
        playback(),
        &ExportOpts::default(),
        &mut sink,
        &CancelToken::new(),
    )
    .unwrap();

    // stop = 0.7 + 0.5 = 1.2 s -> 36 frames at 30 fps.
    assert_eq!(report.frames, 36);
    assert!((report.stop_secs - 1.2).abs() < 1e-9);
    assert!(report.video_secs() >= tl.total_duration());
    assert!(report.audio_secs() >= tl.total_duration());
    assert_eq!(report.audio_frames, 9600);

    assert!(sink.is_finished());
    assert_eq!(sink.frames().len(), 36);
    assert!(
        sink.frames()
            .windows(2)
            .all(|w| w[0].0.0 + 1 == w[1].0.0)
    );
    assert_eq!(sink.audio().len(), 9600 * 2);
    let cfg = sink.config().unwrap();
    assert_eq!((cfg.width, cfg.height), (16, 16));
    assert_eq!(cfg.audio.unwrap().channels, 2);

    // Narration is audible during the timeline and silent in the margin.
    let at = |secs: f64| sink.audio()[((secs * 8000.0) as usize) * 2];
    assert!((at(0.2) - 0.25).abs() < 1e-4);
    assert!((at(0.6) - 0.25).abs() < 1e-4);
    assert_eq!(at(1.0), 0.0);
}

#[test]
fn cancelled_capture_aborts_the_sink() {
    let tl = timeline(&[0.4]);
    let mut engine = engine(&tl);
    let mut sink = InMemorySink::new();
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = capture(
        &mut engine,
        &tl,
        playback(),
        &ExportOpts::default(),
        &mut sink,
        &cancel,
    )
    .unwrap_err();
    assert!(matches!(err, StoryreelError::Cancelled));
    assert!(sink.was_aborted());
    assert!(!sink.is_finished());
}

struct FailingSink {
    fail_at: u64,
    aborted: bool,
}

impl FrameSink for FailingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> StoryreelResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, _frame: &FrameRGBA) -> StoryreelResult<()> {
        if idx.0 == self.fail_at {
            return Err(StoryreelError::validation("disk full"));
        }
        Ok(())
    }

    fn end(&mut self) -> StoryreelResult<()> {
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

#[test]
fn sink_failure_is_reported_as_capture_error() {
    let tl = timeline(&[1.0]);
    let mut engine = engine(&tl);
    let mut sink = FailingSink {
        fail_at: 3,
        aborted: false,
    };
    let err = capture(
        &mut engine,
        &tl,
        playback(),
        &ExportOpts::default(),
        &mut sink,
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, StoryreelError::Capture(ref m) if m.contains("disk full")));
    assert!(sink.aborted);
}

#[test]
fn capture_bus_holds_a_full_frame_period() {
    let slow = Fps { num: 1, den: 2 };
    assert!(capture_bus_frames(slow, 8000) >= 2 * 8000);
    assert_eq!(capture_bus_frames(Fps { num: 1, den: 1 }, 8000), 16_000);
}

#[test]
fn sub_one_fps_capture_keeps_all_audio() {
    let tl = timeline(&[3.0]);
    let mut engine = engine(&tl);
    let mut sink = InMemorySink::new();
    let opts = ExportOpts {
        fps: Fps { num: 1, den: 2 },
        ..ExportOpts::default()
    };
    let report = capture(
        &mut engine,
        &tl,
        playback(),
        &opts,
        &mut sink,
        &CancelToken::new(),
    )
    .unwrap();

    // stop = 3.5 s -> 2 frames at 0.5 fps, 2 s of audio pumped between them.
    assert_eq!(report.frames, 2);
    assert_eq!(report.audio_frames, 28_000);
    assert_eq!(sink.frames().len(), 2);
    assert_eq!(sink.audio().len(), 28_000 * 2);
    assert!(sink.is_finished());
}
