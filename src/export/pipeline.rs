use std::sync::Arc;
use std::sync::mpsc;

use crate::audio::clock::ManualClock;
use crate::audio::graph::{CaptureBus, OUTPUT_CHANNELS};
use crate::audio::playback::{PlaybackController, PlaybackMode, PlaybackOpts};
use crate::audio::timeline::Timeline;
use crate::encode::sink::{AudioFormat, FrameSink, SinkConfig};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::render::cpu::RenderEngine;
use crate::render::frame::FrameRGBA;

/// Capture frame rate for exports.
pub const EXPORT_FPS: u32 = 30;

/// Seconds captured past the end of the narration.
pub const SAFETY_MARGIN_SECS: f64 = 0.5;

/// Options for [`capture`].
#[derive(Clone, Debug)]
pub struct ExportOpts {
    /// Capture frame rate.
    pub fps: Fps,
    /// Extra seconds captured after the timeline ends.
    pub safety_margin: f64,
    /// Frames buffered between the render loop and the encoder thread.
    pub channel_capacity: usize,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self {
            fps: Fps {
                num: EXPORT_FPS,
                den: 1,
            },
            safety_margin: SAFETY_MARGIN_SECS,
            channel_capacity: 4,
        }
    }
}

/// Summary of a finished capture.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureReport {
    /// Frames delivered to the sink.
    pub frames: u64,
    /// Capture frame rate.
    pub fps: Fps,
    /// Timeline position at which capture stopped.
    pub stop_secs: f64,
    /// Stereo audio frames delivered to the sink.
    pub audio_frames: u64,
    /// Audio sample rate.
    pub sample_rate: u32,
}

impl CaptureReport {
    /// Seconds of video delivered.
    pub fn video_secs(&self) -> f64 {
        self.fps.frames_to_secs(self.frames)
    }

    /// Seconds of audio delivered.
    pub fn audio_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        (self.audio_frames as f64) / f64::from(self.sample_rate)
    }
}

/// Timeline position at which an export of `total_secs` stops.
pub fn capture_stop(total_secs: f64, safety_margin: f64) -> f64 {
    let total = if total_secs.is_finite() { total_secs.max(0.0) } else { 0.0 };
    let margin = if safety_margin.is_finite() { safety_margin.max(0.0) } else { 0.0 };
    total + margin
}

enum EncodeMsg {
    Frame(FrameIndex, FrameRGBA),
    Audio(Vec<f32>),
}

/// Capture the timeline into `sink`: silent playback from 0 on a virtual clock, one rendered
/// frame per tick, audio drained from the capture bus between frames.
///
/// Frames travel to an encoder thread through a bounded channel. Any failure aborts the sink
/// and is reported as [`StoryreelError::Capture`]; cancellation is reported as
/// [`StoryreelError::Cancelled`].
#[tracing::instrument(skip_all, fields(total = timeline.total_duration()))]
pub fn capture(
    engine: &mut RenderEngine,
    timeline: &Arc<Timeline>,
    playback: PlaybackOpts,
    opts: &ExportOpts,
    sink: &mut dyn FrameSink,
    cancel: &CancelToken,
) -> StoryreelResult<CaptureReport> {
    let stop = capture_stop(timeline.total_duration(), opts.safety_margin);
    let frames = opts.fps.secs_to_frames_ceil(stop).max(1);
    let sample_rate = playback.sample_rate;

    let clock = Arc::new(ManualClock::new());
    let controller = PlaybackController::new(Arc::clone(timeline), clock.clone(), playback);
    // Drained every frame: one frame period plus a second of headroom.
    controller.attach_capture(CaptureBus::with_frame_limit(capture_bus_frames(
        opts.fps,
        sample_rate,
    )));
    controller.play(0.0, PlaybackMode::Silent);

    let canvas = engine.canvas();
    let cfg = SinkConfig {
        width: canvas.width,
        height: canvas.height,
        fps: opts.fps,
        audio: Some(AudioFormat {
            sample_rate,
            channels: OUTPUT_CHANNELS,
        }),
    };
    tracing::debug!(frames, stop, "capture started");

    std::thread::scope(|scope| -> StoryreelResult<CaptureReport> {
        let (tx, rx) = mpsc::sync_channel::<EncodeMsg>(opts.channel_capacity.max(1));
        let sink_ref: &mut dyn FrameSink = sink;

        let enc = scope.spawn(move || -> StoryreelResult<()> {
            let res = encode_all(&mut *sink_ref, cfg, rx, frames);
            if res.is_err() {
                sink_ref.abort();
            }
            res
        });

        let produced = produce(
            engine,
            &controller,
            &clock,
            ProduceRange {
                fps: opts.fps,
                frames,
                stop,
            },
            &tx,
            cancel,
        );

        drop(tx);
        let enc_res = enc
            .join()
            .map_err(|_| StoryreelError::capture("encoder thread panicked"))?;

        match (produced, enc_res) {
            (Err(ProduceError::Failed(StoryreelError::Cancelled)), _) => {
                tracing::debug!("capture cancelled");
                Err(StoryreelError::Cancelled)
            }
            (Err(ProduceError::Failed(e)), _) => Err(into_capture(e)),
            (Err(ProduceError::EncoderGone) | Ok(_), Err(e)) => Err(into_capture(e)),
            (Err(ProduceError::EncoderGone), Ok(())) => Err(StoryreelError::capture(
                "encoder thread stopped accepting frames",
            )),
            (Ok(audio_frames), Ok(())) => {
                let report = CaptureReport {
                    frames,
                    fps: opts.fps,
                    stop_secs: stop,
                    audio_frames,
                    sample_rate,
                };
                tracing::info!(
                    frames,
                    video_secs = report.video_secs(),
                    audio_secs = report.audio_secs(),
                    "capture finished"
                );
                Ok(report)
            }
        }
    })
}

/// Stereo frames the capture bus may hold between two drains.
fn capture_bus_frames(fps: Fps, sample_rate: u32) -> usize {
    ((fps.frame_duration_secs() + 1.0) * f64::from(sample_rate)).ceil() as usize
}

/// Why the render loop stopped early.
enum ProduceError {
    /// The encoder thread hung up; its own result carries the cause.
    EncoderGone,
    /// The render loop itself failed.
    Failed(StoryreelError),
}

impl From<StoryreelError> for ProduceError {
    fn from(e: StoryreelError) -> Self {
        Self::Failed(e)
    }
}

#[derive(Clone, Copy)]
struct ProduceRange {
    fps: Fps,
    frames: u64,
    stop: f64,
}

/// Render loop on the calling thread. Returns the stereo audio frames forwarded.
fn produce(
    engine: &mut RenderEngine,
    controller: &PlaybackController,
    clock: &ManualClock,
    range: ProduceRange,
    tx: &mpsc::SyncSender<EncodeMsg>,
    cancel: &CancelToken,
) -> Result<u64, ProduceError> {
    let mut audio_frames = 0u64;
    for f in 0..range.frames {
        cancel.check()?;
        let t = range.fps.frames_to_secs(f);
        clock.set(t);
        controller.pump();
        let frame = engine.render_frame(controller.published_position(), t);
        audio_frames += forward_audio(controller, tx)?;
        send(tx, EncodeMsg::Frame(FrameIndex(f), frame))?;
    }
    clock.set(range.stop);
    controller.pump();
    audio_frames += forward_audio(controller, tx)?;
    controller.pause();
    Ok(audio_frames)
}

fn forward_audio(
    controller: &PlaybackController,
    tx: &mpsc::SyncSender<EncodeMsg>,
) -> Result<u64, ProduceError> {
    if controller.capture_overflowed() {
        return Err(StoryreelError::capture("audio capture bus overflowed").into());
    }
    let audio = controller.drain_capture();
    if audio.is_empty() {
        return Ok(0);
    }
    let frames = (audio.len() / usize::from(OUTPUT_CHANNELS)) as u64;
    send(tx, EncodeMsg::Audio(audio))?;
    Ok(frames)
}

fn send(tx: &mpsc::SyncSender<EncodeMsg>, msg: EncodeMsg) -> Result<(), ProduceError> {
    tx.send(msg).map_err(|_| ProduceError::EncoderGone)
}

fn encode_all(
    sink: &mut dyn FrameSink,
    cfg: SinkConfig,
    rx: mpsc::Receiver<EncodeMsg>,
    expected_frames: u64,
) -> StoryreelResult<()> {
    sink.begin(cfg)?;
    let mut pushed = 0u64;
    for msg in rx {
        match msg {
            EncodeMsg::Frame(idx, frame) => {
                sink.push_frame(idx, &frame)?;
                pushed += 1;
            }
            EncodeMsg::Audio(samples) => sink.push_audio(&samples)?,
        }
    }
    if pushed != expected_frames {
        return Err(StoryreelError::capture(format!(
            "capture stopped after {pushed} of {expected_frames} frames"
        )));
    }
    sink.end()
}

fn into_capture(e: StoryreelError) -> StoryreelError {
    match e {
        StoryreelError::Capture(_) | StoryreelError::Cancelled => e,
        other => StoryreelError::capture(other.to_string()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/pipeline.rs"]
mod tests;
