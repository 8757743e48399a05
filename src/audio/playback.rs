use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::audio::clock::{AudioClock, PositionCell};
use crate::audio::decode::MIX_SAMPLE_RATE;
use crate::audio::graph::{AudioGraph, AudioSink, CaptureBus, MusicTrack, Route, ScheduledVoice};
use crate::audio::timeline::Timeline;

/// Where playback audio is routed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Audible to the listener.
    #[default]
    Monitored,
    /// Recorded only, never audible.
    Silent,
}

impl From<PlaybackMode> for Route {
    fn from(mode: PlaybackMode) -> Self {
        match mode {
            PlaybackMode::Monitored => Route::Monitored,
            PlaybackMode::Silent => Route::Silent,
        }
    }
}

/// Options for [`PlaybackController::new`].
#[derive(Clone, Debug)]
pub struct PlaybackOpts {
    /// Narration multiplier applied at the mixing stage.
    pub narration_volume: f32,
    /// Optional looping music bed.
    pub music: Option<MusicTrack>,
    /// Mixing sample rate.
    pub sample_rate: u32,
}

impl Default for PlaybackOpts {
    fn default() -> Self {
        Self {
            narration_volume: 1.0,
            music: None,
            sample_rate: MIX_SAMPLE_RATE,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Transport {
    playing: bool,
    mode: PlaybackMode,
    anchor_clock: f64,
    anchor_offset: f64,
    paused_at: f64,
}

impl Transport {
    fn position(&self, now: f64) -> f64 {
        if self.playing {
            self.anchor_offset + (now - self.anchor_clock)
        } else {
            self.paused_at
        }
    }
}

struct Engine {
    graph: AudioGraph,
    transport: Transport,
}

struct Shared {
    engine: Mutex<Engine>,
    position: PositionCell,
}

/// Play/pause/seek transport over the audio graph.
///
/// The authoritative position is derived from the audio clock and republished through a
/// [`PositionCell`] that render code may poll without taking the graph lock.
pub struct PlaybackController {
    timeline: Arc<Timeline>,
    clock: Arc<dyn AudioClock>,
    shared: Arc<Shared>,
    driver: Option<AudioDriver>,
}

impl PlaybackController {
    /// Paused controller at position 0.
    pub fn new(timeline: Arc<Timeline>, clock: Arc<dyn AudioClock>, opts: PlaybackOpts) -> Self {
        let graph = AudioGraph::new(opts.sample_rate, opts.narration_volume, opts.music);
        Self {
            timeline,
            clock,
            shared: Arc::new(Shared {
                engine: Mutex::new(Engine {
                    graph,
                    transport: Transport::default(),
                }),
                position: PositionCell::new(0.0),
            }),
            driver: None,
        }
    }

    /// Timeline being played.
    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    /// Start playback from `offset` seconds.
    ///
    /// Anything already scheduled is stopped first. Segments ending at or before `offset` are
    /// skipped; the segment containing `offset` starts now with an intrinsic skip; later
    /// segments start `start - offset` seconds from now.
    pub fn play(&self, offset: f64, mode: PlaybackMode) {
        let now = self.clock.now();
        let mut engine = self.shared.engine.lock();
        self.play_locked(&mut engine, offset, mode, now);
    }

    fn play_locked(&self, engine: &mut Engine, offset: f64, mode: PlaybackMode, now: f64) {
        let offset = clamp_offset(offset);
        let Engine { graph, transport } = engine;

        if transport.playing {
            graph.stop_all();
        }
        let generation = graph.begin_generation();
        graph.set_route(mode.into());

        for (segment_index, seg) in self.timeline.segments().iter().enumerate() {
            if seg.end() <= offset {
                continue;
            }
            graph.schedule(
                ScheduledVoice {
                    segment_index,
                    start_at: now + (seg.start - offset).max(0.0),
                    skip: (offset - seg.start).max(0.0),
                    generation,
                },
                Arc::clone(&seg.pcm),
            );
        }
        graph.start_music(now, offset, generation);

        *transport = Transport {
            playing: true,
            mode,
            anchor_clock: now,
            anchor_offset: offset,
            paused_at: offset,
        };
        self.shared.position.store(offset);
        tracing::debug!(offset, ?mode, generation, "playback started");
    }

    /// Stop every voice and hold the current position. A no-op when already paused.
    pub fn pause(&self) -> f64 {
        let now = self.clock.now();
        let mut engine = self.shared.engine.lock();
        self.pause_locked(&mut engine, now)
    }

    fn pause_locked(&self, engine: &mut Engine, now: f64) -> f64 {
        let Engine { graph, transport } = engine;
        if !transport.playing {
            return transport.paused_at;
        }
        let position = transport.position(now);
        graph.render_until(now);
        graph.stop_all();
        transport.playing = false;
        transport.paused_at = position;
        self.shared.position.store(position);
        tracing::debug!(position, "playback paused");
        position
    }

    /// Move to `offset`, rescheduling when playing.
    ///
    /// The playing state is read and acted on under one lock, so a concurrent pause either
    /// lands before the seek (which then only moves the held position) or after it.
    pub fn seek(&self, offset: f64) {
        let now = self.clock.now();
        let mut engine = self.shared.engine.lock();
        if engine.transport.playing {
            let mode = engine.transport.mode;
            self.play_locked(&mut engine, offset, mode, now);
            return;
        }
        let offset = clamp_offset(offset);
        engine.transport.paused_at = offset;
        self.shared.position.store(offset);
    }

    /// Pause when playing, otherwise resume from the held position in `mode`.
    pub fn toggle(&self, mode: PlaybackMode) -> bool {
        let now = self.clock.now();
        let mut engine = self.shared.engine.lock();
        if engine.transport.playing {
            self.pause_locked(&mut engine, now);
            false
        } else {
            let at = engine.transport.paused_at;
            let at = if at >= self.timeline.total_duration() { 0.0 } else { at };
            self.play_locked(&mut engine, at, mode, now);
            true
        }
    }

    /// Whether voices are scheduled and the position is advancing.
    pub fn is_playing(&self) -> bool {
        self.shared.engine.lock().transport.playing
    }

    /// Routing of the current (or last) playback.
    pub fn mode(&self) -> PlaybackMode {
        self.shared.engine.lock().transport.mode
    }

    /// Current position from the audio clock; also republished to the position cell.
    pub fn position(&self) -> f64 {
        let now = self.clock.now();
        let position = self.shared.engine.lock().transport.position(now);
        self.shared.position.store(position);
        position
    }

    /// Last published position, without touching the graph lock.
    pub fn published_position(&self) -> f64 {
        self.shared.position.load()
    }

    /// Advance the graph to the current clock time. Returns frames rendered.
    pub fn pump(&self) -> usize {
        pump_shared(&self.shared, self.clock.as_ref())
    }

    /// Narration voices currently scheduled.
    pub fn scheduled(&self) -> Vec<ScheduledVoice> {
        self.shared.engine.lock().graph.scheduled()
    }

    /// Stop signals issued to the graph so far.
    pub fn stop_signals(&self) -> u64 {
        self.shared.engine.lock().graph.stop_signals()
    }

    /// Change the narration multiplier for subsequently rendered blocks.
    pub fn set_narration_volume(&self, volume: f32) {
        self.shared.engine.lock().graph.set_narration_gain(volume);
    }

    /// Install the listening device.
    pub fn set_monitor(&self, monitor: Option<Box<dyn AudioSink>>) {
        self.shared.engine.lock().graph.set_monitor(monitor);
    }

    /// Attach a capture bus to the graph.
    pub fn attach_capture(&self, bus: CaptureBus) {
        self.shared.engine.lock().graph.attach_capture(bus);
    }

    /// Detach the capture bus.
    pub fn take_capture(&self) -> Option<CaptureBus> {
        self.shared.engine.lock().graph.take_capture()
    }

    /// Samples captured since the last drain.
    pub fn drain_capture(&self) -> Vec<f32> {
        self.shared.engine.lock().graph.drain_capture()
    }

    /// Whether the attached capture bus dropped samples.
    pub fn capture_overflowed(&self) -> bool {
        self.shared.engine.lock().graph.capture_overflowed()
    }

    /// Run a driver thread that advances the graph every `block` of clock time.
    pub fn spawn_driver(&mut self, block: Duration) {
        if self.driver.is_some() {
            return;
        }
        self.driver = Some(AudioDriver::spawn(
            Arc::clone(&self.shared),
            Arc::clone(&self.clock),
            block,
        ));
    }
}

fn clamp_offset(offset: f64) -> f64 {
    if offset.is_finite() {
        offset.max(0.0)
    } else {
        0.0
    }
}

fn pump_shared(shared: &Shared, clock: &dyn AudioClock) -> usize {
    let now = clock.now();
    let mut engine = shared.engine.lock();
    let frames = engine.graph.render_until(now);
    shared.position.store(engine.transport.position(now));
    frames
}

/// Background thread rendering the audio graph in fixed blocks.
struct AudioDriver {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl AudioDriver {
    fn spawn(shared: Arc<Shared>, clock: Arc<dyn AudioClock>, block: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name("storyreel-audio".to_owned())
            .spawn(move || {
                while !stop_flag.load(Ordering::Acquire) {
                    pump_shared(&shared, clock.as_ref());
                    std::thread::sleep(block);
                }
            });
        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::warn!(error = %e, "failed to spawn audio driver; pump manually");
                None
            }
        };
        Self { stop, handle }
    }
}

impl Drop for AudioDriver {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/playback.rs"]
mod tests;
