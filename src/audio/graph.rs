use std::sync::Arc;

use crate::audio::decode::AudioPcm;
use crate::audio::mix::sample_stereo;

/// Channel count of every bus in the graph.
pub const OUTPUT_CHANNELS: u16 = 2;

/// Consumer of rendered interleaved blocks (the listening device).
pub trait AudioSink: Send {
    /// Receive one rendered block.
    fn write_block(&mut self, interleaved: &[f32], sample_rate: u32, channels: u16);
}

/// Which outputs receive the mix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Route {
    /// Listening device and, when attached, the capture bus.
    #[default]
    Monitored,
    /// Capture bus only.
    Silent,
}

/// Looping background music under the narration.
#[derive(Clone, Debug)]
pub struct MusicTrack {
    /// Decoded music.
    pub pcm: Arc<AudioPcm>,
    /// Linear gain for the bed.
    pub volume: f32,
}

/// Inspectable description of one scheduled narration voice.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledVoice {
    /// Timeline segment being played.
    pub segment_index: usize,
    /// Clock time at which the voice becomes audible.
    pub start_at: f64,
    /// Seconds skipped into the segment's own buffer.
    pub skip: f64,
    /// Schedule generation that created the voice.
    pub generation: u64,
}

struct Voice {
    info: ScheduledVoice,
    pcm: Arc<AudioPcm>,
    start_sample: u64,
}

struct MusicVoice {
    start_sample: u64,
    offset_secs: f64,
    generation: u64,
}

/// Silent recording bus. Optionally bounded; overflowing marks the capture as failed.
#[derive(Debug, Default)]
pub struct CaptureBus {
    samples: Vec<f32>,
    limit: Option<usize>,
    overflowed: bool,
}

impl CaptureBus {
    /// Unbounded bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus holding at most `max_frames` stereo frames.
    pub fn with_frame_limit(max_frames: usize) -> Self {
        Self {
            limit: Some(max_frames * usize::from(OUTPUT_CHANNELS)),
            ..Self::default()
        }
    }

    /// Captured stereo frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(OUTPUT_CHANNELS)
    }

    /// Whether writes were dropped because the bound was reached.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Interleaved stereo samples captured so far.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Consume the bus.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Take the samples captured so far, freeing room under the bound.
    pub fn drain(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.samples)
    }

    fn push(&mut self, block: &[f32]) {
        let room = match self.limit {
            Some(limit) => limit.saturating_sub(self.samples.len()),
            None => block.len(),
        };
        if room < block.len() {
            self.overflowed = true;
        }
        self.samples.extend_from_slice(&block[..room.min(block.len())]);
    }
}

/// Scheduled narration voices and the music bed, rendered in blocks against the audio clock.
///
/// Sample `n` of every bus corresponds to clock time `n / sample_rate`.
pub struct AudioGraph {
    sample_rate: u32,
    narration_gain: f32,
    music: Option<MusicTrack>,
    voices: Vec<Voice>,
    music_voice: Option<MusicVoice>,
    generation: u64,
    route: Route,
    cursor: u64,
    monitor: Option<Box<dyn AudioSink>>,
    capture: Option<CaptureBus>,
    stop_signals: u64,
    scratch: Vec<f32>,
}

impl AudioGraph {
    /// Empty graph mixing at `sample_rate`.
    pub fn new(sample_rate: u32, narration_gain: f32, music: Option<MusicTrack>) -> Self {
        Self {
            sample_rate,
            narration_gain,
            music,
            voices: Vec::new(),
            music_voice: None,
            generation: 0,
            route: Route::default(),
            cursor: 0,
            monitor: None,
            capture: None,
            stop_signals: 0,
            scratch: Vec::new(),
        }
    }

    /// Mixing sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Narration multiplier applied once to the summed narration voices.
    pub fn set_narration_gain(&mut self, gain: f32) {
        self.narration_gain = gain;
    }

    /// Install or remove the listening device.
    pub fn set_monitor(&mut self, monitor: Option<Box<dyn AudioSink>>) {
        self.monitor = monitor;
    }

    /// Attach a capture bus; subsequent blocks are recorded into it.
    pub fn attach_capture(&mut self, bus: CaptureBus) {
        self.capture = Some(bus);
    }

    /// Detach and return the capture bus.
    pub fn take_capture(&mut self) -> Option<CaptureBus> {
        self.capture.take()
    }

    /// Samples captured since the last drain; empty when no bus is attached.
    pub fn drain_capture(&mut self) -> Vec<f32> {
        self.capture.as_mut().map(CaptureBus::drain).unwrap_or_default()
    }

    /// Whether an attached capture bus has overflowed.
    pub fn capture_overflowed(&self) -> bool {
        self.capture.as_ref().is_some_and(CaptureBus::overflowed)
    }

    /// Select outputs for subsequent blocks.
    pub fn set_route(&mut self, route: Route) {
        self.route = route;
    }

    /// Current routing.
    pub fn route(&self) -> Route {
        self.route
    }

    /// Current schedule generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new schedule generation. Voices from older generations become inaudible.
    pub fn begin_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Queue a narration voice.
    pub fn schedule(&mut self, info: ScheduledVoice, pcm: Arc<AudioPcm>) {
        let start_sample = self.clock_to_sample(info.start_at);
        self.voices.push(Voice {
            info,
            pcm,
            start_sample,
        });
    }

    /// Start the music bed at clock time `at`, positioned `offset` seconds into the timeline.
    pub fn start_music(&mut self, at: f64, offset: f64, generation: u64) {
        if self.music.is_none() {
            return;
        }
        self.music_voice = Some(MusicVoice {
            start_sample: self.clock_to_sample(at),
            offset_secs: offset.max(0.0),
            generation,
        });
    }

    /// Immediately silence every voice. Returns the number of stop signals issued.
    pub fn stop_all(&mut self) -> usize {
        let stopped = self.voices.len() + usize::from(self.music_voice.is_some());
        self.voices.clear();
        self.music_voice = None;
        self.stop_signals += stopped as u64;
        stopped
    }

    /// Total stop signals issued since construction.
    pub fn stop_signals(&self) -> u64 {
        self.stop_signals
    }

    /// Voices still waiting or playing, in scheduling order.
    pub fn scheduled(&self) -> Vec<ScheduledVoice> {
        self.voices.iter().map(|v| v.info.clone()).collect()
    }

    /// Clock time up to which output has been rendered.
    pub fn rendered_until(&self) -> f64 {
        (self.cursor as f64) / f64::from(self.sample_rate)
    }

    /// Render every sample up to `clock_time` and deliver it to the routed outputs.
    ///
    /// Returns the number of frames rendered.
    pub fn render_until(&mut self, clock_time: f64) -> usize {
        let target = self.clock_to_sample(clock_time);
        if target <= self.cursor {
            return 0;
        }
        let frames = (target - self.cursor) as usize;
        let channels = usize::from(OUTPUT_CHANNELS);
        let mut block = std::mem::take(&mut self.scratch);
        block.clear();
        block.resize(frames * channels, 0.0);

        let current = self.generation;
        self.voices.retain(|v| {
            let live = v.info.generation == current;
            if !live {
                tracing::trace!(
                    segment = v.info.segment_index,
                    generation = v.info.generation,
                    current,
                    "dropping stale voice"
                );
            }
            live
        });

        let (cursor, sr) = (self.cursor, self.sample_rate);
        self.voices.retain(|v| !mix_voice(&mut block, cursor, sr, v));

        if self.narration_gain != 1.0 {
            for s in &mut block {
                *s *= self.narration_gain;
            }
        }

        if self
            .music_voice
            .as_ref()
            .is_some_and(|mv| mv.generation != current)
        {
            tracing::trace!(current, "dropping stale music voice");
            self.music_voice = None;
        }
        if let (Some(track), Some(mv)) = (&self.music, &self.music_voice) {
            mix_music(&mut block, cursor, sr, track, mv);
        }

        for s in &mut block {
            *s = s.clamp(-1.0, 1.0);
        }

        if self.route == Route::Monitored
            && let Some(monitor) = self.monitor.as_mut()
        {
            monitor.write_block(&block, sr, OUTPUT_CHANNELS);
        }
        if let Some(bus) = self.capture.as_mut() {
            bus.push(&block);
        }

        self.cursor = target;
        self.scratch = block;
        frames
    }

    fn clock_to_sample(&self, t: f64) -> u64 {
        if !t.is_finite() || t <= 0.0 {
            return 0;
        }
        (t * f64::from(self.sample_rate)).round() as u64
    }
}

/// Mix one voice into `block`. Returns `true` once the voice has played to its end.
fn mix_voice(block: &mut [f32], cursor: u64, sample_rate: u32, voice: &Voice) -> bool {
    let frames = block.len() / usize::from(OUTPUT_CHANNELS);
    for i in 0..frames {
        let n = cursor + i as u64;
        if n < voice.start_sample {
            continue;
        }
        let rel = ((n - voice.start_sample) as f64) / f64::from(sample_rate);
        let Some((l, r)) = sample_stereo(&voice.pcm, voice.info.skip + rel) else {
            return true;
        };
        block[i * 2] += l;
        block[i * 2 + 1] += r;
    }
    false
}

fn mix_music(block: &mut [f32], cursor: u64, sample_rate: u32, track: &MusicTrack, mv: &MusicVoice) {
    let len = track.pcm.duration_secs();
    if len <= 0.0 {
        return;
    }
    let frames = block.len() / usize::from(OUTPUT_CHANNELS);
    for i in 0..frames {
        let n = cursor + i as u64;
        if n < mv.start_sample {
            continue;
        }
        let rel = ((n - mv.start_sample) as f64) / f64::from(sample_rate);
        let src = (mv.offset_secs + rel) % len;
        if let Some((l, r)) = sample_stereo(&track.pcm, src) {
            block[i * 2] += l * track.volume;
            block[i * 2 + 1] += r * track.volume;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/graph.rs"]
mod tests;
