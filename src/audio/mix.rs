use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::audio::clock::ManualClock;
use crate::audio::decode::AudioPcm;
use crate::audio::graph::{CaptureBus, MusicTrack};
use crate::audio::playback::{PlaybackController, PlaybackMode, PlaybackOpts};
use crate::audio::timeline::Timeline;
use crate::foundation::error::StoryreelResult;

/// Linearly interpolated stereo frame of `pcm` at `src_sec`, or `None` past the end.
///
/// Mono sources are duplicated to both channels; channels beyond the second are ignored.
pub(crate) fn sample_stereo(pcm: &AudioPcm, src_sec: f64) -> Option<(f32, f32)> {
    let channels = usize::from(pcm.channels);
    let src_frames = pcm.frames();
    if src_frames == 0 {
        return None;
    }
    let src_pos = src_sec * f64::from(pcm.sample_rate);
    if !src_pos.is_finite() || src_pos < 0.0 {
        return None;
    }
    let f0 = src_pos.floor() as usize;
    if f0 >= src_frames {
        return None;
    }
    let f1 = (f0 + 1).min(src_frames - 1);
    let frac = (src_pos - f0 as f64) as f32;
    let src = &pcm.interleaved_f32;

    let lerp_at = |c: usize| {
        let v0 = src[f0 * channels + c];
        let v1 = src[f1 * channels + c];
        v0 + (v1 - v0) * frac
    };
    if channels == 1 {
        let v = lerp_at(0);
        Some((v, v))
    } else {
        Some((lerp_at(0), lerp_at(1)))
    }
}

/// Render the full narration + music mix offline, exactly as an export would capture it.
pub fn mixdown(timeline: &Arc<Timeline>, narration_volume: f32, music: Option<MusicTrack>) -> Vec<f32> {
    let clock = Arc::new(ManualClock::new());
    let controller = PlaybackController::new(
        Arc::clone(timeline),
        clock.clone(),
        PlaybackOpts {
            narration_volume,
            music,
            ..PlaybackOpts::default()
        },
    );
    controller.attach_capture(CaptureBus::new());
    controller.play(0.0, PlaybackMode::Silent);
    clock.set(timeline.total_duration());
    controller.pump();
    controller.pause();
    controller
        .take_capture()
        .map(CaptureBus::into_samples)
        .unwrap_or_default()
}

/// Write interleaved `f32` PCM as a 16-bit integer WAV file.
pub fn write_wav_16(
    path: &Path,
    samples_interleaved: &[f32],
    sample_rate: u32,
    channels: u16,
) -> StoryreelResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create audio output directory '{}'", parent.display()))?;
    }
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("create wav '{}'", path.display()))?;
    for &s in samples_interleaved {
        let v = (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16;
        writer.write_sample(v).context("write wav sample")?;
    }
    writer.finalize().context("finalize wav")?;
    Ok(())
}

/// Write interleaved `f32` PCM samples to a raw little-endian `.f32le` file.
pub(crate) fn write_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> StoryreelResult<()> {
    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes)
        .with_context(|| format!("write mixed audio '{}'", out_path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
