use std::io::Cursor;

use base64::Engine as _;

use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Fixed output rate of the narration service for headerless PCM.
pub const NARRATION_SAMPLE_RATE: u32 = 24_000;

/// Internal mixing sample rate used by the audio graph and all exports.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Declared encoding of narration bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrationEncoding {
    /// Container if it parses, headerless PCM otherwise.
    #[default]
    Auto,
    /// RIFF/WAVE container.
    Wav,
    /// Headerless signed 16-bit little-endian mono PCM at [`NARRATION_SAMPLE_RATE`].
    RawPcm16,
    /// Base64 text wrapping a RIFF/WAVE container.
    Base64Wav,
    /// Base64 text wrapping headerless 16-bit PCM.
    Base64Pcm16,
}

#[derive(Clone, Debug, PartialEq)]
/// Decoded interleaved floating-point PCM.
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    /// Intrinsic duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        (self.frames() as f64) / f64::from(self.sample_rate)
    }

    fn check_usable(&self) -> Result<(), String> {
        if self.sample_rate == 0 || self.channels == 0 {
            return Err("zero sample rate or channel count".to_owned());
        }
        if self.frames() == 0 {
            return Err("zero-length sample data".to_owned());
        }
        if self.interleaved_f32.iter().any(|s| !s.is_finite()) {
            return Err("non-finite sample data".to_owned());
        }
        Ok(())
    }
}

/// Decode narration bytes into a uniform sample buffer.
///
/// Strict container decoding is attempted first. When it fails, the bytes are reinterpreted as
/// headerless 16-bit PCM at [`NARRATION_SAMPLE_RATE`], since some synthesis backends return raw
/// PCM that container parsers reject. Only when both interpretations yield no usable samples is a
/// [`StoryreelError::Decode`] returned.
pub fn decode_narration(bytes: &[u8], encoding: NarrationEncoding) -> StoryreelResult<AudioPcm> {
    let unwrapped;
    let (bytes, encoding) = match encoding {
        NarrationEncoding::Base64Wav => {
            unwrapped = decode_base64(bytes)?;
            (unwrapped.as_slice(), NarrationEncoding::Wav)
        }
        NarrationEncoding::Base64Pcm16 => {
            unwrapped = decode_base64(bytes)?;
            (unwrapped.as_slice(), NarrationEncoding::RawPcm16)
        }
        other => (bytes, other),
    };

    let strict_err = match encoding {
        NarrationEncoding::RawPcm16 => "declared headerless".to_owned(),
        _ => match decode_wav(bytes) {
            Ok(pcm) => return Ok(pcm),
            Err(e) => e.to_string(),
        },
    };

    let fallback = decode_pcm16_le(bytes, NARRATION_SAMPLE_RATE, 1);
    match fallback.check_usable() {
        Ok(()) => {
            tracing::debug!(
                strict = %strict_err,
                frames = fallback.frames(),
                "narration decoded as headerless pcm16"
            );
            Ok(fallback)
        }
        Err(fallback_err) => Err(StoryreelError::decode(format!(
            "narration audio unusable (container: {strict_err}; raw pcm16: {fallback_err})"
        ))),
    }
}

/// Strictly decode a RIFF/WAVE container (integer PCM up to 32 bits, or 32-bit float).
pub fn decode_wav(bytes: &[u8]) -> StoryreelResult<AudioPcm> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| StoryreelError::decode(format!("wav header: {e}")))?;
    let spec = reader.spec();

    let interleaved_f32: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| StoryreelError::decode(format!("wav float samples: {e}")))?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(StoryreelError::decode(format!(
                    "unsupported wav bit depth {}",
                    spec.bits_per_sample
                )));
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(|e| StoryreelError::decode(format!("wav int samples: {e}")))?
        }
    };

    let pcm = AudioPcm {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        interleaved_f32,
    };
    pcm.check_usable().map_err(StoryreelError::decode)?;
    Ok(pcm)
}

/// Reinterpret bytes as signed 16-bit little-endian PCM. An odd trailing byte is dropped.
pub fn decode_pcm16_le(bytes: &[u8], sample_rate: u32, channels: u16) -> AudioPcm {
    let interleaved_f32 = bytes
        .chunks_exact(2)
        .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / 32768.0)
        .collect();
    AudioPcm {
        sample_rate,
        channels,
        interleaved_f32,
    }
}

fn decode_base64(bytes: &[u8]) -> StoryreelResult<Vec<u8>> {
    let compact: Vec<u8> = bytes
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(&compact)
        .map_err(|e| StoryreelError::decode(format!("invalid base64 narration: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/audio/decode.rs"]
mod tests;
