use super::*;

use base64::Engine as _;

fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut w = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for s in samples {
            w.write_sample(*s).unwrap();
        }
        w.finalize().unwrap();
    }
    cursor.into_inner()
}

#[test]
fn strict_wav_keeps_container_rate_and_channels() {
    let bytes = wav_bytes(44_100, 2, &[0, 16384, -16384, 0]);
    let pcm = decode_narration(&bytes, NarrationEncoding::Auto).unwrap();
    assert_eq!(pcm.sample_rate, 44_100);
    assert_eq!(pcm.channels, 2);
    assert_eq!(pcm.frames(), 2);
    assert!((pcm.interleaved_f32[1] - 0.5).abs() < 1e-6);
    assert!((pcm.interleaved_f32[2] + 0.5).abs() < 1e-6);
}

#[test]
fn headerless_pcm_falls_back_to_narration_rate_mono() {
    let samples: Vec<u8> = (0..24_000i32)
        .flat_map(|i| ((i % 200) as i16 - 100).to_le_bytes())
        .collect();
    let pcm = decode_narration(&samples, NarrationEncoding::Wav).unwrap();
    assert_eq!(pcm.sample_rate, NARRATION_SAMPLE_RATE);
    assert_eq!(pcm.channels, 1);
    assert!((pcm.duration_secs() - 1.0).abs() < 1e-12);
}

#[test]
fn odd_trailing_byte_is_dropped() {
    let pcm = decode_pcm16_le(&[0x00, 0x40, 0x7f], 24_000, 1);
    assert_eq!(pcm.interleaved_f32, vec![0.5]);
}

#[test]
fn declared_raw_pcm_skips_container_parse() {
    let bytes = wav_bytes(48_000, 1, &[1000; 64]);
    let pcm = decode_narration(&bytes, NarrationEncoding::RawPcm16).unwrap();
    assert_eq!(pcm.sample_rate, NARRATION_SAMPLE_RATE);
    assert_eq!(pcm.frames(), bytes.len() / 2);
}

#[test]
fn empty_or_single_byte_input_is_decode_error() {
    for bytes in [&[][..], &[0x12][..]] {
        let err = decode_narration(bytes, NarrationEncoding::Auto).unwrap_err();
        assert!(matches!(err, StoryreelError::Decode(_)), "{err}");
    }
}

#[test]
fn base64_wrapped_wav_and_pcm_decode() {
    let wav = wav_bytes(22_050, 1, &[0, 100, 200, 300]);
    let mut text = base64::engine::general_purpose::STANDARD.encode(&wav);
    text.insert(10, '\n');
    let pcm = decode_narration(text.as_bytes(), NarrationEncoding::Base64Wav).unwrap();
    assert_eq!(pcm.sample_rate, 22_050);
    assert_eq!(pcm.frames(), 4);

    let raw = base64::engine::general_purpose::STANDARD.encode([0u8, 0x40, 0, 0xc0]);
    let pcm = decode_narration(raw.as_bytes(), NarrationEncoding::Base64Pcm16).unwrap();
    assert_eq!(pcm.interleaved_f32, vec![0.5, -0.5]);
}

#[test]
fn invalid_base64_is_decode_error() {
    let err = decode_narration(b"***not base64***", NarrationEncoding::Base64Pcm16).unwrap_err();
    assert!(matches!(err, StoryreelError::Decode(_)));
}

#[test]
fn float_wav_with_nan_is_rejected_by_strict_path() {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut w = hound::WavWriter::new(&mut cursor, spec).unwrap();
        w.write_sample(0.25f32).unwrap();
        w.write_sample(f32::NAN).unwrap();
        w.finalize().unwrap();
    }
    let bytes = cursor.into_inner();
    assert!(decode_wav(&bytes).is_err());
    // Header bytes still reinterpret as finite PCM16, so the fallback wins.
    let pcm = decode_narration(&bytes, NarrationEncoding::Auto).unwrap();
    assert_eq!(pcm.sample_rate, NARRATION_SAMPLE_RATE);
}
