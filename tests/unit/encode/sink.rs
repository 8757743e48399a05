use super::*;

fn frame(v: u8) -> FrameRGBA {
    FrameRGBA {
        width: 2,
        height: 2,
        data: vec![v; 16],
        premultiplied: true,
    }
}

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 2,
        height: 2,
        fps: Fps::new(30, 1).unwrap(),
        audio: Some(AudioFormat {
            sample_rate: 48_000,
            channels: 2,
        }),
    }
}

#[test]
fn in_memory_sink_collects_frames_and_audio() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg()).unwrap();
    sink.push_frame(FrameIndex(0), &frame(1)).unwrap();
    sink.push_frame(FrameIndex(1), &frame(2)).unwrap();
    sink.push_audio(&[0.1, 0.2]).unwrap();
    sink.push_audio(&[0.3, 0.4]).unwrap();
    sink.end().unwrap();

    assert!(sink.is_finished());
    assert_eq!(sink.frames().len(), 2);
    assert_eq!(sink.frames()[1].1.data[0], 2);
    assert_eq!(sink.audio(), &[0.1, 0.2, 0.3, 0.4]);
    assert_eq!(sink.config().unwrap().fps.num, 30);
}

#[test]
fn in_memory_sink_rejects_out_of_order_frames() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg()).unwrap();
    sink.push_frame(FrameIndex(3), &frame(1)).unwrap();
    let err = sink.push_frame(FrameIndex(3), &frame(1)).unwrap_err();
    assert!(matches!(err, StoryreelError::Capture(_)));
}

#[test]
fn abort_discards_captured_data() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg()).unwrap();
    sink.push_frame(FrameIndex(0), &frame(1)).unwrap();
    sink.push_audio(&[0.5; 8]).unwrap();
    sink.abort();

    assert!(sink.was_aborted());
    assert!(!sink.is_finished());
    assert!(sink.frames().is_empty());
    assert!(sink.audio().is_empty());
}
