use super::*;

fn req<'a>(id: &'a SceneId) -> NarrationRequest<'a> {
    NarrationRequest {
        scene_id: id,
        script: "hello there",
        language: "en",
        voice: "Fenrir",
    }
}

#[test]
fn dir_source_prefers_wav_then_pcm() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("s1.pcm"), [0u8, 1, 2, 3]).unwrap();
    std::fs::write(dir.path().join("s2.wav"), b"RIFF....").unwrap();
    std::fs::write(dir.path().join("s2.pcm"), [9u8, 9]).unwrap();
    let src = DirNarrationSource::new(dir.path());

    let a = src.synthesize(&req(&SceneId("s1".into()))).unwrap();
    assert_eq!(a.encoding, NarrationEncoding::RawPcm16);
    assert_eq!(a.bytes, vec![0, 1, 2, 3]);

    let b = src.synthesize(&req(&SceneId("s2".into()))).unwrap();
    assert_eq!(b.encoding, NarrationEncoding::Wav);
}

#[test]
fn dir_source_detects_wrapped_container() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.b64"), "  UklGRiQAAABXQVZF").unwrap();
    std::fs::write(dir.path().join("b.b64"), "AAAAQA==").unwrap();
    let src = DirNarrationSource::new(dir.path());
    assert_eq!(
        src.synthesize(&req(&SceneId("a".into()))).unwrap().encoding,
        NarrationEncoding::Base64Wav
    );
    assert_eq!(
        src.synthesize(&req(&SceneId("b".into()))).unwrap().encoding,
        NarrationEncoding::Base64Pcm16
    );
}

#[test]
fn dir_source_missing_scene_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let src = DirNarrationSource::new(dir.path());
    assert!(src.synthesize(&req(&SceneId("nope".into()))).is_err());
}

#[test]
fn fn_source_forwards_request() {
    let src = FnNarrationSource(|r: &NarrationRequest<'_>| {
        Ok(NarrationAudio {
            bytes: r.voice.as_bytes().to_vec(),
            encoding: NarrationEncoding::RawPcm16,
        })
    });
    let out = src.synthesize(&req(&SceneId("x".into()))).unwrap();
    assert_eq!(out.bytes, b"Fenrir".to_vec());
}
