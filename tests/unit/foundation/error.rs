use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        StoryreelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(StoryreelError::decode("x").to_string().contains("decode error:"));
    assert!(
        StoryreelError::capture("x")
            .to_string()
            .contains("capture error:")
    );
    assert!(
        StoryreelError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn timeline_build_reports_scene_and_source() {
    let err = StoryreelError::timeline_build(2, "scene-c", StoryreelError::decode("empty pcm"));
    assert_eq!(err.failing_scene(), Some(2));
    let msg = err.to_string();
    assert!(msg.contains("scene 2"));
    assert!(msg.contains("scene-c"));
    assert!(msg.contains("empty pcm"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = StoryreelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert_eq!(err.failing_scene(), None);
}
