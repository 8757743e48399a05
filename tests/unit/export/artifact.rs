use super::*;

#[test]
fn file_names_follow_kind() {
    assert_eq!(ExportKind::Video.file_name("s").unwrap(), "s.mp4");
    assert_eq!(ExportKind::Audio.file_name("s").unwrap(), "s.wav");
    assert_eq!(ExportKind::Script.file_name("s").unwrap(), "s_script.txt");
    assert_eq!(
        ExportKind::Thumbnail.file_name("s").unwrap(),
        "s_thumbnail.png"
    );
}

#[test]
fn bundle_is_rejected() {
    let err = ExportKind::Bundle.file_name("s").unwrap_err();
    assert!(matches!(err, StoryreelError::Validation(_)));
}

#[test]
fn kinds_parse_from_names_and_extensions() {
    assert_eq!("Video".parse::<ExportKind>().unwrap(), ExportKind::Video);
    assert_eq!("wav".parse::<ExportKind>().unwrap(), ExportKind::Audio);
    assert_eq!("zip".parse::<ExportKind>().unwrap(), ExportKind::Bundle);
    assert!("gif".parse::<ExportKind>().is_err());
    assert_eq!(ExportKind::Thumbnail.to_string(), "thumbnail");
}

#[test]
fn commit_moves_part_file_into_place() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out").join("story.txt");
    let pending = PendingArtifact::new(&target).unwrap();
    assert!(pending.path().to_string_lossy().ends_with("story.txt.part"));
    std::fs::write(pending.path(), b"hello").unwrap();

    let published = pending.commit().unwrap();
    assert_eq!(published, target);
    assert_eq!(std::fs::read(&target).unwrap(), b"hello");
    assert!(!dir.path().join("out").join("story.txt.part").exists());
}

#[test]
fn dropping_uncommitted_artifact_removes_part_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("story.wav");
    let part = {
        let pending = PendingArtifact::new(&target).unwrap();
        std::fs::write(pending.path(), b"partial").unwrap();
        pending.path().to_path_buf()
    };
    assert!(!part.exists());
    assert!(!target.exists());
}
