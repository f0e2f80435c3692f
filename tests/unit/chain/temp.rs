use super::*;

#[test]
fn names_follow_kind_stem_and_segment() {
    let names = TempNames::for_output(Path::new("out/episode.mov"));
    assert_eq!(
        names.path(MediaKind::Video, 3),
        Path::new("out/temp_video_episode_003.mov")
    );
    assert_eq!(
        names.path(MediaKind::Frame, 12),
        Path::new("out/temp_frame_episode_012.jpg")
    );
    let bare = TempNames::for_output(Path::new("podcast.mp4"));
    assert_eq!(
        bare.path(MediaKind::Audio, 0),
        Path::new("temp_audio_podcast_000.wav")
    );
}

#[test]
fn cleanup_removes_files_and_skips_missing_ones() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("temp_frame_x_001.jpg");
    std::fs::write(&present, b"jpg").unwrap();

    let mut artifacts = TempArtifacts::new();
    artifacts.push(present.clone());
    artifacts.push(present.clone());
    artifacts.push(dir.path().join("never_written.mov"));
    assert_eq!(artifacts.paths().len(), 2);

    assert_eq!(artifacts.cleanup(), 1);
    assert!(!present.exists());
    assert!(artifacts.paths().is_empty());
}
