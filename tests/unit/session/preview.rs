use super::*;

use std::sync::Arc;

use crate::audio::clock::ManualClock;
use crate::audio::decode::AudioPcm;
use crate::audio::timeline::Timeline;
use crate::foundation::core::Canvas;
use crate::render::cpu::RenderOpts;
use crate::scene::model::{Project, Scene, SceneId};
use crate::session::story::SessionOpts;

fn session(clock: Arc<ManualClock>) -> StorySession {
    let mut project = Project::new("t", vec![Scene::new("a", "one two"), Scene::new("b", "three")]);
    project.subtitles.visible = false;
    let timeline = Timeline::from_decoded(["a", "b"].into_iter().map(|id| {
        (
            SceneId(id.to_owned()),
            AudioPcm {
                sample_rate: 1000,
                channels: 1,
                interleaved_f32: vec![0.0; 1000],
            },
        )
    }));
    let opts = SessionOpts {
        render: RenderOpts {
            canvas: Some(Canvas {
                width: 16,
                height: 16,
            }),
            ..RenderOpts::default()
        },
        driver_block: None,
        ..SessionOpts::default()
    };
    StorySession::new(project, ".", timeline, clock, opts)
}

#[test]
fn tick_follows_published_position() {
    let clock = Arc::new(ManualClock::new());
    let s = session(clock.clone());
    let preview = PreviewLoop::new(&s, PlaybackMode::Silent);

    assert!(preview.toggle().unwrap());
    clock.set(1.25);
    s.playback().pump();
    let tick = preview.tick_at(0.0);
    assert!((tick.position - 1.25).abs() < 1e-9);
    assert!(!tick.ended);
    assert_eq!(tick.status, "00:01 / 00:02");
    assert_eq!((tick.frame.width, tick.frame.height), (16, 16));
}

#[test]
fn reaching_the_end_pauses_and_holds_the_last_position() {
    let clock = Arc::new(ManualClock::new());
    let s = session(clock.clone());
    let preview = PreviewLoop::new(&s, PlaybackMode::Silent);
    preview.toggle().unwrap();

    clock.set(2.4);
    s.playback().pump();
    let tick = preview.tick_at(0.0);
    assert!(tick.ended);
    assert_eq!(tick.position, 2.0);
    assert!(!preview.is_playing());
    assert_eq!(s.playback().position(), 2.0);

    // Toggling at the end restarts from the beginning.
    assert!(preview.toggle().unwrap());
    assert_eq!(s.playback().published_position(), 0.0);
}

#[test]
fn toggle_pauses_a_running_preview() {
    let clock = Arc::new(ManualClock::new());
    let s = session(clock.clone());
    let preview = PreviewLoop::new(&s, PlaybackMode::Silent);
    assert!(preview.toggle().unwrap());
    clock.set(0.5);
    assert!(!preview.toggle().unwrap());
    let tick = preview.tick_at(0.0);
    assert!((tick.position - 0.5).abs() < 1e-9);
    assert!(!tick.ended);
}
