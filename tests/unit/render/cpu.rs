use super::*;

use crate::audio::decode::AudioPcm;
use crate::foundation::core::AspectRatio;
use crate::scene::model::VisualEffect;
use crate::scene::style::SubtitleAnimation;

fn png(path: &Path, w: u32, h: u32, rgba: [u8; 4]) {
    image::RgbaImage::from_pixel(w, h, image::Rgba(rgba))
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

fn timeline(durations: &[f64]) -> Arc<Timeline> {
    Arc::new(Timeline::from_decoded(durations.iter().enumerate().map(
        |(i, d)| {
            (
                SceneId(format!("s{i}")),
                AudioPcm {
                    sample_rate: 100,
                    channels: 1,
                    interleaved_f32: vec![0.0; (d * 100.0) as usize],
                },
            )
        },
    )))
}

fn project(scenes: Vec<Scene>) -> Project {
    let mut p = Project::new("t", scenes);
    p.aspect_ratio = AspectRatio::Square;
    p.subtitles.visible = false;
    p
}

#[test]
fn frame_has_canvas_size_and_shows_active_scene_image() {
    let dir = tempfile::tempdir().unwrap();
    png(&dir.path().join("red.png"), 8, 8, [255, 0, 0, 255]);
    png(&dir.path().join("blue.png"), 8, 8, [0, 0, 255, 255]);
    let p = project(vec![
        Scene::new("s0", "a b").with_media("red.png"),
        Scene::new("s1", "c d").with_media("blue.png"),
    ]);
    let mut engine = RenderEngine::new(&p, dir.path(), timeline(&[1.0, 1.0]), RenderOpts::default());
    engine.preload();

    let f = engine.render_frame(0.5, 0.0);
    assert_eq!((f.width, f.height), (1080, 1080));
    assert_eq!(f.data.len(), 1080 * 1080 * 4);
    assert_eq!(f.pixel(540, 540), Some([255, 0, 0, 255]));

    let f = engine.render_frame(1.5, 0.0);
    assert_eq!(f.pixel(540, 540), Some([0, 0, 255, 255]));

    // Past the end the last scene stays on screen.
    let f = engine.render_frame(9.0, 0.0);
    assert_eq!(f.pixel(540, 540), Some([0, 0, 255, 255]));
}

#[test]
fn missing_visual_renders_black_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = project(vec![Scene::new("s0", "x").with_media("nope.png")]);
    let mut engine = RenderEngine::new(&p, dir.path(), timeline(&[1.0]), RenderOpts::default());
    for t in [0.0, 0.5, 0.9] {
        let f = engine.render_frame(t, t);
        assert_eq!(f.pixel(10, 10), Some([0, 0, 0, 255]));
    }
    assert_eq!(engine.warned_scenes.len(), 1);
}

#[test]
fn pan_right_uncovers_the_left_edge_at_full_progress() {
    let dir = tempfile::tempdir().unwrap();
    png(&dir.path().join("w.png"), 4, 4, [255, 255, 255, 255]);
    let p = project(vec![
        Scene::new("s0", "x")
            .with_media("w.png")
            .with_effect(VisualEffect::PanRight),
    ]);
    let mut engine = RenderEngine::new(&p, dir.path(), timeline(&[1.0]), RenderOpts::default());
    let start = engine.render_frame(0.0, 0.0);
    assert_eq!(start.pixel(20, 540), Some([255, 255, 255, 255]));
    let end = engine.render_frame(1.0, 0.0);
    assert_eq!(end.pixel(20, 540), Some([0, 0, 0, 255]));
    assert_eq!(end.pixel(400, 540), Some([255, 255, 255, 255]));
}

#[test]
fn cta_scene_ignores_its_camera_move() {
    let dir = tempfile::tempdir().unwrap();
    png(&dir.path().join("w.png"), 4, 4, [255, 255, 255, 255]);
    let mut scene = Scene::new("s0", "buy now")
        .with_media("w.png")
        .with_effect(VisualEffect::PanRight);
    scene.is_cta = true;
    let mut engine = RenderEngine::new(
        &project(vec![scene]),
        dir.path(),
        timeline(&[1.0]),
        RenderOpts::default(),
    );
    let end = engine.render_frame(1.0, 0.0);
    assert_eq!(end.pixel(20, 540), Some([255, 255, 255, 255]));
}

#[test]
fn watermark_sits_in_the_top_right_corner() {
    let dir = tempfile::tempdir().unwrap();
    png(&dir.path().join("logo.png"), 10, 10, [255, 255, 255, 255]);
    let mut p = project(vec![Scene::new("s0", "x")]);
    p.watermark = Some("logo.png".to_owned());
    let mut engine = RenderEngine::new(&p, dir.path(), timeline(&[1.0]), RenderOpts::default());
    let f = engine.render_frame(0.0, 0.0);
    // 18% of 1080 wide, inset by 3%: spans x in [853, 1048), y in [32, 227).
    let [r, _, _, a] = f.pixel(950, 120).unwrap();
    assert_eq!(a, 255);
    assert!(r > 200 && r < 230, "85% white over black, got {r}");
    assert_eq!(f.pixel(100, 120), Some([0, 0, 0, 255]));
}

#[test]
fn subtitle_frames_render_with_every_animation() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = project(vec![Scene::new("s0", "one two three four")]);
    p.subtitles.visible = true;
    p.subtitles.background_opacity = 0.5;
    let mut engine = RenderEngine::new(&p, dir.path(), timeline(&[2.0]), RenderOpts::default());
    for animation in [
        SubtitleAnimation::None,
        SubtitleAnimation::Pop,
        SubtitleAnimation::Fade,
        SubtitleAnimation::Bounce,
        SubtitleAnimation::Typewriter,
        SubtitleAnimation::Glow,
    ] {
        engine.set_style(SubtitleStyle {
            animation,
            ..engine.style().clone()
        });
        let f = engine.render_frame(0.7, 1.3);
        assert_eq!(f.data.len(), 1080 * 1080 * 4);
    }
}

#[test]
fn canvas_override_sets_output_size() {
    let dir = tempfile::tempdir().unwrap();
    png(&dir.path().join("red.png"), 8, 8, [255, 0, 0, 255]);
    let p = project(vec![Scene::new("s0", "a").with_media("red.png")]);
    let opts = RenderOpts {
        canvas: Some(Canvas {
            width: 64,
            height: 36,
        }),
        ..RenderOpts::default()
    };
    let mut engine = RenderEngine::new(&p, dir.path(), timeline(&[1.0]), opts);
    assert_eq!(engine.canvas().width, 64);
    let f = engine.render_frame(0.2, 0.0);
    assert_eq!((f.width, f.height), (64, 36));
    assert_eq!(f.pixel(32, 18), Some([255, 0, 0, 255]));
}

#[test]
fn oversized_canvas_override_falls_back_to_the_project_canvas() {
    let dir = tempfile::tempdir().unwrap();
    let p = project(vec![Scene::new("s0", "a")]);
    let opts = RenderOpts {
        canvas: Some(Canvas {
            width: 70_000,
            height: 16,
        }),
        ..RenderOpts::default()
    };
    let engine = RenderEngine::new(&p, dir.path(), timeline(&[1.0]), opts);
    let expected = p.canvas();
    assert_eq!(
        (engine.canvas().width, engine.canvas().height),
        (expected.width, expected.height)
    );
}
