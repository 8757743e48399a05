use super::*;

fn engine() -> Option<TextLayoutEngine> {
    match resolve_font("Roboto", None) {
        Ok(font) => TextLayoutEngine::new(font).ok(),
        Err(_) => {
            eprintln!("no system fonts installed; skipping");
            None
        }
    }
}

#[test]
fn shaped_advance_grows_with_trailing_space() {
    let Some(mut e) = engine() else { return };
    let word = e.shape("hello", 85.0).unwrap();
    let slot = e.shape("hello ", 85.0).unwrap();
    assert!(!word.glyphs.is_empty());
    assert!(word.advance > 0.0);
    assert!(slot.advance > word.advance);
    assert!(word.ascent > 0.0);
}

#[test]
fn advance_scales_with_font_size() {
    let Some(mut e) = engine() else { return };
    let small = e.shape("subtitle", 40.0).unwrap();
    let large = e.shape("subtitle", 80.0).unwrap();
    assert!((large.advance / small.advance - 2.0).abs() < 0.1);
}

#[test]
fn invalid_size_is_rejected() {
    let Some(mut e) = engine() else { return };
    assert!(e.shape("x", 0.0).is_err());
    assert!(e.shape("x", f32::NAN).is_err());
}

#[test]
fn middle_baseline_centers_em_box() {
    let t = ShapedText {
        ascent: 80.0,
        descent: 20.0,
        ..ShapedText::default()
    };
    assert_eq!(t.middle_baseline(100.0), 130.0);
}

#[test]
fn explicit_missing_font_file_is_error() {
    assert!(resolve_font("Roboto", Some(Path::new("/definitely/missing.ttf"))).is_err());
}
