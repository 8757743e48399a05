use super::*;

#[test]
fn mul_div255_rounds() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(0, 255), 0);
    assert_eq!(mul_div255_u16(128, 255), 128);
    assert_eq!(mul_div255_u16(255, 128), 128);
}

#[test]
fn lerp_hits_endpoints() {
    assert_eq!(lerp(1.0, 1.15, 0.0), 1.0);
    assert_eq!(lerp(1.0, 1.15, 1.0), 1.15);
    assert!((lerp(0.0, -150.0, 0.5) + 75.0).abs() < 1e-12);
}

#[test]
fn clamp01_handles_nan_and_range() {
    assert_eq!(clamp01(f64::NAN), 0.0);
    assert_eq!(clamp01(-1.0), 0.0);
    assert_eq!(clamp01(2.0), 1.0);
    assert_eq!(clamp01(0.25), 0.25);
}

#[test]
fn premultiply_zeroes_transparent_pixels() {
    let mut px = vec![200, 100, 50, 0, 255, 255, 255, 128];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[..4], &[0, 0, 0, 0]);
    assert_eq!(&px[4..], &[128, 128, 128, 128]);
}
