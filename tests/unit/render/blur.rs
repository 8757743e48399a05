use super::*;

#[test]
fn kernel_sums_to_one_q16_and_is_symmetric() {
    for (radius, sigma) in [(1, 0.5), (5, 2.0), (45, 15.0)] {
        let k = gaussian_kernel_q16(radius, sigma).unwrap();
        assert_eq!(k.len(), (2 * radius + 1) as usize);
        assert_eq!(k.iter().map(|w| u64::from(*w)).sum::<u64>(), 65536);
        assert_eq!(k.first(), k.last());
    }
    assert_eq!(gaussian_kernel_q16(0, 0.0).unwrap(), vec![65536]);
    assert!(gaussian_kernel_q16(3, -1.0).is_err());
}

#[test]
fn blur_spreads_a_single_pixel_and_preserves_flat_fields() {
    let k = gaussian_kernel_q16(2, 1.0).unwrap();
    let (w, h) = (5u32, 5u32);
    let mut buf = vec![0u8; 5 * 5 * 4];
    let center = (2 * 5 + 2) * 4;
    buf[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);
    let mut tmp = Vec::new();
    blur_rgba8_premul_q16(&mut buf, &mut tmp, w, h, &k);
    assert!(buf[center + 3] < 255);
    assert!(buf[(2 * 5 + 3) * 4 + 3] > 0);

    let mut flat = vec![128u8; 4 * 4 * 4];
    blur_rgba8_premul_q16(&mut flat, &mut tmp, 4, 4, &k);
    assert!(flat.iter().all(|v| *v == 128));
}
