use super::*;

fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

const CANVAS: Canvas = Canvas {
    width: 64,
    height: 32,
};

#[test]
fn decode_image_premultiplies() {
    let img = decode_image(&png_bytes(2, 1, [200, 100, 50, 128])).unwrap();
    assert_eq!((img.width, img.height), (2, 1));
    assert_eq!(&img.rgba8_premul[..4], &[100, 50, 25, 128]);
}

#[test]
fn store_reads_files_and_data_urls() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.png"), png_bytes(4, 4, [255, 0, 0, 255])).unwrap();
    let url = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes(3, 2, [0, 0, 255, 255]))
    );

    let mut store = ImageStore::new(dir.path(), CANVAS);
    store.preload(["a.png", url.as_str(), "a.png"]);
    let a = store.get("a.png").unwrap();
    assert_eq!((a.w, a.h), (4, 4));
    let b = store.get(&url).unwrap();
    assert_eq!((b.w, b.h), (3, 2));
}

#[test]
fn svg_is_rasterized_at_canvas_size() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("logo.svg"),
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10" fill="#00ff00"/></svg>"##,
    )
    .unwrap();
    let mut store = ImageStore::new(dir.path(), CANVAS);
    let p = store.get("logo.svg").unwrap();
    assert_eq!((p.w, p.h), (64, 32));
}

#[test]
fn broken_references_are_remembered_as_errors() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("junk.png"), b"not an image").unwrap();
    let mut store = ImageStore::new(dir.path(), CANVAS);
    assert!(store.get("missing.png").is_err());
    assert!(store.get("junk.png").is_err());
    assert!(store.get("data:image/png,plain").is_err());
    std::fs::write(dir.path().join("missing.png"), png_bytes(1, 1, [0; 4])).unwrap();
    assert!(store.get("missing.png").is_err());
}

#[test]
fn pixmap_rejects_mismatched_lengths() {
    assert!(pixmap_from_premul_bytes(&[0; 8], 1, 1).is_err());
    assert!(pixmap_from_premul_bytes(&[0; 4], 70_000, 0).is_err());
}
