use image::{imageops::FilterType, DynamicImage, ImageDecoder, ImageError, ImageReader, Rgb, RgbImage};
use std::fs::{self, Permissions};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::config::EncodeSettings;
use crate::error::ConvertError;

/// libwebp `method`: 0 = fastest, 6 = slowest with the best compression
const WEBP_METHOD: i32 = 6;

/// Dimensions before and after a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertedImage {
    pub original: (u32, u32),
    pub resized: (u32, u32),
}

/// Check that libwebp can build an encoder config
pub fn encoder_available() -> bool {
    webp::WebPConfig::new().is_ok()
}

/// Convert one image to WebP
///
/// Decodes `input`, applies its EXIF orientation, flattens transparency onto
/// white, downsizes to fit the bounding box and writes lossy WebP to `output`.
/// The destination only appears once it is fully written, with the same
/// permission bits as the source.
pub fn convert_image(
    input: &Path,
    output: &Path,
    settings: &EncodeSettings,
) -> Result<ConvertedImage, ConvertError> {
    let img = decode_oriented(input)?;
    let original = (img.width(), img.height());

    let rgb = flatten_to_rgb(img);

    let (width, height) = fit_within(original.0, original.1, settings.max_width, settings.max_height);
    let rgb = if (width, height) == original {
        rgb
    } else {
        image::imageops::resize(&rgb, width, height, FilterType::Lanczos3)
    };

    let data = encode_webp(&rgb, settings.quality)?;
    let permissions = fs::metadata(input).map(|m| m.permissions()).ok();
    write_atomically(output, &data, permissions)?;

    tracing::debug!(
        input = %input.display(),
        from = ?original,
        to = ?(width, height),
        bytes = data.len(),
        "encoded webp"
    );

    Ok(ConvertedImage {
        original,
        resized: (width, height),
    })
}

/// Decode an image and rotate/flip it according to its stored orientation
fn decode_oriented(path: &Path) -> Result<DynamicImage, ConvertError> {
    let decode_err = |source: ImageError| ConvertError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| decode_err(ImageError::IoError(e)))?;
    let mut decoder = reader.into_decoder().map_err(decode_err)?;

    // Missing or unreadable orientation metadata means "as stored"
    let orientation = decoder.orientation().ok();

    let mut img = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    if let Some(orientation) = orientation {
        img.apply_orientation(orientation);
    }

    Ok(img)
}

/// Produce an opaque 8-bit RGB image.
/// Anything with an alpha channel is composited over white.
pub fn flatten_to_rgb(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = RgbImage::new(width, height);

    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        let alpha = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        *dst = Rgb([blend(r), blend(g), blend(b)]);
    }

    out
}

/// Largest size that fits `max_width × max_height` with the same aspect ratio.
/// Images already inside the box keep their size.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = f64::min(
        f64::from(max_width) / f64::from(width),
        f64::from(max_height) / f64::from(height),
    );
    let scaled = |side: u32, max: u32| ((f64::from(side) * scale).round() as u32).clamp(1, max.max(1));

    (scaled(width, max_width), scaled(height, max_height))
}

fn encode_webp(rgb: &RgbImage, quality: f32) -> Result<Vec<u8>, ConvertError> {
    let mut config = webp::WebPConfig::new()
        .map_err(|_| ConvertError::Encode("failed to initialise encoder config".to_string()))?;
    config.quality = quality;
    config.method = WEBP_METHOD;

    let encoder = webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height());
    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| ConvertError::Encode(format!("{:?}", e)))?;

    Ok(memory.to_vec())
}

/// Write to a temp file beside `path`, then rename it into place.
/// Temp files start out owner-only, so `permissions` is applied before the rename.
fn write_atomically(
    path: &Path,
    data: &[u8],
    permissions: Option<Permissions>,
) -> Result<(), ConvertError> {
    let write_err = |source: std::io::Error| ConvertError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(data).map_err(write_err)?;
    if let Some(permissions) = permissions {
        tmp.as_file().set_permissions(permissions).map_err(write_err)?;
    }
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    /// Baseline JPEG with an APP1 EXIF segment carrying only an Orientation tag
    fn jpeg_with_orientation(img: &RgbImage, orientation: u16) -> Vec<u8> {
        let mut encoded = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Jpeg)
            .unwrap();

        let mut exif = b"Exif\0\0".to_vec();
        exif.extend_from_slice(b"II*\0");
        exif.extend_from_slice(&8u32.to_le_bytes());
        exif.extend_from_slice(&1u16.to_le_bytes());
        exif.extend_from_slice(&0x0112u16.to_le_bytes());
        exif.extend_from_slice(&3u16.to_le_bytes());
        exif.extend_from_slice(&1u32.to_le_bytes());
        exif.extend_from_slice(&orientation.to_le_bytes());
        exif.extend_from_slice(&[0, 0]);
        exif.extend_from_slice(&0u32.to_le_bytes());

        let mut out = encoded[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&((exif.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&exif);
        out.extend_from_slice(&encoded[2..]);
        out
    }

    #[test]
    fn test_fit_within_downscales_preserving_ratio() {
        assert_eq!(fit_within(600, 300, 400, 400), (400, 200));
        assert_eq!(fit_within(300, 900, 400, 400), (133, 400));
        assert_eq!(fit_within(4000, 3000, 400, 400), (400, 300));
        assert_eq!(fit_within(401, 400, 400, 400), (400, 399));
    }

    #[test]
    fn test_fit_within_never_upscales() {
        assert_eq!(fit_within(100, 50, 400, 400), (100, 50));
        assert_eq!(fit_within(400, 400, 400, 400), (400, 400));
        assert_eq!(fit_within(1, 1, 400, 400), (1, 1));
    }

    #[test]
    fn test_fit_within_extreme_ratio_keeps_one_pixel() {
        assert_eq!(fit_within(10_000, 2, 400, 400), (400, 1));
    }

    #[test]
    fn test_fit_within_ratio_stays_close() {
        for &(w, h) in &[(1920, 1080), (1080, 1920), (777, 401), (5000, 4999)] {
            let (nw, nh) = fit_within(w, h, 400, 400);
            assert!(nw <= 400 && nh <= 400);
            let before = w as f64 / h as f64;
            let after = nw as f64 / nh as f64;
            assert!((before - after).abs() / before < 0.01, "{}x{} -> {}x{}", w, h, nw, nh);
        }
    }

    #[test]
    fn test_flatten_composites_transparency_on_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([255, 0, 0, 255]));

        let rgb = flatten_to_rgb(DynamicImage::ImageRgba8(rgba));

        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_flatten_converts_grayscale() {
        let gray = image::GrayImage::from_pixel(1, 1, image::Luma([77]));
        let rgb = flatten_to_rgb(DynamicImage::ImageLuma8(gray));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([77, 77, 77]));
    }

    #[test]
    fn test_convert_jpeg_resizes_to_bound() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.jpg");
        let output = dir.path().join("a.webp");
        RgbImage::from_pixel(600, 300, Rgb([10, 120, 200])).save(&input).unwrap();

        let result = convert_image(&input, &output, &EncodeSettings::default()).unwrap();

        assert_eq!(result.original, (600, 300));
        assert_eq!(result.resized, (400, 200));
        let written = image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (400, 200));
        // Converter leaves the source alone
        assert!(input.exists());
    }

    #[test]
    fn test_convert_small_png_keeps_size_and_flattens() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("logo.png");
        let output = dir.path().join("logo.webp");
        RgbaImage::from_pixel(40, 20, Rgba([0, 0, 0, 0])).save(&input).unwrap();

        let result = convert_image(&input, &output, &EncodeSettings::default()).unwrap();
        assert_eq!(result.resized, (40, 20));

        let written = image::open(&output).unwrap().to_rgb8();
        let px = written.get_pixel(20, 10);
        assert!(px.0.iter().all(|&c| c > 240), "expected white, got {:?}", px);
    }

    #[test]
    fn test_convert_corrupt_input_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.jpg");
        let output = dir.path().join("broken.webp");
        fs::write(&input, b"definitely not a jpeg").unwrap();

        let err = convert_image(&input, &output, &EncodeSettings::default()).unwrap_err();

        assert!(matches!(err, ConvertError::Decode { .. }));
        assert!(!output.exists());
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_convert_applies_stored_orientation() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("portrait.jpg");
        let output = dir.path().join("portrait.webp");
        let landscape = RgbImage::from_pixel(60, 20, Rgb([90, 90, 90]));
        // 6 = rotate 90° clockwise on display
        fs::write(&input, jpeg_with_orientation(&landscape, 6)).unwrap();

        let result = convert_image(&input, &output, &EncodeSettings::default()).unwrap();

        assert_eq!(result.original, (20, 60));
        let written = image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (20, 60));
    }

    #[test]
    fn test_convert_every_allowed_format() {
        let dir = TempDir::new().unwrap();
        let opaque = DynamicImage::ImageRgb8(RgbImage::from_pixel(500, 250, Rgb([30, 160, 60])));
        let clear = DynamicImage::ImageRgba8(RgbaImage::from_pixel(500, 250, Rgba([0, 0, 0, 0])));
        let icon = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 32, Rgba([0, 0, 0, 0])));

        let cases = [
            ("photo.bmp", &opaque, (400, 200)),
            ("photo.tiff", &opaque, (400, 200)),
            ("photo.jpeg", &opaque, (400, 200)),
            ("palette.gif", &clear, (400, 200)),
            ("clear.png", &clear, (400, 200)),
            ("favicon.ico", &icon, (64, 32)),
        ];

        for (name, img, expected) in cases {
            let input = dir.path().join(name);
            let output = input.with_extension("webp");
            img.save(&input).unwrap();

            let result = convert_image(&input, &output, &EncodeSettings::default())
                .unwrap_or_else(|e| panic!("{}: {}", name, e));
            assert_eq!(result.resized, expected, "{}", name);

            let written = image::open(&output).unwrap().to_rgb8();
            assert_eq!(written.dimensions(), expected, "{}", name);
            if img.color().has_alpha() {
                let px = written.get_pixel(expected.0 / 2, expected.1 / 2);
                assert!(px.0.iter().all(|&c| c > 240), "{}: expected white, got {:?}", name, px);
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_convert_output_keeps_source_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.jpg");
        let output = dir.path().join("a.webp");
        RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])).save(&input).unwrap();
        fs::set_permissions(&input, Permissions::from_mode(0o644)).unwrap();

        convert_image(&input, &output, &EncodeSettings::default()).unwrap();

        let mode = fs::metadata(&output).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn test_encoder_available() {
        assert!(encoder_available());
    }
}
