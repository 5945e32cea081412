//! Pre-upload image normalization.
//!
//! Photos are decoded, flattened onto white when they carry alpha, shrunk to
//! fit a square bounding box and re-encoded in the format family they arrived
//! in.

use std::io::Cursor;

use chorelog_common::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageFormat, Rgb, RgbImage};

/// Field message for bytes that cannot be decoded as an image.
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Output of [`normalize`].
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub data: Vec<u8>,
    /// Format the bytes are encoded in.
    pub format: ImageFormat,
    /// Format the input was decoded from.
    pub source_format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl NormalizedImage {
    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Preferred file extension of the output format.
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }
}

/// Work out the input format, sniffing the bytes before trusting the
/// declared content type.
pub fn detect_format(data: &[u8], content_type: Option<&str>) -> Option<ImageFormat> {
    image::guess_format(data)
        .ok()
        .or_else(|| content_type.and_then(ImageFormat::from_mime_type))
}

/// Check that the bytes decode as an image without transforming them.
pub fn verify(data: &[u8], content_type: Option<&str>) -> Result<ImageFormat> {
    let format =
        detect_format(data, content_type).ok_or_else(|| Error::field("image", INVALID_IMAGE))?;
    image::load_from_memory_with_format(data, format)
        .map_err(|_| Error::field("image", INVALID_IMAGE))?;
    Ok(format)
}

/// Scale factor that fits `width x height` inside `max_dimension` on both
/// axes without ever enlarging.
pub fn scale_factor(width: u32, height: u32, max_dimension: u32) -> f64 {
    if width == 0 || height == 0 {
        return 1.0;
    }
    let max = f64::from(max_dimension);
    (max / f64::from(width))
        .min(max / f64::from(height))
        .min(1.0)
}

/// Composite an image with alpha onto an opaque white background.
///
/// Images without an alpha channel are returned unchanged.
pub fn flatten_onto_white(img: DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return img;
    }

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }

    DynamicImage::ImageRgb8(out)
}

/// Decode, flatten, downscale and re-encode an uploaded image.
///
/// JPEG output uses `jpeg_quality`; every other format is written with the
/// encoder's lossless defaults. Formats the encoder cannot write are
/// re-encoded as PNG.
///
/// # Returns
///
/// * `Ok(NormalizedImage)` - The encoded output
/// * `Err(Error::Validation)` - If the bytes are not a decodable image
pub fn normalize(
    data: &[u8],
    content_type: Option<&str>,
    max_dimension: u32,
    jpeg_quality: u8,
) -> Result<NormalizedImage> {
    let source_format =
        detect_format(data, content_type).ok_or_else(|| Error::field("image", INVALID_IMAGE))?;

    let img = image::load_from_memory_with_format(data, source_format).map_err(|e| {
        tracing::debug!("Rejecting undecodable {:?} upload: {}", source_format, e);
        Error::field("image", INVALID_IMAGE)
    })?;

    let img = flatten_onto_white(img);

    let scale = scale_factor(img.width(), img.height(), max_dimension);
    let img = if scale < 1.0 {
        let width = ((f64::from(img.width()) * scale).round() as u32).max(1);
        let height = ((f64::from(img.height()) * scale).round() as u32).max(1);
        img.resize_exact(width, height, FilterType::Lanczos3)
    } else {
        img
    };

    let format = output_format(source_format);
    let data = encode(&img, format, jpeg_quality)?;

    Ok(NormalizedImage {
        data,
        format,
        source_format,
        width: img.width(),
        height: img.height(),
    })
}

fn output_format(source: ImageFormat) -> ImageFormat {
    match source {
        ImageFormat::Jpeg
        | ImageFormat::Png
        | ImageFormat::Gif
        | ImageFormat::Bmp
        | ImageFormat::Tiff
        | ImageFormat::WebP => source,
        _ => ImageFormat::Png,
    }
}

fn encode(img: &DynamicImage, format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());

    let result = match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality);
            to_8bit(img).write_with_encoder(encoder)
        }
        ImageFormat::Png | ImageFormat::Tiff => img.write_to(&mut buf, format),
        _ => to_8bit(img).write_to(&mut buf, format),
    };

    result.map_err(|e| Error::internal(format!("Failed to encode {:?} image: {}", format, e)))?;
    Ok(buf.into_inner())
}

/// Narrow to 8-bit RGB or grayscale, which every encoder accepts.
fn to_8bit(img: &DynamicImage) -> DynamicImage {
    match img.color() {
        ColorType::Rgb8 | ColorType::L8 => img.clone(),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    }
}
