//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF, BMP, ICO) | `image::ImageReader` with guessed format |
//! | EXIF orientation | `image::ImageDecoder::orientation`, applied at decode |
//! | EXIF carry-over | `image::ImageDecoder::exif_metadata` + [`metadata`](super::metadata) |
//! | Grayscale / invert | `DynamicImage::grayscale` / `DynamicImage::invert` |
//! | Brightness, contrast, saturation, sharpness | [`enhance`](super::enhance) kernels |
//! | Resize | `DynamicImage::resize_exact` with the requested filter |
//! | Strip metadata / GPS | drop or rewrite the carried EXIF |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) |
//! | Encode → WebP | `WebPEncoder::new_lossless` |
//! | Encode → everything else | `DynamicImage::write_to` |

use super::backend::{BackendError, DecodedImage, ImageBackend};
use super::calculations::calculate_resize_dimensions;
use super::enhance::{self, is_enhanceable, with_rgba8};
use super::metadata;
use super::operations::{Operation, prepare_for_format};
use super::params::{Factor, Quality};
use crate::formats::OutputFormat;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbaImage};
use std::io::Cursor;

/// Largest edge an ICO entry can hold.
const ICO_MAX_EDGE: u32 = 256;

/// AVIF encoder speed (1 slowest … 10 fastest).
const AVIF_SPEED: u8 = 6;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_error(e: image::ImageError) -> BackendError {
    BackendError::Decode(e.to_string())
}

/// Run an enhancement kernel unless the factor is the identity.
fn adjust(
    mut image: DecodedImage,
    operation: &Operation,
    factor: Factor,
    kernel: fn(&mut RgbaImage, f32),
) -> Result<DecodedImage, BackendError> {
    if factor.is_identity() {
        return Ok(image);
    }
    if !is_enhanceable(image.pixels.color()) {
        return Err(BackendError::unsupported(
            operation,
            format!("not available for {:?} images", image.pixels.color()),
        ));
    }
    let f = factor.value();
    image.pixels = with_rgba8(image.pixels, |buf| kernel(buf, f));
    Ok(image)
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let source_format = reader.format();
        let mut decoder = reader.into_decoder().map_err(decode_error)?;
        let orientation = decoder
            .orientation()
            .unwrap_or(Orientation::NoTransforms);
        // A malformed EXIF block is not worth failing the image over.
        let exif = decoder
            .exif_metadata()
            .ok()
            .flatten()
            .and_then(|raw| metadata::upright(&raw));
        let mut pixels = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
        pixels.apply_orientation(orientation);
        Ok(DecodedImage {
            pixels,
            orientation,
            source_format,
            exif,
        })
    }

    fn transform(
        &self,
        mut image: DecodedImage,
        operation: &Operation,
    ) -> Result<DecodedImage, BackendError> {
        match operation {
            Operation::Grayscale => {
                image.pixels = image.pixels.grayscale();
                Ok(image)
            }
            Operation::Invert => {
                image.pixels.invert();
                Ok(image)
            }
            Operation::Brightness { factor } => {
                adjust(image, operation, *factor, enhance::brightness)
            }
            Operation::Contrast { factor } => adjust(image, operation, *factor, enhance::contrast),
            Operation::Saturation { factor } => {
                // Gray images have nothing to saturate.
                if !image.pixels.color().has_color() {
                    return Ok(image);
                }
                adjust(image, operation, *factor, enhance::saturation)
            }
            Operation::Sharpness { factor } => {
                adjust(image, operation, *factor, enhance::sharpness)
            }
            Operation::Resize(spec) => {
                if spec.width == Some(0) || spec.height == Some(0) {
                    return Err(BackendError::unsupported(
                        operation,
                        "target edges must be at least 1 pixel",
                    ));
                }
                if let Some((w, h)) = calculate_resize_dimensions(image.dimensions(), spec) {
                    image.pixels = image.pixels.resize_exact(w, h, spec.resample.filter());
                }
                Ok(image)
            }
            Operation::Convert { format, background } => {
                image.pixels = prepare_for_format(image.pixels, *format, *background);
                Ok(image)
            }
            Operation::StripMetadata => {
                image.exif = None;
                Ok(image)
            }
            Operation::StripGps => {
                image.exif = image.exif.as_deref().and_then(metadata::without_gps);
                Ok(image)
            }
        }
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        if format == OutputFormat::Ico
            && (image.width() > ICO_MAX_EDGE || image.height() > ICO_MAX_EDGE)
        {
            return Err(BackendError::Encode(format!(
                "ICO images are limited to {ICO_MAX_EDGE}x{ICO_MAX_EDGE}, got {}x{}",
                image.width(),
                image.height()
            )));
        }

        let q = quality.value() as u8;
        let mut buf = Vec::new();
        let result = match format {
            OutputFormat::Jpeg => image.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, q)),
            OutputFormat::Avif => image.write_with_encoder(AvifEncoder::new_with_speed_quality(
                &mut buf, AVIF_SPEED, q,
            )),
            OutputFormat::Png => image.write_with_encoder(PngEncoder::new_with_quality(
                &mut buf,
                CompressionType::Default,
                PngFilter::Adaptive,
            )),
            OutputFormat::WebP => image.write_with_encoder(WebPEncoder::new_lossless(&mut buf)),
            other => image.write_to(&mut Cursor::new(&mut buf), other.image_format()),
        };
        result.map_err(|e| BackendError::Encode(format!("{}: {e}", format.name())))?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::operations::Background;
    use crate::imaging::params::ResizeSpec;
    use crate::imaging::{ErrorKind, apply};
    use exif::experimental::Writer;
    use exif::{Field, In, Tag, Value};
    use image::{ColorType, GenericImageView, Rgb, RgbImage, Rgba};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 20 % 256) as u8, (y * 30 % 256) as u8, 128])
        }))
    }

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        RustBackend::new()
            .encode(image, OutputFormat::Png, Quality::default())
            .unwrap()
    }

    #[test]
    fn decode_png_reports_format_and_size() {
        let backend = RustBackend::new();
        let decoded = backend.decode(&png_bytes(&gradient(12, 7))).unwrap();
        assert_eq!(decoded.dimensions(), (12, 7));
        assert_eq!(decoded.source_format, Some(image::ImageFormat::Png));
        assert_eq!(decoded.orientation, Orientation::NoTransforms);
    }

    #[test]
    fn decode_garbage_is_decode_error() {
        let err = RustBackend::new().decode(b"definitely not an image").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn decode_truncated_png_is_decode_error() {
        let bytes = png_bytes(&gradient(32, 32));
        let err = RustBackend::new().decode(&bytes[..bytes.len() / 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn grayscale_is_idempotent() {
        let backend = RustBackend::new();
        let once = apply(&backend, DecodedImage::new(gradient(8, 8)), &[Operation::Grayscale]).unwrap();
        let twice = apply(&backend, once.clone(), &[Operation::Grayscale]).unwrap();
        assert_eq!(once.pixels, twice.pixels);
        assert_eq!(once.pixels.color(), ColorType::L8);
    }

    #[test]
    fn grayscale_keeps_alpha() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 200, 30, 99])));
        let out = RustBackend::new()
            .transform(DecodedImage::new(rgba), &Operation::Grayscale)
            .unwrap();
        assert_eq!(out.pixels.color(), ColorType::La8);
        assert_eq!(out.pixels.get_pixel(0, 0)[3], 99);
    }

    #[test]
    fn invert_is_an_involution() {
        let backend = RustBackend::new();
        let original = DecodedImage::new(gradient(9, 5));
        let back = apply(&backend, original.clone(), &[Operation::Invert, Operation::Invert]).unwrap();
        assert_eq!(back.pixels, original.pixels);
    }

    #[test]
    fn invert_leaves_alpha_alone() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 100, 255, 42])));
        let out = RustBackend::new()
            .transform(DecodedImage::new(rgba), &Operation::Invert)
            .unwrap();
        assert_eq!(out.pixels.get_pixel(0, 0), Rgba([255, 155, 0, 42]));
    }

    #[test]
    fn identity_factors_leave_pixels_untouched() {
        let backend = RustBackend::new();
        let original = DecodedImage::new(gradient(6, 6));
        let one = Factor::new(1.0);
        let ops = [
            Operation::Brightness { factor: one },
            Operation::Contrast { factor: one },
            Operation::Saturation { factor: one },
            Operation::Sharpness { factor: one },
        ];
        let out = apply(&backend, original.clone(), &ops).unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn enhancement_on_float_image_is_unsupported() {
        let float = DynamicImage::new_rgb32f(2, 2);
        let err = RustBackend::new()
            .transform(
                DecodedImage::new(float),
                &Operation::Brightness {
                    factor: Factor::new(1.5),
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn resize_fits_inside_box() {
        let out = RustBackend::new()
            .transform(
                DecodedImage::new(gradient(40, 20)),
                &Operation::Resize(ResizeSpec::fit(10, 10)),
            )
            .unwrap();
        assert_eq!(out.dimensions(), (10, 5));
    }

    #[test]
    fn resize_to_zero_is_unsupported() {
        let spec: ResizeSpec = "0x10".parse().unwrap();
        let err = RustBackend::new()
            .transform(DecodedImage::new(gradient(4, 4)), &Operation::Resize(spec))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    }

    /// 4x2 JPEG whose EXIF asks for a 90° clockwise turn (orientation 6).
    fn rotated_jpeg() -> Vec<u8> {
        let jpeg = RustBackend::new()
            .encode(&gradient(4, 2), OutputFormat::Jpeg, Quality::new(90))
            .unwrap();
        let fields = [
            Field {
                tag: Tag::Orientation,
                ifd_num: In::PRIMARY,
                value: Value::Short(vec![6]),
            },
            Field {
                tag: Tag::GPSLatitudeRef,
                ifd_num: In::PRIMARY,
                value: Value::Ascii(vec![b"N".to_vec()]),
            },
        ];
        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        let mut tiff = Cursor::new(Vec::new());
        writer.write(&mut tiff, false).unwrap();
        metadata::embed(jpeg, OutputFormat::Jpeg, &tiff.into_inner())
    }

    fn carried_tags(image: &DecodedImage) -> Vec<Tag> {
        let raw = image.exif.clone().unwrap();
        exif::Reader::new()
            .read_raw(raw)
            .unwrap()
            .fields()
            .map(|f| f.tag)
            .collect()
    }

    #[test]
    fn decode_applies_exif_orientation() {
        let decoded = RustBackend::new().decode(&rotated_jpeg()).unwrap();
        assert_eq!(decoded.orientation, Orientation::Rotate90);
        assert_eq!(decoded.dimensions(), (2, 4));
        let orientation = exif::Reader::new()
            .read_raw(decoded.exif.clone().unwrap())
            .unwrap()
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0));
        assert_eq!(orientation, Some(1));
    }

    #[test]
    fn strip_metadata_drops_carried_exif() {
        let backend = RustBackend::new();
        let decoded = backend.decode(&rotated_jpeg()).unwrap();
        assert!(decoded.exif.is_some());
        let out = backend.transform(decoded, &Operation::StripMetadata).unwrap();
        assert_eq!(out.exif, None);
        assert_eq!(out.dimensions(), (2, 4));
    }

    #[test]
    fn strip_gps_keeps_the_rest_of_the_exif() {
        let backend = RustBackend::new();
        let decoded = backend.decode(&rotated_jpeg()).unwrap();
        assert!(carried_tags(&decoded).contains(&Tag::GPSLatitudeRef));
        let out = backend.transform(decoded, &Operation::StripGps).unwrap();
        let tags = carried_tags(&out);
        assert!(!tags.contains(&Tag::GPSLatitudeRef));
        assert!(tags.contains(&Tag::Orientation));
    }

    #[test]
    fn convert_flattens_for_jpeg() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        let out = RustBackend::new()
            .transform(
                DecodedImage::new(rgba),
                &Operation::Convert {
                    format: OutputFormat::Jpeg,
                    background: Background([10, 20, 30]),
                },
            )
            .unwrap();
        assert_eq!(out.pixels.color(), ColorType::Rgb8);
        assert_eq!(out.pixels.get_pixel(0, 0), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn every_format_encodes_and_decodes_back() {
        let backend = RustBackend::new();
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([200, 50, 25, 255])));
        for format in OutputFormat::ALL {
            let prepared = prepare_for_format(source.clone(), format, Background::default());
            let bytes = backend
                .encode(&prepared, format, Quality::new(90))
                .unwrap_or_else(|e| panic!("{format} failed to encode: {e}"));
            assert!(!bytes.is_empty(), "{format} produced no bytes");
            // AVIF decoding needs a native library; only check the header.
            if format == OutputFormat::Avif {
                assert_eq!(&bytes[4..8], b"ftyp");
                continue;
            }
            let decoded = backend.decode(&bytes).unwrap();
            assert_eq!(decoded.dimensions(), (16, 16), "{format}");
            assert_eq!(decoded.source_format, Some(format.image_format()));
        }
    }

    #[test]
    fn lossless_formats_preserve_pixels() {
        let backend = RustBackend::new();
        let source = gradient(10, 10);
        for format in [OutputFormat::Png, OutputFormat::Bmp, OutputFormat::Tiff, OutputFormat::WebP] {
            let bytes = backend.encode(&source, format, Quality::default()).unwrap();
            let back = backend.decode(&bytes).unwrap();
            assert_eq!(back.pixels.to_rgb8(), source.to_rgb8(), "{format}");
        }
    }

    #[test]
    fn oversized_ico_is_encode_error() {
        let big = DynamicImage::new_rgba8(300, 10);
        let err = RustBackend::new()
            .encode(&big, OutputFormat::Ico, Quality::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encode);
    }
}
