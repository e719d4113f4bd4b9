//! EXIF carried from a source file into its output.
//!
//! Decoding bakes the EXIF orientation into the pixels, so the block kept
//! on a [`DecodedImage`](super::DecodedImage) is rewritten to say "upright"
//! before anything else sees it. `strip-gps` rewrites it again without the
//! GPS directory; `strip-metadata` drops it entirely.
//!
//! Only JPEG and WebP outputs get the block back: JPEG as an `APP1`
//! segment, WebP as an `EXIF` chunk behind a `VP8X` header. Other targets
//! leave it out.
//!
//! Parsing and re-serialising the TIFF structure goes through `kamadak-exif`.
//! Thumbnails (IFD1) and maker-note offsets do not survive the rewrite.

use crate::formats::OutputFormat;
use exif::experimental::Writer;
use exif::{Context, Field, In, Reader, Tag, Value};
use std::io::Cursor;
use tracing::debug;

/// Prefix of the EXIF payload inside a JPEG `APP1` segment.
const EXIF_HEADER: &[u8] = b"Exif\0\0";

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_APP0: [u8; 2] = [0xFF, 0xE0];
const JPEG_APP1: [u8; 2] = [0xFF, 0xE1];

const VP8X_EXIF: u8 = 0x08;
const VP8X_ALPHA: u8 = 0x10;

/// Tags that describe the layout of the original file rather than the
/// picture. The writer regenerates the pointers; the rest would dangle.
const LAYOUT_TAGS: [Tag; 9] = [
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::StripOffsets,
    Tag::StripByteCounts,
    Tag::TileOffsets,
    Tag::TileByteCounts,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
];

/// Rewrite a raw EXIF block so its orientation reads 1 (upright).
///
/// Accepts the TIFF structure with or without the `Exif\0\0` prefix.
/// Returns `None` when the block cannot be parsed or ends up empty.
pub fn upright(raw: &[u8]) -> Option<Vec<u8>> {
    rewrite(raw, true)
}

/// Like [`upright`], and also drop every GPS tag.
pub fn without_gps(raw: &[u8]) -> Option<Vec<u8>> {
    rewrite(raw, false)
}

fn rewrite(raw: &[u8], keep_gps: bool) -> Option<Vec<u8>> {
    let tiff = raw.strip_prefix(EXIF_HEADER).unwrap_or(raw);
    let exif = match Reader::new().read_raw(tiff.to_vec()) {
        Ok(exif) => exif,
        Err(e) => {
            debug!("dropping unreadable EXIF: {e}");
            return None;
        }
    };

    let upright_field = Field {
        tag: Tag::Orientation,
        ifd_num: In::PRIMARY,
        value: Value::Short(vec![1]),
    };
    let fields: Vec<&Field> = exif
        .fields()
        .filter(|field| is_carried(field, keep_gps))
        .map(|field| {
            if field.tag == Tag::Orientation {
                &upright_field
            } else {
                field
            }
        })
        .collect();
    if fields.is_empty() {
        return None;
    }

    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut out = Cursor::new(Vec::new());
    match writer.write(&mut out, exif.little_endian()) {
        Ok(()) => Some(out.into_inner()),
        Err(e) => {
            debug!("dropping EXIF that cannot be rewritten: {e}");
            None
        }
    }
}

fn is_carried(field: &Field, keep_gps: bool) -> bool {
    if field.ifd_num != In::PRIMARY || matches!(field.value, Value::Unknown(..)) {
        return false;
    }
    if field.tag.context() == Context::Gps {
        return keep_gps;
    }
    !LAYOUT_TAGS.contains(&field.tag)
}

/// Splice `exif` (a TIFF structure) into freshly encoded bytes.
///
/// Formats without an EXIF slot, and byte streams that do not look like
/// the encoder's usual output, come back unchanged.
pub fn embed(encoded: Vec<u8>, format: OutputFormat, exif: &[u8]) -> Vec<u8> {
    let spliced = match format {
        OutputFormat::Jpeg => embed_jpeg(&encoded, exif),
        OutputFormat::WebP => embed_webp(&encoded, exif),
        _ => None,
    };
    spliced.unwrap_or(encoded)
}

/// Insert an `APP1` segment after SOI, or after the JFIF `APP0` if present.
fn embed_jpeg(jpeg: &[u8], exif: &[u8]) -> Option<Vec<u8>> {
    if !jpeg.starts_with(&JPEG_SOI) {
        return None;
    }
    let segment_len = u16::try_from(2 + EXIF_HEADER.len() + exif.len()).ok()?;
    let mut at = JPEG_SOI.len();
    if jpeg.get(2..4) == Some(&JPEG_APP0[..]) {
        let app0_len = u16::from_be_bytes([*jpeg.get(4)?, *jpeg.get(5)?]) as usize;
        at = 4 + app0_len;
        if at > jpeg.len() {
            return None;
        }
    }

    let mut out = Vec::with_capacity(jpeg.len() + 2 + segment_len as usize);
    out.extend_from_slice(&jpeg[..at]);
    out.extend_from_slice(&JPEG_APP1);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(exif);
    out.extend_from_slice(&jpeg[at..]);
    Some(out)
}

/// Append an `EXIF` chunk, promoting a simple lossless file to `VP8X`.
fn embed_webp(webp: &[u8], exif: &[u8]) -> Option<Vec<u8>> {
    if webp.len() < 25 || &webp[0..4] != b"RIFF" || &webp[8..12] != b"WEBP" {
        return None;
    }
    let exif_len = u32::try_from(exif.len()).ok()?;

    let mut out = Vec::with_capacity(webp.len() + exif.len() + 32);
    out.extend_from_slice(b"RIFF\0\0\0\0WEBP");
    match &webp[12..16] {
        b"VP8X" => {
            out.extend_from_slice(&webp[12..]);
            out[20] |= VP8X_EXIF;
        }
        b"VP8L" => {
            // 14 bits width-1, 14 bits height-1, 1 bit alpha, after the 0x2f signature.
            let bits = u32::from_le_bytes([webp[21], webp[22], webp[23], webp[24]]);
            let width_minus_one = bits & 0x3FFF;
            let height_minus_one = (bits >> 14) & 0x3FFF;
            let mut flags = VP8X_EXIF;
            if (bits >> 28) & 1 == 1 {
                flags |= VP8X_ALPHA;
            }
            out.extend_from_slice(b"VP8X");
            out.extend_from_slice(&10u32.to_le_bytes());
            out.extend_from_slice(&[flags, 0, 0, 0]);
            out.extend_from_slice(&width_minus_one.to_le_bytes()[..3]);
            out.extend_from_slice(&height_minus_one.to_le_bytes()[..3]);
            out.extend_from_slice(&webp[12..]);
        }
        _ => return None,
    }

    out.extend_from_slice(b"EXIF");
    out.extend_from_slice(&exif_len.to_le_bytes());
    out.extend_from_slice(exif);
    if exif.len() % 2 == 1 {
        out.push(0);
    }
    let riff_size = u32::try_from(out.len() - 8).ok()?;
    out[4..8].copy_from_slice(&riff_size.to_le_bytes());
    Some(out)
}
