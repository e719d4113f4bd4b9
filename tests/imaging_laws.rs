//! Algebraic properties of the operation pipeline on real pixels.

use image::{DynamicImage, Rgba, RgbaImage};
use simple_convert::imaging::{
    DecodedImage, Factor, ImageBackend, Operation, OperationDefaults, RustBackend, apply,
    output_suffix,
};

fn sample() -> DecodedImage {
    let pixels = RgbaImage::from_fn(9, 7, |x, y| {
        Rgba([
            (x * 28) as u8,
            (y * 36) as u8,
            ((x * y) % 256) as u8,
            if (x + y) % 3 == 0 { 255 } else { 60 },
        ])
    });
    DecodedImage::new(DynamicImage::ImageRgba8(pixels))
}

fn ops(specs: &[&str]) -> Vec<Operation> {
    let defaults = OperationDefaults::default();
    specs
        .iter()
        .map(|s| Operation::parse(s, &defaults).unwrap())
        .collect()
}

#[test]
fn empty_chain_is_identity() {
    let backend = RustBackend::new();
    let image = sample();
    assert_eq!(apply(&backend, image.clone(), &[]).unwrap(), image);
}

#[test]
fn unit_factors_are_identity() {
    let backend = RustBackend::new();
    let image = sample();
    let chain = ops(&["brightness=1", "contrast=1.0", "saturation=1", "sharpness=1.0"]);
    assert_eq!(apply(&backend, image.clone(), &chain).unwrap(), image);
}

#[test]
fn grayscale_is_idempotent() {
    let backend = RustBackend::new();
    let once = apply(&backend, sample(), &[Operation::Grayscale]).unwrap();
    let twice = apply(&backend, sample(), &[Operation::Grayscale, Operation::Grayscale]).unwrap();
    assert_eq!(once.pixels, twice.pixels);
}

#[test]
fn invert_is_an_involution() {
    let backend = RustBackend::new();
    let image = sample();
    let back = apply(&backend, image.clone(), &[Operation::Invert, Operation::Invert]).unwrap();
    assert_eq!(back.pixels, image.pixels);
}

#[test]
fn grayscale_keeps_alpha() {
    let backend = RustBackend::new();
    let image = sample();
    let gray = backend.transform(image.clone(), &Operation::Grayscale).unwrap();
    let alpha_in: Vec<u8> = image.pixels.to_rgba8().pixels().map(|p| p[3]).collect();
    let alpha_out: Vec<u8> = gray.pixels.to_luma_alpha8().pixels().map(|p| p[1]).collect();
    assert_eq!(alpha_in, alpha_out);
}

#[test]
fn suffix_reports_last_named_operation() {
    assert_eq!(output_suffix(&ops(&["grayscale", "invert"])), Some("Inverted"));
    assert_eq!(output_suffix(&ops(&["invert", "resize=4x4"])), Some("Inverted"));
    assert_eq!(output_suffix(&ops(&["resize=4x4", "strip-metadata"])), None);
}

#[test]
fn resize_then_enhance_composes_left_to_right() {
    let backend = RustBackend::new();
    let chain = vec![
        Operation::Resize("!4x3".parse().unwrap()),
        Operation::Contrast {
            factor: Factor::new(1.5),
        },
    ];
    let out = apply(&backend, sample(), &chain).unwrap();
    assert_eq!(out.dimensions(), (4, 3));
}
