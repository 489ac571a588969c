//! Static images.
//!
//! A true-color image can be written without any color loss by splitting it
//! into regions of at most 256 colors, each written as a zero-delay frame
//! that stays on the canvas.

use std::collections::HashSet;
use std::io;

use log::debug;

use super::encoder::Encoder;
use super::errors::{GifError, GifResult};
use super::image::{IndexedImage, PixelSource, Rect, RgbaImage};
use super::pipeline::visible_bounds;
use super::quantizer::{exact_palette, DefaultQuantizer, Ditherer, Quantizer};
use super::{Delay, DisposalMethod, Frame, Meta, Palette, Rgba, DEFAULT_ALPHA_THRESHOLD, MAX_COLORS};



#[derive(Default)]
pub struct ImageOptions {
    /// `None` uses `DefaultQuantizer`
    pub quantizer: Option<Box<dyn Quantizer>>,
    pub ditherer: Option<Box<dyn Ditherer>>,
    pub comment: Option<String>,
}


/// Encodes a single frame image. Indexed sources with at most one transparent
/// color are written as they are, anything else is quantized.
pub fn encode_image<W: io::Write>(writer: &mut W, source: &dyn PixelSource, options: &ImageOptions) -> GifResult<()> {
    if source.is_empty() {
        return Err(GifError::EmptyFrame(0));
    }

    let quantized;
    let image = match source.as_indexed() {
        Some(indexed) if indexed.has_single_transparency() => indexed,
        _ => {
            let default_quantizer = DefaultQuantizer::default();
            let quantizer: &dyn Quantizer = match options.quantizer.as_ref() {
                Some(quantizer) => &**quantizer,
                None => &default_quantizer,
            };
            quantized = quantizer.quantize(&RgbaImage::from_source(source), options.ditherer.as_ref().map(|it| &**it))?;
            &quantized
        },
    };

    let mut meta = Meta::new(image.width(), image.height());
    meta.global_palette = Some(image.palette().clone());
    meta.comment = options.comment.clone();
    let mut encoder = Encoder::create(writer, meta)?;
    encoder.write_frame(image, None)?;
    encoder.finish()
}

/// Encodes a true-color image losslessly as stacked layers of at most 256 colors.
pub fn encode_layered_image<W: io::Write>(writer: &mut W, source: &dyn PixelSource, comment: Option<String>) -> GifResult<()> {
    if source.is_empty() {
        return Err(GifError::EmptyFrame(0));
    }

    let image = RgbaImage::from_source(source);
    let mut meta = Meta::new(image.width(), image.height());
    meta.comment = comment;
    let mut encoder = Encoder::create(writer, meta)?;

    let frame = |rect: Rect| Frame {
        x: Some(rect.x),
        y: Some(rect.y),
        delay: Some(Delay::from_centiseconds(0)),
        disposal: Some(DisposalMethod::Keep),
    };

    for region in split_layers(&image, DEFAULT_ALPHA_THRESHOLD) {
        let layer = exact_palette(&image.crop(region), DEFAULT_ALPHA_THRESHOLD)
            .ok_or(GifError::InvariantViolation("layer with too many colors"))?;
        let bounds = match visible_bounds(&layer) {
            Some(bounds) => bounds,
            None => continue,
        };
        let layer = layer.crop(bounds);
        if encoder.frames_written() == 0 {
            encoder.set_global_palette(Some(layer.palette().clone()))?;
        }
        encoder.write_frame(&layer, Some(&frame(Rect::new(region.x + bounds.x, region.y + bounds.y, bounds.width, bounds.height))))?;
    }

    if encoder.frames_written() == 0 {
        let empty = IndexedImage::new(1, 1, Palette::new(vec![Rgba::TRANSPARENT])?, vec![0])?;
        encoder.set_global_palette(Some(empty.palette().clone()))?;
        encoder.write_frame(&empty, Some(&frame(Rect::new(0, 0, 1, 1))))?;
    }

    debug!("layered image {}x{} in {} layers", image.width(), image.height(), encoder.frames_written());
    encoder.finish()
}

/// Splits `image` into regions of at most 256 colors, counting transparency as one color.
/// Regions are bands of whole rows, or segments of one row when a single row has too many colors.
pub fn split_layers(image: &RgbaImage, alpha_threshold: u8) -> Vec<Rect> {
    let width = image.width();
    let mut layers = vec![];
    let mut colors: HashSet<Rgba> = HashSet::new();
    let mut top = 0;

    for y in 0 .. image.height() {
        let row: HashSet<Rgba> = image.row(y).iter().map(|it| normalize(*it, alpha_threshold)).collect();
        if MAX_COLORS < row.len() {
            if top < y {
                layers.push(Rect::new(0, top, width, y - top));
            }
            split_row(image, y, alpha_threshold, &mut layers);
            colors.clear();
            top = y + 1;
            continue;
        }
        if MAX_COLORS < colors.union(&row).count() {
            layers.push(Rect::new(0, top, width, y - top));
            colors = row;
            top = y;
        } else {
            colors.extend(row);
        }
    }

    if top < image.height() {
        layers.push(Rect::new(0, top, width, image.height() - top));
    }
    layers
}

fn split_row(image: &RgbaImage, y: u32, alpha_threshold: u8, layers: &mut Vec<Rect>) {
    let mut colors = HashSet::new();
    let mut left = 0;
    for (x, pixel) in image.row(y).iter().enumerate() {
        let x = x as u32;
        let color = normalize(*pixel, alpha_threshold);
        if colors.len() == MAX_COLORS && !colors.contains(&color) {
            layers.push(Rect::new(left, y, x - left, 1));
            colors.clear();
            left = x;
        }
        colors.insert(color);
    }
    layers.push(Rect::new(left, y, image.width() - left, 1));
}

fn normalize(color: Rgba, alpha_threshold: u8) -> Rgba {
    if color.is_opaque(alpha_threshold) {
        Rgba { a: 0xff, ..color }
    } else {
        Rgba::TRANSPARENT
    }
}
