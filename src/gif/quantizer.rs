//! Color reduction to at most 256 palette entries.

use std::collections::HashMap;

use color_quant::NeuQuant;

use super::errors::GifResult;
use super::image::{IndexedImage, PixelSource, RgbaImage};
use super::{Palette, Rgba, DEFAULT_ALPHA_THRESHOLD, MAX_COLORS};



/// Channel levels of the 6x6x6 web-safe palette
pub const WEB_SAFE_LEVELS: [u8; 6] = [0x00, 0x33, 0x66, 0x99, 0xCC, 0xFF];

/// The 216 web-safe colors in red, green, blue order, then a transparent entry
pub const WEB_SAFE_PALETTE: [Rgba; 217] = web_safe_colors();

/// 8x8 Bayer threshold matrix
const BAYER: [[u8; 8]; 8] = [
    [ 0, 32,  8, 40,  2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44,  4, 36, 14, 46,  6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [ 3, 35, 11, 43,  1, 33,  9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47,  7, 39, 13, 45,  5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];


/// Maps true-color images to palette-indexed ones.
pub trait Quantizer {
    /// Pixels with a lower alpha become transparent.
    /// `None` if this quantizer can not produce a transparent color.
    fn alpha_threshold(&self) -> Option<u8>;

    fn quantize(&self, image: &RgbaImage, ditherer: Option<&dyn Ditherer>) -> GifResult<IndexedImage>;
}

/// Adjusts a color before it is mapped to the palette.
pub trait Ditherer {
    fn dither(&self, color: Rgba, x: u32, y: u32) -> Rgba;
}

/// Nearest-color search. Must not keep the palette beyond the call.
pub type NearestColor = fn(&Palette, Rgba) -> u8;

/// Exact palette for images with few colors, NeuQuant otherwise.
#[derive(Clone, Copy, Debug)]
pub struct DefaultQuantizer {
    /// NeuQuant sampling factor in [1, 30]. Lower is slower and better.
    pub speed: i32,
    pub alpha_threshold: u8,
}

/// Maps every pixel to the nearest entry of a fixed palette.
#[derive(Clone)]
pub struct PaletteQuantizer {
    palette: Palette,
    alpha_threshold: u8,
    nearest: NearestColor,
}

#[derive(Clone, Copy, Debug)]
pub struct OrderedDitherer {
    /// Maximum channel offset
    pub strength: u8,
}


impl Default for DefaultQuantizer {
    fn default() -> Self {
        DefaultQuantizer { speed: 10, alpha_threshold: DEFAULT_ALPHA_THRESHOLD }
    }
}

impl Quantizer for DefaultQuantizer {
    fn alpha_threshold(&self) -> Option<u8> {
        Some(self.alpha_threshold)
    }

    fn quantize(&self, image: &RgbaImage, ditherer: Option<&dyn Ditherer>) -> GifResult<IndexedImage> {
        if let Some(exact) = exact_palette(image, self.alpha_threshold) {
            return Ok(exact);
        }

        let has_transparent = image.pixels().iter().any(|it| !it.is_opaque(self.alpha_threshold));
        let colors = if has_transparent { MAX_COLORS - 1 } else { MAX_COLORS };
        let mut samples = Vec::with_capacity(image.pixels().len() * 4);
        for pixel in image.pixels().iter().filter(|it| it.is_opaque(self.alpha_threshold)) {
            samples.extend_from_slice(&[pixel.r, pixel.g, pixel.b, 0xff]);
        }
        let neu_quant = NeuQuant::new(self.speed.max(1).min(30), colors, &samples);

        let mut palette = Palette::from_rgb(&neu_quant.color_map_rgb())?;
        let transparent = if has_transparent { palette.push(Rgba::TRANSPARENT) } else { None };
        let mut pixels = Vec::with_capacity(image.pixels().len());
        for y in 0 .. image.height() {
            for (x, pixel) in image.row(y).iter().enumerate() {
                let index = match transparent {
                    Some(transparent) if !pixel.is_opaque(self.alpha_threshold) => transparent,
                    _ => {
                        let color = dither(ditherer, *pixel, x as u32, y);
                        neu_quant.index_of(&[color.r, color.g, color.b, 0xff]) as u8
                    },
                };
                pixels.push(index);
            }
        }
        IndexedImage::new(image.width(), image.height(), palette, pixels)
    }
}


impl PaletteQuantizer {
    pub fn new(palette: Palette) -> Self {
        PaletteQuantizer { palette, alpha_threshold: DEFAULT_ALPHA_THRESHOLD, nearest: nearest_color }
    }

    /// The 216 web-safe colors plus a transparent entry.
    pub fn web_safe() -> Self {
        PaletteQuantizer::new(Palette { colors: WEB_SAFE_PALETTE.to_vec() })
    }

    pub fn with_nearest(mut self, nearest: NearestColor) -> Self {
        self.nearest = nearest;
        self
    }

    pub fn with_alpha_threshold(mut self, alpha_threshold: u8) -> Self {
        self.alpha_threshold = alpha_threshold;
        self
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }
}

impl Quantizer for PaletteQuantizer {
    fn alpha_threshold(&self) -> Option<u8> {
        self.palette.transparent_index().map(|_| self.alpha_threshold)
    }

    fn quantize(&self, image: &RgbaImage, ditherer: Option<&dyn Ditherer>) -> GifResult<IndexedImage> {
        let transparent = self.palette.transparent_index();
        let mut pixels = Vec::with_capacity(image.pixels().len());
        for y in 0 .. image.height() {
            for (x, pixel) in image.row(y).iter().enumerate() {
                let index = match transparent {
                    Some(transparent) if !pixel.is_opaque(self.alpha_threshold) => transparent,
                    _ => (self.nearest)(&self.palette, dither(ditherer, *pixel, x as u32, y)),
                };
                pixels.push(index);
            }
        }
        IndexedImage::new(image.width(), image.height(), self.palette.clone(), pixels)
    }
}


impl Default for OrderedDitherer {
    fn default() -> Self {
        OrderedDitherer { strength: 16 }
    }
}

impl Ditherer for OrderedDitherer {
    fn dither(&self, color: Rgba, x: u32, y: u32) -> Rgba {
        let threshold = i32::from(BAYER[(y % 8) as usize][(x % 8) as usize]);
        let offset = (threshold * 2 - 63) * i32::from(self.strength) / 64;
        let apply = |channel: u8| (i32::from(channel) + offset).max(0).min(0xff) as u8;
        Rgba::new(apply(color.r), apply(color.g), apply(color.b), color.a)
    }
}


/// Nearest opaque entry by squared RGB distance.
pub fn nearest_color(palette: &Palette, color: Rgba) -> u8 {
    let distance = |it: &Rgba| {
        let d = |a: u8, b: u8| (i32::from(a) - i32::from(b)).pow(2);
        d(it.r, color.r) + d(it.g, color.g) + d(it.b, color.b)
    };
    palette.colors().iter()
        .enumerate()
        .filter(|(_, it)| it.a == 0xff)
        .min_by_key(|(_, it)| distance(it))
        .map(|(index, _)| index as u8)
        .unwrap_or(0)
}

/// Palette with every distinct color of `image`, if there are few enough.
/// Transparent pixels share one entry at the end.
pub fn exact_palette(image: &RgbaImage, alpha_threshold: u8) -> Option<IndexedImage> {
    let mut lookup: HashMap<Rgba, u8> = HashMap::new();
    let mut colors = vec![];
    let mut has_transparent = false;
    for pixel in image.pixels() {
        if !pixel.is_opaque(alpha_threshold) {
            has_transparent = true;
            continue;
        }
        let color = Rgba { a: 0xff, ..*pixel };
        if !lookup.contains_key(&color) {
            if MAX_COLORS <= colors.len() {
                return None;
            }
            lookup.insert(color, colors.len() as u8);
            colors.push(color);
        }
    }
    if has_transparent {
        if MAX_COLORS <= colors.len() {
            return None;
        }
        colors.push(Rgba::TRANSPARENT);
    }
    let transparent = colors.len().wrapping_sub(1) as u8;
    let pixels = image.pixels().iter()
        .map(|it| if it.is_opaque(alpha_threshold) { lookup[&Rgba { a: 0xff, ..*it }] } else { transparent })
        .collect();
    IndexedImage::new(image.width(), image.height(), Palette { colors }, pixels).ok()
}

fn dither(ditherer: Option<&dyn Ditherer>, color: Rgba, x: u32, y: u32) -> Rgba {
    match ditherer {
        Some(ditherer) => ditherer.dither(color, x, y),
        None => color,
    }
}


const fn web_safe_colors() -> [Rgba; 217] {
    let mut colors = [Rgba::TRANSPARENT; 217];
    let mut i = 0;
    while i < 216 {
        colors[i] = Rgba {
            r: WEB_SAFE_LEVELS[i / 36],
            g: WEB_SAFE_LEVELS[i / 6 % 6],
            b: WEB_SAFE_LEVELS[i % 6],
            a: 0xff,
        };
        i += 1;
    }
    colors
}
