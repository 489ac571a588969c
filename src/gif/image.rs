//! Raster types read by the encoder.

use super::errors::{GifError, GifResult};
use super::{Palette, Rgba};



/// Anything the encoder can read pixels from.
pub trait PixelSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn pixel(&self, x: u32, y: u32) -> Rgba;

    /// Palette-indexed view of this source, if it already is one.
    fn as_indexed(&self) -> Option<&IndexedImage> {
        None
    }

    fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

macro_rules! delegate_pixel_source {
    ($($target:ty),*) => {
        $(
            impl<'a, T: PixelSource + ?Sized> PixelSource for $target {
                fn width(&self) -> u32 {
                    (**self).width()
                }

                fn height(&self) -> u32 {
                    (**self).height()
                }

                fn pixel(&self, x: u32, y: u32) -> Rgba {
                    (**self).pixel(x, y)
                }

                fn as_indexed(&self) -> Option<&IndexedImage> {
                    (**self).as_indexed()
                }
            }
        )*
    }
}

delegate_pixel_source!(&'a T, Box<T>);

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RgbaImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexedImage {
    width: u32,
    height: u32,
    palette: Palette,
    transparent: Option<u8>,
    pixels: Vec<u8>,
}


impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Rect { x, y, width, height }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}


impl RgbaImage {
    pub fn new(width: u32, height: u32) -> Self {
        RgbaImage::filled(width, height, Rgba::TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        RgbaImage { width, height, pixels: vec![color; width as usize * height as usize] }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgba>) -> GifResult<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(GifError::InvalidImageData(expected, pixels.len()));
        }
        Ok(RgbaImage { width, height, pixels })
    }

    /// Builds an image from packed RGBA bytes.
    pub fn from_raw(width: u32, height: u32, data: &[u8]) -> GifResult<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(GifError::InvalidImageData(expected, data.len()));
        }
        let pixels = data.chunks(4).map(|it| Rgba::new(it[0], it[1], it[2], it[3])).collect();
        Ok(RgbaImage { width, height, pixels })
    }

    /// Copies any pixel source.
    pub fn from_source(source: &dyn PixelSource) -> Self {
        let (width, height) = (source.width(), source.height());
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0 .. height {
            for x in 0 .. width {
                pixels.push(source.pixel(x, y));
            }
        }
        RgbaImage { width, height, pixels }
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgba] {
        &mut self.pixels
    }

    pub fn row(&self, y: u32) -> &[Rgba] {
        let start = y as usize * self.width as usize;
        &self.pixels[start .. start + self.width as usize]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        let index = y as usize * self.width as usize + x as usize;
        self.pixels[index] = color;
    }

    pub fn fill(&mut self, color: Rgba) {
        for it in self.pixels.iter_mut() {
            *it = color;
        }
    }

    pub fn crop(&self, rect: Rect) -> RgbaImage {
        let mut pixels = Vec::with_capacity(rect.area());
        for y in rect.y .. rect.bottom() {
            pixels.extend_from_slice(&self.row(y)[rect.x as usize .. rect.right() as usize]);
        }
        RgbaImage { width: rect.width, height: rect.height, pixels }
    }
}

impl PixelSource for RgbaImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel(&self, x: u32, y: u32) -> Rgba {
        self.pixels[y as usize * self.width as usize + x as usize]
    }
}


impl IndexedImage {
    /// The transparent index is taken from the palette's first non-opaque entry.
    pub fn new(width: u32, height: u32, palette: Palette, pixels: Vec<u8>) -> GifResult<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(GifError::InvalidImageData(expected, pixels.len()));
        }
        let transparent = palette.transparent_index();
        Ok(IndexedImage { width, height, palette, transparent, pixels })
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn transparent(&self) -> Option<u8> {
        self.transparent
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn index(&self, x: u32, y: u32) -> u8 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Usable as-is: at most one non-opaque palette entry.
    pub fn has_single_transparency(&self) -> bool {
        self.palette.alpha_entries() <= 1
    }

    /// Index used for transparency, appending a transparent entry if needed.
    /// Returns `None` when the palette is full and has no transparent entry.
    pub fn ensure_transparent(&mut self) -> Option<u8> {
        if self.transparent.is_none() {
            self.transparent = self.palette.push(Rgba::TRANSPARENT);
        }
        self.transparent
    }

    pub fn set_index(&mut self, x: u32, y: u32, index: u8) {
        let offset = y as usize * self.width as usize + x as usize;
        self.pixels[offset] = index;
    }

    /// Copies out the given rectangle.
    pub fn crop(&self, rect: Rect) -> IndexedImage {
        let mut pixels = Vec::with_capacity(rect.area());
        for y in rect.y .. rect.bottom() {
            let start = y as usize * self.width as usize;
            pixels.extend_from_slice(&self.pixels[start + rect.x as usize .. start + rect.right() as usize]);
        }
        IndexedImage {
            width: rect.width,
            height: rect.height,
            palette: self.palette.clone(),
            transparent: self.transparent,
            pixels,
        }
    }

    /// True if the pixel at `(x, y)` shows something.
    pub fn is_visible(&self, x: u32, y: u32) -> bool {
        Some(self.index(x, y)) != self.transparent
    }
}

impl PixelSource for IndexedImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel(&self, x: u32, y: u32) -> Rgba {
        let index = self.index(x, y);
        if Some(index) == self.transparent {
            return Rgba::TRANSPARENT;
        }
        self.palette.get(index).unwrap_or(Rgba::TRANSPARENT)
    }

    fn as_indexed(&self) -> Option<&IndexedImage> {
        Some(self)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_size_check() {
        assert!(RgbaImage::from_raw(2, 2, &[0; 15]).is_err());
        let image = RgbaImage::from_raw(1, 1, &[1, 2, 3, 4]).unwrap();
        assert_eq!(image.pixel(0, 0), Rgba::new(1, 2, 3, 4));
    }

    #[test]
    fn test_ensure_transparent() {
        let palette = Palette::new(vec![Rgba::opaque(1, 1, 1)]).unwrap();
        let mut image = IndexedImage::new(1, 1, palette, vec![0]).unwrap();
        assert_eq!(image.transparent(), None);
        assert_eq!(image.ensure_transparent(), Some(1));
        assert_eq!(image.palette().len(), 2);

        let palette = Palette::new(vec![Rgba::opaque(1, 1, 1); 256]).unwrap();
        let mut image = IndexedImage::new(1, 1, palette, vec![0]).unwrap();
        assert_eq!(image.ensure_transparent(), None);
    }

    #[test]
    fn test_crop() {
        let palette = Palette::new(vec![Rgba::opaque(0, 0, 0); 9]).unwrap();
        let image = IndexedImage::new(3, 3, palette, (0 .. 9).collect()).unwrap();
        let cropped = image.crop(Rect::new(1, 1, 2, 2));
        assert_eq!(cropped.pixels(), &[4, 5, 7, 8]);
    }
}
