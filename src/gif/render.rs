
use super::errors::{GifError, GifResult};
use super::image::{IndexedImage, PixelSource, RgbaImage};
use super::pipeline::Progress;
use super::Rgba;



/// What a decoder displays after the frames committed so far.
pub struct RenderBuffer {
    image: RgbaImage,
    cleared: bool,
}


impl RenderBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        RenderBuffer { image: RgbaImage::new(width, height), cleared: true }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// True until something is drawn after the last clear.
    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    pub fn clear(&mut self) {
        self.image.fill(Rgba::TRANSPARENT);
        self.cleared = true;
    }

    /// Draws the visible pixels of `frame` with its top-left corner at `(left, top)`.
    pub fn composite(&mut self, frame: &IndexedImage, left: u32, top: u32) {
        for y in 0 .. frame.height() {
            for x in 0 .. frame.width() {
                if !frame.is_visible(x, y) {
                    continue;
                }
                if let Some(color) = frame.palette().get(frame.index(x, y)) {
                    self.image.set_pixel(left + x, top + y, Rgba { a: 0xff, ..color });
                    self.cleared = false;
                }
            }
        }
    }

    /// Makes every pixel of `working` that already shows on screen transparent.
    /// Returns the number of pixels left to encode.
    pub fn delta(&self, working: &mut RgbaImage, alpha_threshold: u8, tolerance: u8, progress: &dyn Progress) -> GifResult<usize> {
        let width = working.width() as usize;
        let mut changed = 0;
        for (y, row) in working.pixels_mut().chunks_mut(width).enumerate() {
            if progress.is_cancelled() {
                return Err(GifError::Cancelled);
            }
            for (pixel, shown) in row.iter_mut().zip(self.image.row(y as u32)) {
                if !pixel.is_opaque(alpha_threshold) {
                    *pixel = Rgba::TRANSPARENT;
                } else if shown.is_opaque(alpha_threshold) && pixel.is_close(*shown, tolerance) {
                    *pixel = Rgba::TRANSPARENT;
                } else {
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    /// Same as `delta`, for frames that keep their own palette.
    pub fn delta_indexed(&self, working: &mut IndexedImage, transparent: u8, tolerance: u8, progress: &dyn Progress) -> GifResult<usize> {
        let mut changed = 0;
        for y in 0 .. working.height() {
            if progress.is_cancelled() {
                return Err(GifError::Cancelled);
            }
            for x in 0 .. working.width() {
                let shown = self.image.pixel(x, y);
                let index = working.index(x, y);
                if index == transparent {
                    continue;
                }
                let color = Rgba { a: 0xff, ..working.pixel(x, y) };
                if shown.a == 0xff && color.is_close(shown, tolerance) {
                    working.set_index(x, y, transparent);
                } else {
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }
}
