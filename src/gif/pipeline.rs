//! Turns input frames into ready-to-write GIF frames.
//!
//! Every frame goes through the same steps: it is prepared (delay, canvas
//! placement), its disposal is decided by looking one frame ahead, unchanged
//! pixels are replaced by transparency, then it is quantized, trimmed to its
//! visible area and committed to the render buffer.

use log::debug;

use super::animation::AnimationOptions;
use super::errors::{GifError, GifResult};
use super::image::{IndexedImage, PixelSource, Rect, RgbaImage};
use super::quantizer::{DefaultQuantizer, Quantizer};
use super::render::RenderBuffer;
use super::validators::validate_canvas;
use super::{AnimationMode, Delay, DisposalMethod, SizeHandling};



/// Observes the encoding and may cancel it.
pub trait Progress {
    fn frame_done(&mut self, _index: usize) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

pub struct NoProgress;

/// A frame ready for the stream writer.
#[derive(Clone, Debug)]
pub struct FrameDescriptor {
    pub image: IndexedImage,
    pub x: u32,
    pub y: u32,
    /// Hundredths of a second
    pub delay: u16,
    pub disposal: DisposalMethod,
}

/// Canvas-sized frame before quantization.
#[derive(Clone, Debug)]
pub enum Working {
    Rgba(RgbaImage),
    Indexed(IndexedImage),
}

#[derive(Clone, Debug)]
struct Prepared {
    index: usize,
    image: Working,
    delay: u16,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Running,
    Draining,
    Done,
}

pub struct Pipeline<'o, I: Iterator> {
    frames: I,
    delays: &'o [Delay],
    options: &'o AnimationOptions,
    default_quantizer: DefaultQuantizer,
    canvas: (u32, u32),
    state: State,
    render: RenderBuffer,
    committed: bool,
    lookahead: Option<Prepared>,
    first: Option<Working>,
    reverse: Vec<Prepared>,
    fetched: usize,
    emitted: usize,
}


impl Progress for NoProgress {}


impl Working {
    pub fn width(&self) -> u32 {
        match self {
            Working::Rgba(image) => image.width(),
            Working::Indexed(image) => image.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Working::Rgba(image) => image.height(),
            Working::Indexed(image) => image.height(),
        }
    }

    pub fn is_opaque(&self, x: u32, y: u32, alpha_threshold: u8) -> bool {
        match self {
            Working::Rgba(image) => image.pixel(x, y).is_opaque(alpha_threshold),
            Working::Indexed(image) => image.is_visible(x, y) && image.pixel(x, y).is_opaque(alpha_threshold),
        }
    }
}


/// `Background` if some pixel opaque in `current` is transparent in `next`,
/// since only a disposal can make a pixel transparent again.
pub fn infer_disposal(current: &Working, next: &Working, alpha_threshold: u8, progress: &dyn Progress) -> GifResult<DisposalMethod> {
    for y in 0 .. current.height() {
        if progress.is_cancelled() {
            return Err(GifError::Cancelled);
        }
        for x in 0 .. current.width() {
            if current.is_opaque(x, y, alpha_threshold) && !next.is_opaque(x, y, alpha_threshold) {
                return Ok(DisposalMethod::Background);
            }
        }
    }
    Ok(DisposalMethod::Keep)
}

/// Smallest rectangle containing every visible pixel.
pub fn visible_bounds(image: &IndexedImage) -> Option<Rect> {
    let (mut left, mut top, mut right, mut bottom) = (image.width(), image.height(), 0, 0);
    for y in 0 .. image.height() {
        for x in 0 .. image.width() {
            if image.is_visible(x, y) {
                left = left.min(x);
                top = top.min(y);
                right = right.max(x + 1);
                bottom = bottom.max(y + 1);
            }
        }
    }
    if right <= left || bottom <= top {
        return None;
    }
    Some(Rect::new(left, top, right - left, bottom - top))
}

/// Clips `image` to its visible area. A fully transparent image becomes
/// a single transparent pixel at the center of the canvas.
pub fn trim(image: IndexedImage) -> GifResult<(IndexedImage, u32, u32)> {
    let transparent = match image.transparent() {
        Some(transparent) => transparent,
        None => return Ok((image, 0, 0)),
    };
    if image.pixels().iter().all(|it| *it == transparent) {
        let rect = Rect::new(image.width() / 2, image.height() / 2, 1, 1);
        return Ok((image.crop(rect), rect.x, rect.y));
    }
    let rect = visible_bounds(&image).ok_or(GifError::InvariantViolation("visible image without bounds"))?;
    if rect.area() == image.pixels().len() {
        return Ok((image, 0, 0));
    }
    Ok((image.crop(rect), rect.x, rect.y))
}

/// Draws `source` at the center of a transparent canvas, cropping what does not fit.
pub fn center(source: &dyn PixelSource, width: u32, height: u32) -> RgbaImage {
    let mut result = RgbaImage::new(width, height);
    let offset_x = (i64::from(width) - i64::from(source.width())) / 2;
    let offset_y = (i64::from(height) - i64::from(source.height())) / 2;
    for y in 0 .. height {
        let source_y = i64::from(y) - offset_y;
        if source_y < 0 || i64::from(source.height()) <= source_y {
            continue;
        }
        for x in 0 .. width {
            let source_x = i64::from(x) - offset_x;
            if source_x < 0 || i64::from(source.width()) <= source_x {
                continue;
            }
            result.set_pixel(x, y, source.pixel(source_x as u32, source_y as u32));
        }
    }
    result
}

/// Stretches `source` over the canvas, nearest neighbour.
pub fn resize(source: &dyn PixelSource, width: u32, height: u32) -> RgbaImage {
    let mut result = RgbaImage::new(width, height);
    for y in 0 .. height {
        let source_y = (u64::from(y) * u64::from(source.height()) / u64::from(height)) as u32;
        for x in 0 .. width {
            let source_x = (u64::from(x) * u64::from(source.width()) / u64::from(width)) as u32;
            result.set_pixel(x, y, source.pixel(source_x, source_y));
        }
    }
    result
}


impl<'o, I, S> Pipeline<'o, I> where I: Iterator<Item = S>, S: PixelSource {
    /// Fetches the first frame to learn the canvas size.
    pub fn new(mut frames: I, delays: &'o [Delay], options: &'o AnimationOptions) -> GifResult<Self> {
        let first = frames.next().ok_or(GifError::NoFrames)?;
        if first.is_empty() {
            return Err(GifError::EmptyFrame(0));
        }
        let (width, height) = options.size.unwrap_or((first.width(), first.height()));
        validate_canvas(width, height)?;

        let mut instance = Pipeline {
            frames,
            delays,
            options,
            default_quantizer: DefaultQuantizer::default(),
            canvas: (width, height),
            state: State::Running,
            render: RenderBuffer::new(width, height),
            committed: false,
            lookahead: None,
            first: None,
            reverse: vec![],
            fetched: 0,
            emitted: 0,
        };
        let prepared = instance.prepare(&first)?;
        if options.mode.is_looping() {
            instance.first = Some(prepared.image.clone());
        }
        instance.lookahead = Some(prepared);
        Ok(instance)
    }

    pub fn canvas(&self) -> (u32, u32) {
        self.canvas
    }

    pub fn quantizer(&self) -> &dyn Quantizer {
        match self.options.quantizer.as_ref() {
            Some(quantizer) => &**quantizer,
            None => &self.default_quantizer,
        }
    }

    /// Produces the next frame to write, or `None` when the animation is complete.
    pub fn next_frame(&mut self, progress: &mut dyn Progress) -> GifResult<Option<FrameDescriptor>> {
        if self.state == State::Done {
            return Ok(None);
        }
        if progress.is_cancelled() {
            return Err(GifError::Cancelled);
        }

        let mut current = match self.lookahead.take() {
            Some(current) => current,
            None => {
                self.state = State::Done;
                return Ok(None);
            }
        };
        self.lookahead = self.advance(&current)?;

        let alpha_threshold = self.quantizer().alpha_threshold();
        let disposal = self.disposal(&current, alpha_threshold, &*progress)?;

        if let Some(alpha_threshold) = alpha_threshold {
            let use_delta = self.options.allow_delta_frames
                && self.committed
                && !self.render.is_cleared()
                && disposal != DisposalMethod::Background;
            if use_delta {
                self.generate_delta(&mut current.image, alpha_threshold, &*progress)?;
            }
        }

        let indexed = match current.image {
            Working::Indexed(indexed) => indexed,
            Working::Rgba(rgba) => self.quantizer().quantize(&rgba, self.options.ditherer.as_ref().map(|it| &**it))?,
        };

        let (image, x, y) = if self.options.encode_transparent_borders {
            (indexed, 0, 0)
        } else {
            trim(indexed)?
        };

        if disposal == DisposalMethod::Background {
            self.render.clear();
        } else {
            self.render.composite(&image, x, y);
        }
        self.committed = true;

        debug!(
            "pipeline frame {} (input {}): {}x{} at ({}, {}), disposal={:?}, delay={}",
            self.emitted, current.index, image.width(), image.height(), x, y, disposal, current.delay);
        progress.frame_done(self.emitted);
        self.emitted += 1;

        Ok(Some(FrameDescriptor { image, x, y, delay: current.delay, disposal }))
    }

    /// Fetches the frame after `current`, buffering ping-pong frames on the way.
    fn advance(&mut self, current: &Prepared) -> GifResult<Option<Prepared>> {
        if self.state == State::Draining {
            return Ok(self.reverse.pop());
        }
        match self.frames.next() {
            Some(source) => {
                let next = self.prepare(&source)?;
                if self.options.mode == AnimationMode::PingPong && 0 < current.index {
                    self.reverse.push(current.clone());
                }
                Ok(Some(next))
            },
            None => {
                self.state = State::Draining;
                Ok(self.reverse.pop())
            },
        }
    }

    fn prepare(&mut self, source: &S) -> GifResult<Prepared> {
        let index = self.fetched;
        self.fetched += 1;
        if source.is_empty() {
            return Err(GifError::EmptyFrame(index));
        }

        let delay = self.delays.get(index)
            .or_else(|| self.delays.last())
            .cloned()
            .unwrap_or_default()
            .clamped(self.options.zero_delay);

        let (width, height) = self.canvas;
        let image = if (source.width(), source.height()) == self.canvas {
            match source.as_indexed() {
                Some(indexed) if indexed.has_single_transparency() => Working::Indexed(indexed.clone()),
                _ => Working::Rgba(RgbaImage::from_source(source)),
            }
        } else {
            match self.options.size_handling {
                SizeHandling::ErrorIfDiffers => return Err(GifError::FrameSizeMismatch {
                    index,
                    width: source.width(),
                    height: source.height(),
                    canvas_width: width,
                    canvas_height: height,
                }),
                SizeHandling::Center => Working::Rgba(center(source, width, height)),
                SizeHandling::Resize => Working::Rgba(resize(source, width, height)),
            }
        };

        Ok(Prepared { index, image, delay })
    }

    fn disposal(&self, current: &Prepared, alpha_threshold: Option<u8>, progress: &dyn Progress) -> GifResult<DisposalMethod> {
        let next = self.lookahead.as_ref().map(|it| &it.image);
        let is_last = next.is_none();

        if !self.options.allow_delta_frames {
            if is_last && !self.options.mode.is_looping() {
                return Ok(DisposalMethod::Keep);
            }
            return Ok(DisposalMethod::Background);
        }

        let alpha_threshold = match alpha_threshold {
            Some(alpha_threshold) => alpha_threshold,
            None => return Ok(DisposalMethod::Keep),
        };
        match next.or_else(|| self.first.as_ref()) {
            Some(next) => infer_disposal(&current.image, next, alpha_threshold, progress),
            None => Ok(DisposalMethod::Keep),
        }
    }

    fn generate_delta(&self, working: &mut Working, alpha_threshold: u8, progress: &dyn Progress) -> GifResult<()> {
        let tolerance = self.options.delta_tolerance;
        if let Working::Indexed(indexed) = working {
            if let Some(transparent) = indexed.ensure_transparent() {
                self.render.delta_indexed(indexed, transparent, tolerance, progress)?;
                return Ok(());
            }
            *working = Working::Rgba(RgbaImage::from_source(&*indexed));
        }
        if let Working::Rgba(rgba) = working {
            self.render.delta(rgba, alpha_threshold, tolerance, progress)?;
        }
        Ok(())
    }
}
