use std::io;

use log::debug;

use super::encoder::Encoder;
use super::errors::GifResult;
use super::image::PixelSource;
use super::pipeline::{NoProgress, Pipeline, Progress};
use super::quantizer::{Ditherer, Quantizer};
use super::{AnimationMode, Delay, Frame, Meta, SizeHandling, ZeroDelay};



pub struct AnimationOptions {
    /// Canvas size. Defaults to the size of the first frame.
    pub size: Option<(u32, u32)>,
    pub size_handling: SizeHandling,
    pub mode: AnimationMode,
    /// Write every frame at full canvas size instead of trimming transparent borders
    pub encode_transparent_borders: bool,
    /// Encode only what changed since the previous frame
    pub allow_delta_frames: bool,
    /// Per-channel difference under which a pixel counts as unchanged
    pub delta_tolerance: u8,
    pub zero_delay: ZeroDelay,
    /// `None` uses `DefaultQuantizer`
    pub quantizer: Option<Box<dyn Quantizer>>,
    pub ditherer: Option<Box<dyn Ditherer>>,
}


impl Default for AnimationOptions {
    fn default() -> Self {
        AnimationOptions {
            size: None,
            size_handling: SizeHandling::default(),
            mode: AnimationMode::default(),
            encode_transparent_borders: false,
            allow_delta_frames: true,
            delta_tolerance: 0,
            zero_delay: ZeroDelay::default(),
            quantizer: None,
            ditherer: None,
        }
    }
}


/// Encodes `frames` as an animation.
///
/// Frame `i` is shown for `delays[i]`; frames beyond the end of `delays` reuse its last entry.
pub fn encode_animation<W, I, S>(writer: &mut W, frames: I, delays: &[Delay], options: &AnimationOptions) -> GifResult<()>
where W: io::Write, I: IntoIterator<Item = S>, S: PixelSource {
    encode_animation_with_progress(writer, frames, delays, options, &mut NoProgress)
}

pub fn encode_animation_with_progress<W, I, S>(writer: &mut W, frames: I, delays: &[Delay], options: &AnimationOptions, progress: &mut dyn Progress) -> GifResult<()>
where W: io::Write, I: IntoIterator<Item = S>, S: PixelSource {
    let mut pipeline = Pipeline::new(frames.into_iter(), delays, options)?;
    let (width, height) = pipeline.canvas();

    let mut meta = Meta::new(width, height);
    meta.repeat = options.mode.repeat_count().map(u32::from);
    let mut encoder = Encoder::create(writer, meta)?;

    while let Some(descriptor) = pipeline.next_frame(progress)? {
        if encoder.frames_written() == 0 {
            encoder.set_global_palette(Some(descriptor.image.palette().clone()))?;
        }
        let frame = Frame {
            x: Some(descriptor.x),
            y: Some(descriptor.y),
            delay: Some(Delay::from_centiseconds(descriptor.delay)),
            disposal: Some(descriptor.disposal),
        };
        encoder.write_frame(&descriptor.image, Some(&frame))?;
    }

    debug!("animation of {} frames, {}x{}, mode={:?}", encoder.frames_written(), width, height, options.mode);
    encoder.finish()
}
