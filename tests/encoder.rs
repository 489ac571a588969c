#![cfg_attr(feature = "benchmark", feature(test))]

#[cfg(feature = "benchmark")]
extern crate test;

use std::io;

use rand::prelude::*;
use rand::rngs::StdRng;

use gif_encoder::gif::animation::{encode_animation, encode_animation_with_progress, AnimationOptions};
use gif_encoder::gif::encoder::Encoder;
use gif_encoder::gif::errors::GifError;
use gif_encoder::gif::image::{IndexedImage, RgbaImage};
use gif_encoder::gif::layers::{encode_image, encode_layered_image, ImageOptions};
use gif_encoder::gif::pipeline::Progress;
use gif_encoder::gif::quantizer::PaletteQuantizer;
use gif_encoder::gif::{AnimationMode, Delay, DisposalMethod, Frame, Meta, Palette, Rgba, SizeHandling, ZeroDelay};

#[cfg(feature = "benchmark")]
use test::Bencher;



const RED: Rgba = Rgba { r: 0xFF, g: 0x00, b: 0x00, a: 0xFF };
const GREEN: Rgba = Rgba { r: 0x00, g: 0xFF, b: 0x00, a: 0xFF };
const BLUE: Rgba = Rgba { r: 0x00, g: 0x00, b: 0xFF, a: 0xFF };


struct Decoded {
    width: u16,
    height: u16,
    global_palette: Option<Vec<u8>>,
    frames: Vec<gif::Frame<'static>>,
    /// Canvas as shown after each frame
    snapshots: Vec<Vec<[u8; 4]>>,
}


fn decode(data: &[u8]) -> Decoded {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options.read_info(data).unwrap();
    let (width, height) = (decoder.width(), decoder.height());
    let global_palette = decoder.global_palette().map(|it| it.to_vec());

    let mut canvas = vec![[0u8; 4]; width as usize * height as usize];
    let mut frames = vec![];
    let mut snapshots = vec![];
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        let palette = frame.palette.clone().or_else(|| global_palette.clone()).unwrap();
        let saved = canvas.clone();
        for y in 0 .. frame.height as usize {
            for x in 0 .. frame.width as usize {
                let index = frame.buffer[y * frame.width as usize + x];
                if Some(index) == frame.transparent {
                    continue;
                }
                let offset = (frame.top as usize + y) * width as usize + frame.left as usize + x;
                let color = &palette[index as usize * 3 .. index as usize * 3 + 3];
                canvas[offset] = [color[0], color[1], color[2], 0xFF];
            }
        }
        snapshots.push(canvas.clone());
        match frame.dispose {
            gif::DisposalMethod::Background => {
                for y in frame.top as usize .. (frame.top + frame.height) as usize {
                    for x in frame.left as usize .. (frame.left + frame.width) as usize {
                        canvas[y * width as usize + x] = [0; 4];
                    }
                }
            },
            gif::DisposalMethod::Previous => canvas = saved,
            _ => (),
        }
        frames.push(frame.clone());
    }

    Decoded { width, height, global_palette, frames, snapshots }
}

fn expected(image: &RgbaImage) -> Vec<[u8; 4]> {
    image.pixels().iter()
        .map(|it| if it.a < 128 { [0; 4] } else { [it.r, it.g, it.b, 0xFF] })
        .collect()
}

fn animate(frames: &[RgbaImage], options: &AnimationOptions) -> Vec<u8> {
    let mut buffer = vec![];
    encode_animation(&mut buffer, frames.iter(), &[Delay::from_centiseconds(5)], options).unwrap();
    buffer
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|it| it == needle)
}

fn moving_square(width: u32, height: u32, size: u32, count: u32) -> Vec<RgbaImage> {
    (0 .. count).map(|i| {
        let mut image = RgbaImage::new(width, height);
        let (left, top) = (i * 3 % (width - size), i * 2 % (height - size));
        for y in top .. top + size {
            for x in left .. left + size {
                image.set_pixel(x, y, if (x + y) % 2 == 0 { RED } else { BLUE });
            }
        }
        image
    }).collect()
}

fn colorful(width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::new(width, height);
    for y in 0 .. height {
        for x in 0 .. width {
            let n = y * width + x;
            image.set_pixel(x, y, Rgba::opaque(n as u8, (n >> 8) as u8, 0x80));
        }
    }
    image
}


#[test]#[should_panic(expected="NoFrames")]
fn test_no_frames() {
    let frames: Vec<RgbaImage> = vec![];
    encode_animation(&mut io::sink(), frames, &[], &AnimationOptions::default()).unwrap();
}

#[test]#[should_panic(expected="FrameSizeMismatch")]
fn test_frame_size_mismatch() {
    let frames = vec![RgbaImage::filled(2, 2, RED), RgbaImage::filled(3, 2, RED)];
    encode_animation(&mut io::sink(), frames, &[], &AnimationOptions::default()).unwrap();
}

#[test]#[should_panic(expected="InvalidCanvasSize")]
fn test_canvas_too_large() {
    let frames = vec![RgbaImage::filled(2, 2, RED)];
    let options = AnimationOptions { size: Some((70000, 2)), size_handling: SizeHandling::Center, ..Default::default() };
    encode_animation(&mut io::sink(), frames, &[], &options).unwrap();
}

#[test]#[should_panic(expected="FrameOutOfCanvas")]
fn test_frame_out_of_canvas() {
    let palette = Palette::new(vec![RED, BLUE]).unwrap();
    let image = IndexedImage::new(2, 2, palette, vec![0; 4]).unwrap();
    let mut buffer: Vec<u8> = vec![];
    let mut encoder = Encoder::create(&mut buffer, Meta::new(3, 3)).unwrap();
    encoder.write_frame(&image, Some(&Frame { x: Some(2), ..Default::default() })).unwrap();
}

#[test]#[should_panic(expected="MissingPalette")]
fn test_missing_palette() {
    let image = IndexedImage::new(1, 1, Palette::default(), vec![0]).unwrap();
    let mut buffer: Vec<u8> = vec![];
    let mut encoder = Encoder::create(&mut buffer, Meta::new(1, 1)).unwrap();
    encoder.write_frame(&image, None).unwrap();
}

#[test]#[should_panic(expected="InvalidPixelIndex")]
fn test_pixel_out_of_palette() {
    let palette = Palette::new(vec![RED, BLUE]).unwrap();
    let image = IndexedImage::new(1, 1, palette, vec![2]).unwrap();
    let mut buffer: Vec<u8> = vec![];
    let mut encoder = Encoder::create(&mut buffer, Meta::new(1, 1)).unwrap();
    encoder.write_frame(&image, None).unwrap();
}

#[test]#[should_panic(expected="HeaderAlreadyWritten")]
fn test_change_after_header() {
    let palette = Palette::new(vec![RED, BLUE]).unwrap();
    let image = IndexedImage::new(1, 1, palette, vec![1]).unwrap();
    let mut buffer: Vec<u8> = vec![];
    let mut encoder = Encoder::create(&mut buffer, Meta::new(1, 1)).unwrap();
    encoder.write_frame(&image, None).unwrap();
    encoder.set_repeat(Some(0)).unwrap();
}

#[test]#[should_panic(expected="InvalidComment")]
fn test_non_ascii_comment() {
    let mut meta = Meta::new(1, 1);
    meta.comment = Some("café".to_owned());
    Encoder::create(&mut io::sink(), meta).unwrap();
}

#[test]#[should_panic(expected="TooManyColors(257)")]
fn test_palette_too_large() {
    Palette::new(vec![RED; 257]).unwrap();
}

#[test]#[should_panic(expected="EmptyFrame(1)")]
fn test_empty_frame_in_sequence() {
    let frames = vec![RgbaImage::filled(2, 2, RED), RgbaImage::new(0, 0), RgbaImage::filled(2, 2, RED)];
    encode_animation(&mut io::sink(), frames, &[], &AnimationOptions::default()).unwrap();
}

#[test]#[should_panic(expected="InvalidDelay(100000)")]
fn test_delay_too_long() {
    let image = IndexedImage::new(1, 1, Palette::new(vec![RED]).unwrap(), vec![0]).unwrap();
    let mut sink = io::sink();
    let mut encoder = Encoder::create(&mut sink, Meta::new(1, 1)).unwrap();
    let frame = Frame { delay: Some(Delay::new(1000, 1)), ..Default::default() };
    encoder.write_frame(&image, Some(&frame)).unwrap();
}

#[test]#[should_panic(expected="InvalidRepeatCount(70000)")]
fn test_repeat_count_too_large() {
    let mut meta = Meta::new(1, 1);
    meta.repeat = Some(70000);
    Encoder::create(&mut io::sink(), meta).unwrap();
}

#[test]
fn test_single_frame_stream() {
    let palette = Palette::new(vec![RED, BLUE]).unwrap();
    let image = IndexedImage::new(2, 2, palette, vec![0, 1, 1, 0]).unwrap();
    let mut buffer: Vec<u8> = vec![];
    let mut encoder = Encoder::create(&mut buffer, Meta::new(2, 2)).unwrap();
    encoder.write_frame(&image, None).unwrap();
    encoder.finish().unwrap();

    let mut expected = b"GIF89a".to_vec();
    expected.extend_from_slice(&[
        // Logical screen descriptor without global table
        0x02, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00,
        // Image descriptor with a local table of two colors
        0x2C, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x02, 0x00, 0x80,
        0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF,
        // clear 0 1 1 0 end
        0x02, 0x03, 0x44, 0x02, 0x05, 0x00,
        0x3B,
    ]);
    assert_eq!(buffer, expected);
}

#[test]
fn test_identical_frame_is_single_transparent_pixel() {
    let frames = vec![RgbaImage::filled(4, 4, RED), RgbaImage::filled(4, 4, GREEN), RgbaImage::filled(4, 4, GREEN)];
    let decoded = decode(&animate(&frames, &AnimationOptions::default()));

    assert_eq!(decoded.frames.len(), 3);
    let last = &decoded.frames[2];
    assert_eq!((last.left, last.top, last.width, last.height), (2, 2, 1, 1));
    assert_eq!(Some(last.buffer[0]), last.transparent);
    for (snapshot, frame) in decoded.snapshots.iter().zip(&frames) {
        assert_eq!(snapshot, &expected(frame));
    }
}

#[test]
fn test_repeat_forever() {
    let buffer = animate(&[RgbaImage::filled(2, 2, RED)], &AnimationOptions::default());
    let position = find(&buffer, b"NETSCAPE2.0").unwrap();
    assert_eq!(&buffer[position + 11 .. position + 16], &[0x03, 0x01, 0x00, 0x00, 0x00]);
}

#[test]
fn test_repeat_count() {
    let options = AnimationOptions { mode: AnimationMode::Count(3), ..Default::default() };
    let buffer = animate(&[RgbaImage::filled(2, 2, RED)], &options);
    let position = find(&buffer, b"NETSCAPE2.0").unwrap();
    assert_eq!(&buffer[position + 11 .. position + 16], &[0x03, 0x01, 0x03, 0x00, 0x00]);

    let options = AnimationOptions { mode: AnimationMode::PlayOnce, ..Default::default() };
    let buffer = animate(&[RgbaImage::filled(2, 2, RED)], &options);
    assert_eq!(find(&buffer, b"NETSCAPE2.0"), None);
}

#[test]
fn test_zero_delay_policy() {
    let frames = vec![RgbaImage::filled(2, 2, RED), RgbaImage::filled(2, 2, GREEN)];
    let delays = [Delay::from_centiseconds(0)];

    let options = AnimationOptions { zero_delay: ZeroDelay::Preserve, ..Default::default() };
    let mut buffer: Vec<u8> = vec![];
    encode_animation(&mut buffer, frames.iter(), &delays, &options).unwrap();
    let decoded = decode(&buffer);
    assert_eq!(decoded.frames.len(), 2);
    assert!(decoded.frames.iter().all(|it| it.delay == 0));

    let mut buffer: Vec<u8> = vec![];
    encode_animation(&mut buffer, frames.iter(), &delays, &AnimationOptions::default()).unwrap();
    assert!(decode(&buffer).frames.iter().all(|it| it.delay == 10));
}

#[test]
fn test_cancel_keeps_written_frames() {
    struct CancelAfter(usize);
    impl Progress for CancelAfter {
        fn frame_done(&mut self, _index: usize) {
            self.0 -= 1;
        }

        fn is_cancelled(&self) -> bool {
            self.0 == 0
        }
    }

    let frames = vec![RgbaImage::filled(2, 2, RED), RgbaImage::filled(2, 2, GREEN), RgbaImage::filled(2, 2, BLUE)];
    let mut buffer: Vec<u8> = vec![];
    let result = encode_animation_with_progress(
        &mut buffer, frames.iter(), &[], &AnimationOptions::default(), &mut CancelAfter(2));
    match result {
        Err(GifError::Cancelled) => (),
        other => panic!("expected cancellation: {:?}", other),
    }

    assert_eq!(&buffer[0 .. 6], b"GIF89a");
    // No trailer after the last image data block
    assert_eq!(buffer.last(), Some(&0x00));
    let mut decoder = gif::DecodeOptions::new().read_info(&buffer[..]).unwrap();
    let mut written = 0;
    while let Ok(Some(_)) = decoder.read_next_frame() {
        written += 1;
    }
    assert_eq!(written, 2);
}

#[test]
fn test_empty_comment_is_omitted() {
    let image = RgbaImage::filled(2, 2, RED);
    let mut without: Vec<u8> = vec![];
    encode_image(&mut without, &image, &ImageOptions::default()).unwrap();
    let options = ImageOptions { comment: Some(String::new()), ..Default::default() };
    let mut with_empty: Vec<u8> = vec![];
    encode_image(&mut with_empty, &image, &options).unwrap();
    assert_eq!(with_empty, without);
    assert_eq!(find(&with_empty, &[0x21, 0xFE]), None);
}

#[test]
fn test_many_colors_quantized() {
    let image = colorful(16, 17);
    let mut buffer = vec![];
    encode_image(&mut buffer, &image, &ImageOptions::default()).unwrap();
    let decoded = decode(&buffer);
    assert_eq!((decoded.width, decoded.height), (16, 17));
    let palette = decoded.frames[0].palette.clone().or(decoded.global_palette).unwrap();
    assert!(palette.len() <= 256 * 3);
}

#[test]
fn test_image_with_comment_and_fixed_palette() {
    let options = ImageOptions {
        quantizer: Some(Box::new(PaletteQuantizer::web_safe())),
        comment: Some("hello".to_owned()),
        ..Default::default()
    };
    let mut buffer = vec![];
    encode_image(&mut buffer, &RgbaImage::filled(3, 3, Rgba::opaque(0x31, 0x64, 0x98)), &options).unwrap();
    assert!(find(&buffer, &[0x21, 0xFE, 0x05, b'h', b'e', b'l', b'l', b'o', 0x00]).is_some());
    let decoded = decode(&buffer);
    assert_eq!(decoded.snapshots[0], vec![[0x33, 0x66, 0x99, 0xFF]; 9]);
}

#[test]
fn test_ping_pong() {
    let frames = vec![RgbaImage::filled(3, 3, RED), RgbaImage::filled(3, 3, GREEN), RgbaImage::filled(3, 3, BLUE)];
    let options = AnimationOptions { mode: AnimationMode::PingPong, ..Default::default() };
    let decoded = decode(&animate(&frames, &options));
    assert_eq!(decoded.snapshots.len(), 4);
    for (snapshot, index) in decoded.snapshots.iter().zip(&[0, 1, 2, 1]) {
        assert_eq!(snapshot, &expected(&frames[*index]));
    }
    assert!(decoded.frames.iter().all(|it| it.delay == 5));
}

#[test]
fn test_global_palette_reused() {
    let mut first = RgbaImage::filled(4, 4, BLUE);
    first.set_pixel(0, 0, RED);
    let mut second = RgbaImage::filled(4, 4, RED);
    second.set_pixel(3, 3, BLUE);
    let mut third = second.clone();
    third.set_pixel(0, 0, BLUE);
    let options = AnimationOptions { allow_delta_frames: false, mode: AnimationMode::PlayOnce, ..Default::default() };
    let decoded = decode(&animate(&[first, second, third], &options));
    assert_eq!(decoded.global_palette.as_ref().map(|it| &it[.. 6]), Some(&[0xFF, 0, 0, 0, 0, 0xFF][..]));
    assert!(decoded.frames[0].palette.is_none());
    assert!(decoded.frames[1].palette.is_none());
    // Same colors in another order
    assert!(decoded.frames[2].palette.is_some());
}

#[test]
fn test_disposal_keeps_canvas_correct() {
    let frames = moving_square(24, 16, 6, 12);
    for allow_delta_frames in &[true, false] {
        let options = AnimationOptions { allow_delta_frames: *allow_delta_frames, ..Default::default() };
        let decoded = decode(&animate(&frames, &options));
        assert_eq!(decoded.snapshots.len(), frames.len());
        for (snapshot, frame) in decoded.snapshots.iter().zip(&frames) {
            assert_eq!(snapshot, &expected(frame));
        }
    }
}

#[test]
fn test_disappearing_pixels_use_background_disposal() {
    let mut first = RgbaImage::filled(4, 4, RED);
    first.set_pixel(0, 0, BLUE);
    let second = RgbaImage::new(4, 4);
    let options = AnimationOptions { mode: AnimationMode::PlayOnce, ..Default::default() };
    let decoded = decode(&animate(&[first.clone(), second.clone(), first.clone()], &options));
    assert_eq!(decoded.frames[0].dispose, gif::DisposalMethod::Background);
    assert_eq!(decoded.snapshots[1], expected(&second));
    assert_eq!(decoded.snapshots[2], expected(&first));
}

#[test]
fn test_random_noise_animation() {
    let mut rng = StdRng::seed_from_u64(42);
    let frames: Vec<RgbaImage> = (0 .. 4).map(|_| {
        let mut image = RgbaImage::filled(32, 32, GREEN);
        for _ in 0 .. 40 {
            let (x, y) = (rng.gen_range(0, 32), rng.gen_range(0, 32));
            let color = if rng.gen::<bool>() { Rgba::TRANSPARENT } else { Rgba::opaque(rng.gen(), 0, 0) };
            image.set_pixel(x, y, color);
        }
        image
    }).collect();
    let decoded = decode(&animate(&frames, &AnimationOptions::default()));
    for (snapshot, frame) in decoded.snapshots.iter().zip(&frames) {
        assert_eq!(snapshot, &expected(frame));
    }
}

#[test]
fn test_center_and_resize() {
    let frames = vec![RgbaImage::filled(4, 4, RED), RgbaImage::filled(2, 2, BLUE)];

    let options = AnimationOptions { size_handling: SizeHandling::Center, ..Default::default() };
    let decoded = decode(&animate(&frames, &options));
    // Outside of the small frame is transparent, so the red frame is disposed
    let mut shown = RgbaImage::new(4, 4);
    for (x, y) in &[(1, 1), (2, 1), (1, 2), (2, 2)] {
        shown.set_pixel(*x, *y, BLUE);
    }
    assert_eq!(decoded.snapshots[1], expected(&shown));

    let options = AnimationOptions { size_handling: SizeHandling::Resize, ..Default::default() };
    let decoded = decode(&animate(&frames, &options));
    assert_eq!(decoded.snapshots[1], expected(&RgbaImage::filled(4, 4, BLUE)));
}

#[test]
fn test_layered_image_is_lossless() {
    let image = colorful(300, 3);
    let mut buffer = vec![];
    encode_layered_image(&mut buffer, &image, None).unwrap();
    let decoded = decode(&buffer);
    assert!(1 < decoded.frames.len());
    assert!(decoded.frames.iter().all(|it| it.delay == 0 && it.dispose == gif::DisposalMethod::Keep));
    assert_eq!(decoded.snapshots.last(), Some(&expected(&image)));
}

#[test]
fn test_session_frame_options() {
    let palette = Palette::new(vec![RED, Rgba::TRANSPARENT]).unwrap();
    let image = IndexedImage::new(1, 2, palette.clone(), vec![0, 1]).unwrap();
    let mut meta = Meta::new(3, 2);
    meta.global_palette = Some(palette);
    let mut buffer = vec![];
    let mut encoder = Encoder::create(&mut buffer, meta).unwrap();
    let frame = Frame { x: Some(2), delay: Some(Delay::new(1, 4)), disposal: Some(DisposalMethod::Previous), ..Default::default() };
    encoder.write_frame(&image, Some(&frame)).unwrap();
    encoder.finish().unwrap();

    let decoded = decode(&buffer);
    let frame = &decoded.frames[0];
    assert_eq!((frame.left, frame.top, frame.delay, frame.transparent), (2, 0, 25, Some(1)));
    assert_eq!(frame.dispose, gif::DisposalMethod::Previous);
    assert!(frame.palette.is_none());
}


#[bench]#[cfg(feature = "benchmark")]
fn bench_moving_square(b: &mut Bencher) {
    let frames = moving_square(120, 80, 30, 20);
    b.iter(|| animate(&frames, &AnimationOptions::default()));
}

#[bench]#[cfg(feature = "benchmark")]
fn bench_layered_image(b: &mut Bencher) {
    let image = colorful(200, 100);
    b.iter(|| {
        let mut buffer: Vec<u8> = vec![];
        encode_layered_image(&mut buffer, &image, None).unwrap();
        buffer
    });
}
