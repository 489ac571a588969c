
use std::env;
use std::fs::OpenOptions;
use std::io::{stdout, BufWriter, Write};
use std::path::Path;
use std::process::exit;

use enum_iterator::IntoEnumIterator;
use failure::Fail;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use gif_encoder::gif::animation::{encode_animation_with_progress, AnimationOptions};
use gif_encoder::gif::image::RgbaImage;
use gif_encoder::gif::layers::encode_layered_image;
use gif_encoder::gif::pipeline::Progress;
use gif_encoder::gif::quantizer::OrderedDitherer;
use gif_encoder::gif::{AnimationMode, Delay, SizeHandling, ZeroDelay};

mod errors;

use crate::errors::{AppResult, AppError};



#[derive(Clone, Debug, Eq, PartialEq)]
struct Entry {
    filepath: String,
    delay: Option<Delay>,
}

#[derive(Clone, Debug, Default)]
struct Setting {
    borders: bool,
    comment: Option<String>,
    dither: bool,
    entries: Vec<Entry>,
    layered: bool,
    mode: AnimationMode,
    no_delta: bool,
    size_handling: SizeHandling,
    tolerance: u8,
    zero_delay: ZeroDelay,
}

#[derive(Clone, Debug, Default)]
struct Parsed {
    output: Option<String>,
    setting: Setting,
}

struct ProgressReporter {
    bar: ProgressBar,
}


impl Progress for ProgressReporter {
    fn frame_done(&mut self, index: usize) {
        self.bar.set_position(index as u64 + 1);
    }
}


fn main() {
    env_logger::init();

    if let Err(err) = app() {
        let mut fail: &dyn Fail = &err;
        let mut message = err.to_string();
        while let Some(cause) = fail.cause() {
            message.push_str(&format!("\n\tcaused by: {}", cause));
            fail = cause;
        }
        eprintln!("{}\n", message);
        print_usage();
        exit(1);
    }
}

fn print_usage() {
    eprintln!(include_str!("usage.txt"));
}

fn app() -> AppResult<()> {
    let parsed = parse_args()?;

    if let Some(output) = parsed.output {
        let mut file = OpenOptions::new().write(true).create(true).truncate(true).open(output)?;
        compile(&mut file, &parsed.setting)
    } else {
        let out = stdout();
        let mut out = out.lock();
        compile(&mut out, &parsed.setting)
    }
}


fn compile<T: Write>(out: &mut T, setting: &Setting) -> AppResult<()> {
    let mut out = BufWriter::new(out);

    if setting.entries.is_empty() {
        return Err(AppError::NotEnoughArgument);
    }

    if setting.layered {
        let entry = &setting.entries[0];
        let image = load_image(&entry.filepath)?;
        encode_layered_image(&mut out, &image, setting.comment.clone())?;
        out.flush()?;
        return Ok(());
    }

    let progress_bar = ProgressBar::new(setting.entries.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:60.cyan/blue}] {pos:>4}/{len:4} frames encoded ({eta} remaining) | {msg}")
            .progress_chars("█▌ ")
    );

    let mut images = vec![];
    for entry in &setting.entries {
        progress_bar.set_message(&file_name(&entry.filepath));
        images.push(load_image(&entry.filepath)?);
    }
    progress_bar.set_message("encoding");

    let delays = make_delays(&setting.entries);
    let options = AnimationOptions {
        size_handling: setting.size_handling,
        mode: setting.mode,
        encode_transparent_borders: setting.borders,
        allow_delta_frames: !setting.no_delta,
        delta_tolerance: setting.tolerance,
        zero_delay: setting.zero_delay,
        ditherer: if setting.dither { Some(Box::new(OrderedDitherer::default())) } else { None },
        ..Default::default()
    };

    let mut reporter = ProgressReporter { bar: progress_bar };
    encode_animation_with_progress(&mut out, &images, &delays, &options, &mut reporter)?;
    out.flush()?;
    reporter.bar.finish_and_clear();
    info!("{} files encoded", images.len());

    Ok(())
}


fn parse_args() -> AppResult<Parsed> {
    let mut setting = Setting::default();
    let mut output = None;
    let mut delay = None;

    let mut args = env::args().skip(1);

    #[allow(clippy::while_let_on_iterator)]
    while let Some(arg) = args.next() {
        let mut next = || args.next().ok_or(AppError::NotEnoughArgument);

        match &*arg {
            "-h" | "--help" => {
                print_usage();
                exit(0);
            },
            "-d" | "--delay" =>
                delay = Some(parse_delay(&next()?)?),
            "-m" | "--mode" =>
                setting.mode = parse_mode(&next()?)?,
            "-s" | "--size" =>
                setting.size_handling = parse_size_handling(&next()?)?,
            "-z" | "--zero-delay" =>
                setting.zero_delay = parse_zero_delay(&next()?)?,
            "-t" | "--tolerance" =>
                setting.tolerance = next()?.parse()?,
            "--no-delta" =>
                setting.no_delta = true,
            "--borders" =>
                setting.borders = true,
            "--dither" =>
                setting.dither = true,
            "--comment" =>
                setting.comment = Some(next()?),
            "--layered" =>
                setting.layered = true,
            "-o" | "--output" =>
                output = Some(next()?),
            filepath => {
                let entry = Entry {
                    filepath: filepath.to_owned(),
                    delay,
                };
                setting.entries.push(entry);
            }
        }
    }

    Ok(Parsed { setting, output })
}


fn parse_delay(s: &str) -> AppResult<Delay> {
    if let Some(div) = s.find('/') {
        let (numerator, denominator) = s.split_at(div);
        let numerator = numerator.parse()?;
        let denominator = denominator[1..].parse()?;
        return Ok(Delay { numerator, denominator });
    }

    let numerator = s.parse()?;
    Ok(Delay { numerator, denominator: 1000 })
}

fn parse_mode(s: &str) -> AppResult<AnimationMode> {
    let result = match s {
        "once" => AnimationMode::PlayOnce,
        "repeat" => AnimationMode::Repeat,
        "pingpong" => AnimationMode::PingPong,
        count => AnimationMode::Count(count.parse()?),
    };
    Ok(result)
}

fn parse_size_handling(s: &str) -> AppResult<SizeHandling> {
    SizeHandling::into_enum_iter()
        .find(|it| it.name() == s)
        .ok_or_else(|| AppError::InvalidOptionValue(s.to_owned()))
}

fn parse_zero_delay(s: &str) -> AppResult<ZeroDelay> {
    ZeroDelay::into_enum_iter()
        .find(|it| it.name() == s)
        .ok_or_else(|| AppError::InvalidOptionValue(s.to_owned()))
}


fn file_name(filepath: &str) -> String {
    Path::new(filepath)
        .file_name()
        .map(|it| it.to_string_lossy().into_owned())
        .unwrap_or_else(|| filepath.to_owned())
}

fn load_image(filepath: &str) -> AppResult<RgbaImage> {
    let image = image::open(filepath)?.to_rgba();
    let (width, height) = image.dimensions();
    Ok(RgbaImage::from_raw(width, height, &image.into_raw())?)
}

/// Files without their own delay use the one given before them, or the default.
fn make_delays(entries: &[Entry]) -> Vec<Delay> {
    entries.iter()
        .map(|it| it.delay.unwrap_or_else(|| Delay::from_centiseconds(gif_encoder::gif::DEFAULT_DELAY)))
        .collect()
}
