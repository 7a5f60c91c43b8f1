use clap::{Args, Parser, Subcommand};
use image_toolkit::config::{self, ToolkitConfig};
use image_toolkit::geometry::{Dimensions, ImageMeta, Rect, Size, to_natural};
use image_toolkit::imaging::{
    self, BatchEvent, BatchReport, BlendMode, Color, ExportBackend, RustBackend, write_outputs,
};
use image_toolkit::output;
use image_toolkit::overlay::{LayerDefaults, LayerStyle, TextStyle, WatermarkOverlay};
use image_toolkit::selection::parse_aspect;
use image_toolkit::types::{SourceImage, collect_sources};
use image_toolkit::workspace::CropWorkspace;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;

fn version_string() -> &'static str {
    let hash = env!("TOOLKIT_GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup
        Box::leak(format!("{}+{hash}", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "image-toolkit")]
#[command(about = "Crop and watermark images from a preview-space selection")]
#[command(long_about = "\
Crop and watermark images from a preview-space selection

Rectangles are given in display pixels: the size the image is shown at in
your preview (--display). They are mapped onto the image's natural pixels
for export, so the same rectangle works for any preview size.

With several inputs, the first image is the reference. Every other image
gets the same relative crop or watermark placement, and a report.json
listing outputs and skipped files is written next to them.

Run 'image-toolkit gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that export images.
#[derive(Args, Clone)]
struct ExportArgs {
    /// Image files or directories (walked recursively)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Preview size as WxH (defaults to the first image's natural size)
    #[arg(long, value_parser = parse_size)]
    display: Option<Size>,

    /// Selection in display pixels as x,y,w,h
    #[arg(long, value_parser = parse_rect)]
    rect: Option<Rect>,

    /// Output directory
    #[arg(long, short, default_value = "out")]
    output: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Crop images to a selection
    Crop {
        #[command(flatten)]
        export: ExportArgs,

        /// Lock the aspect ratio: W:H, a number, or "free"
        #[arg(long)]
        aspect: Option<String>,

        /// Quality for lossy formats (1-100)
        #[arg(long)]
        quality: Option<u8>,
    },
    /// Stamp a text or logo watermark onto images
    Watermark {
        #[command(flatten)]
        export: ExportArgs,

        /// Watermark text
        #[arg(long, conflicts_with = "logo")]
        text: Option<String>,

        /// Logo image file
        #[arg(long)]
        logo: Option<PathBuf>,

        /// Rotation in degrees, clockwise
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        rotation: f64,

        /// Scale factor applied around the box center
        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        /// Opacity in percent
        #[arg(long)]
        opacity: Option<u8>,

        /// normal, multiply, screen, overlay or lighten
        #[arg(long)]
        blend: Option<BlendMode>,

        /// Text colour as #RRGGBB or #RRGGBBAA
        #[arg(long)]
        color: Option<Color>,

        /// Glyph height in display pixels
        #[arg(long)]
        font_size: Option<f64>,

        #[arg(long)]
        bold: bool,

        #[arg(long)]
        underline: bool,
    },
    /// Map a display-space rectangle onto natural pixels
    Map {
        /// Preview size as WxH
        #[arg(long, value_parser = parse_size)]
        display: Size,

        /// Image size as WxH
        #[arg(long, value_parser = parse_dimensions)]
        natural: Dimensions,

        /// Rectangle in display pixels as x,y,w,h
        #[arg(long, value_parser = parse_rect)]
        rect: Rect,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Crop {
            export,
            aspect,
            quality,
        } => {
            let config = config::load_config(cli.config.as_deref())?;
            run_crop(&config, &export, aspect.as_deref(), quality)?;
        }
        Command::Watermark {
            export,
            text,
            logo,
            rotation,
            scale,
            opacity,
            blend,
            color,
            font_size,
            bold,
            underline,
        } => {
            let config = config::load_config(cli.config.as_deref())?;
            let defaults = LayerDefaults::from(&config.watermark);
            let style = LayerStyle {
                opacity: opacity
                    .map(|o| f32::from(o.min(100)) / 100.0)
                    .unwrap_or(defaults.style.opacity),
                blend: blend.unwrap_or(defaults.style.blend),
            };
            let layer = match logo {
                Some(path) => LayerArgs::Logo(path),
                None => LayerArgs::Text {
                    text: text.unwrap_or_else(|| defaults.text.clone()),
                    style: TextStyle {
                        font_size: font_size.unwrap_or(defaults.text_style.font_size),
                        color: color.unwrap_or(defaults.text_style.color),
                        bold,
                        underline,
                    },
                },
            };
            run_watermark(
                &config,
                &export,
                defaults,
                layer,
                style,
                rotation.to_radians(),
                scale,
            )?;
        }
        Command::Map {
            display,
            natural,
            rect,
        } => {
            let meta = ImageMeta::new(natural, display);
            output::print_mapping(&meta, &rect, &to_natural(&rect, &meta));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

enum LayerArgs {
    Text { text: String, style: TextStyle },
    Logo(PathBuf),
}

fn run_crop(
    config: &ToolkitConfig,
    args: &ExportArgs,
    aspect: Option<&str>,
    quality: Option<u8>,
) -> Result<(), Box<dyn std::error::Error>> {
    let sources = collect_sources(&args.inputs)?;
    let backend = RustBackend::with_max_canvas_pixels(config.export.max_canvas_pixels);
    let reference = first_source(&sources)?;
    let natural = backend.identify(reference)?;

    let quality = quality
        .map(imaging::Quality::new)
        .unwrap_or_else(|| config.export.quality());
    let mut workspace = CropWorkspace::new(
        config.selection.limits(),
        config.interaction.metrics(),
        quality,
    );
    workspace.add_images(sources.iter().cloned());
    workspace.image_loaded(natural, display_size(args.display, natural));
    workspace.set_aspect(aspect.map(parse_aspect).transpose()?.flatten());
    if let Some(rect) = args.rect {
        workspace.place_selection(rect);
    }
    let job = workspace
        .crop_job()
        .ok_or("no image could be loaded for cropping")?;

    if sources.len() == 1 {
        let out = imaging::export_crop(&backend, &job)?;
        write_outputs(&args.output, std::slice::from_ref(&out))?;
        println!("{} → {} ({}x{})", out.source_name, out.file_name, out.width, out.height);
        return Ok(());
    }

    let (tx, printer) = spawn_printer();
    let report = imaging::apply_crop_to_all(&backend, &job, &sources, Some(tx));
    finish_batch(printer, report, &args.output)
}

fn run_watermark(
    config: &ToolkitConfig,
    args: &ExportArgs,
    defaults: LayerDefaults,
    layer: LayerArgs,
    style: LayerStyle,
    rotation: f64,
    scale: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let sources = collect_sources(&args.inputs)?;
    let backend = RustBackend::with_max_canvas_pixels(config.export.max_canvas_pixels);
    let reference = first_source(&sources)?;
    let natural = backend.identify(reference)?;

    let mut overlay = WatermarkOverlay::new(
        display_size(args.display, natural),
        config.selection.limits(),
        config.interaction.metrics(),
        defaults,
    );
    let id = match layer {
        LayerArgs::Text { text, style: text_style } => overlay.add_text(text, text_style, style),
        LayerArgs::Logo(path) => {
            let logo = SourceImage::from_path(&path)?;
            overlay.add_logo(logo.name(), logo.shared_bytes(), style)
        }
    };
    if let Some(rect) = args.rect {
        overlay.place_layer(id, rect);
    }
    overlay.set_rotation(id, rotation);
    overlay.set_scale(id, scale);

    if sources.len() == 1 {
        let out = imaging::export_watermark(&backend, &overlay.job(reference))?;
        write_outputs(&args.output, std::slice::from_ref(&out))?;
        println!("{} → {} ({}x{})", out.source_name, out.file_name, out.width, out.height);
        return Ok(());
    }

    let (tx, printer) = spawn_printer();
    let report =
        imaging::apply_watermark_to_all(&backend, &overlay.layer_specs(), &sources, Some(tx));
    finish_batch(printer, report, &args.output)
}

fn first_source(sources: &[SourceImage]) -> Result<&SourceImage, &'static str> {
    sources.first().ok_or("no images found in the given inputs")
}

fn display_size(display: Option<Size>, natural: Dimensions) -> Size {
    display.unwrap_or(Size::new(natural.width as f64, natural.height as f64))
}

/// Print batch events as they arrive.
fn spawn_printer() -> (Sender<BatchEvent>, JoinHandle<()>) {
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_batch_event(&event) {
                println!("{}", line);
            }
        }
    });
    (tx, printer)
}

fn finish_batch(
    printer: JoinHandle<()>,
    report: imaging::operations::Result<BatchReport>,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    // The sender was moved into the batch, so the printer drains and exits.
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    let report = report?;
    write_outputs(output_dir, &report.outputs)?;
    let json = serde_json::to_string_pretty(&report.summary())?;
    std::fs::write(output_dir.join("report.json"), json)?;
    output::print_report(&report);
    Ok(())
}

// =============================================================================
// Argument parsers
// =============================================================================

fn parse_pair(s: &str) -> Result<(f64, f64), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got `{s}`"))?;
    let num = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && *n > 0.0)
            .ok_or_else(|| format!("invalid size `{s}`"))
    };
    Ok((num(w)?, num(h)?))
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = parse_pair(s)?;
    Ok(Size::new(w, h))
}

fn parse_dimensions(s: &str) -> Result<Dimensions, String> {
    let (w, h) = parse_pair(s)?;
    if w.fract() != 0.0 || h.fract() != 0.0 || w > u32::MAX as f64 || h > u32::MAX as f64 {
        return Err(format!("expected whole pixel counts, got `{s}`"));
    }
    Ok(Dimensions::new(w as u32, h as u32))
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("expected x,y,w,h, got `{s}`"))?;
    match parts.as_slice() {
        [x, y, w, h] if parts.iter().all(|v| v.is_finite()) => Ok(Rect::new(*x, *y, *w, *h)),
        _ => Err(format!("expected x,y,w,h, got `{s}`")),
    }
}
