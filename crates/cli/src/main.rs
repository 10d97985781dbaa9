//! CLI tool for normalizing fonts and colors in PowerPoint files.

use anyhow::{bail, Context, Result};
use clap::Parser;
use restyle_core::{Error, PresentationFormat, RgbColor, StyleConfig};
use restyle_pptx::{apply_styles, PptxPresentation};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Apply a unified font and color palette to every slide of a .pptx file.
#[derive(Parser, Debug)]
#[command(name = "pptx-restyle")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PowerPoint file (.pptx)
    input: PathBuf,

    /// Output file (default: <input>_restyled.pptx next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML configuration file (default: built-in font and color table)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Font applied to every text run
    #[arg(short, long)]
    font: Option<String>,

    /// Extra color mapping, e.g. 4F9F9B=0065B1 (repeatable)
    #[arg(short, long = "map", value_name = "OLD=NEW", value_parser = parse_mapping)]
    map: Vec<(RgbColor, RgbColor)>,

    /// Also set the East Asian typeface of each run
    #[arg(long)]
    east_asian: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let config = load_config(&args)?;
    let output_path = get_output_path(&args.input, args.output.as_ref());

    if same_file(&args.input, &output_path) {
        bail!(
            "Output path {} is the input file; choose a different output",
            output_path.display()
        );
    }

    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .and_then(PresentationFormat::from_extension);
    if extension != Some(PresentationFormat::Pptx) {
        log::warn!(
            "{} does not have a .pptx extension; format is checked from its contents",
            args.input.display()
        );
    }

    log::info!("Processing: {}", args.input.display());
    let mut presentation = PptxPresentation::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    log::debug!("Found {} slides", presentation.slide_count());

    let report = apply_styles(&mut presentation, &config);
    log::info!("{}", report);

    match presentation.save(&output_path) {
        Ok(()) => {
            log::info!("Written to: {}", output_path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ Error::OutputLocked { .. }) => {
            log::error!("{} (is the file open in another program?)", e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            log::error!("Failed to save {}: {}", output_path.display(), e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Build the effective configuration: file (or built-in) plus CLI overrides.
fn load_config(args: &Args) -> Result<StyleConfig> {
    let mut config = match &args.config {
        Some(path) => StyleConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => StyleConfig::default(),
    };

    if let Some(font) = &args.font {
        config = config.with_font_name(font.as_str());
    }
    if args.east_asian {
        config = config.with_east_asian(true);
    }
    if !args.map.is_empty() {
        let colors = config.colors.merged(args.map.iter().copied());
        config = config.with_colors(colors);
    }

    config.validate().context("Invalid configuration")?;
    log::debug!(
        "Font '{}', {} color mappings",
        config.font_name,
        config.colors.len()
    );

    Ok(config)
}

/// Parse an `OLD=NEW` color mapping argument.
fn parse_mapping(s: &str) -> Result<(RgbColor, RgbColor), String> {
    let (from, to) = s
        .split_once('=')
        .ok_or_else(|| format!("expected OLD=NEW, got '{}'", s))?;

    let from: RgbColor = from.trim().parse().map_err(|e| format!("{}", e))?;
    let to: RgbColor = to.trim().parse().map_err(|e| format!("{}", e))?;
    Ok((from, to))
}

/// Determine the output path for a processed file.
fn get_output_path(input_path: &Path, output: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = output {
        return path.clone();
    }

    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let output_filename = format!("{}_restyled.pptx", stem);

    match input_path.parent() {
        Some(parent) => parent.join(output_filename),
        None => PathBuf::from(output_filename),
    }
}

/// Whether two paths name the same file, resolving them when they exist.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
