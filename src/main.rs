use anyhow::{Context, Result};
use clap::Parser;
use image_compressor::app::App;
use image_compressor::models::{CompressionOptions, CompressionReport, Config, OutputFormat, ResizeMode};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "image-compressor")]
#[command(about = "Compress an image and save the result")]
struct CliArgs {
    /// Image file to compress.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Load base options from a JSON file (same field names as the web form).
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    #[arg(long, value_enum)]
    resize: Option<ResizeMode>,

    /// Target quality between 0.1 and 1.0.
    #[arg(long)]
    quality: Option<f64>,

    #[arg(long)]
    max_size_mb: Option<f64>,

    #[arg(long)]
    max_width: Option<u32>,

    #[arg(long)]
    max_height: Option<u32>,

    #[arg(long)]
    progressive: bool,

    /// Directory the compressed artifact is written to.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Clamp out-of-range options instead of rejecting them.
    #[arg(long)]
    clamp: bool,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

impl CliArgs {
    fn resolve_options(&self, defaults: CompressionOptions) -> Result<CompressionOptions> {
        let mut options: CompressionOptions = match &self.options {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                CompressionOptions::from_json(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => defaults,
        };

        if let Some(format) = self.format {
            options.format = format;
        }
        if let Some(resize) = self.resize {
            options.resize = resize;
        }
        if let Some(quality) = self.quality {
            options.quality = quality;
        }
        if let Some(max_size_mb) = self.max_size_mb {
            options.max_size_mb = max_size_mb;
        }
        if let Some(max_width) = self.max_width {
            options.max_width = max_width;
        }
        if let Some(max_height) = self.max_height {
            options.max_height = max_height;
        }
        if self.progressive {
            options.progressive = true;
        }
        Ok(options)
    }
}

fn print_report(report: &CompressionReport, json: bool) -> Result<()> {
    if json {
        println!("{}", report.to_json()?);
    } else {
        println!("Original size:   {}", report.original_size_label);
        println!("Compressed size: {}", report.compressed_size_label);
        println!("Size reduction:  {:.1}%", report.ratio);
        if let Some(artifact) = &report.artifact {
            println!("Saved:           {}", artifact);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_compressor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }

    let options = args.resolve_options(config.default_options.clone())?;
    info!("Compressing {}", args.input.display());

    let mut app = App::from_config(&config)?;
    let outcome = app.run(&args.input, options, args.clamp).await;
    app.finish();

    match outcome {
        Ok(report) => {
            print_report(&report, args.json)?;
            Ok(())
        }
        Err(e) => {
            error!("Compression failed: {}", e);
            std::process::exit(1);
        }
    }
}
