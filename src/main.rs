//! `tabnab-diff`: compare two screenshots from the command line, or serve
//! JSON comparison requests over stdin/stdout.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tabnab_diff::config::{load_config_file, DiffConfig};
use tabnab_diff::imgcomparator::{
    self, file_to_image, handle_request, render_overlay, save_image, DiffRequest, DiffResponse,
};

#[derive(Parser)]
#[command(version, about = "Detect content swaps between two screenshots")]
struct Args {
    /// Config file with `key value` lines overriding the defaults
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log engine statistics to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare a baseline screenshot against a fresh one
    Compare {
        before: PathBuf,
        after: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Write the after image with changed regions highlighted
        #[arg(long)]
        overlay: Option<PathBuf>,
    },
    /// Answer one JSON request per stdin line with one JSON response per line
    Serve,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => load_config_file(path)?,
        None => DiffConfig::default(),
    };

    match args.command {
        Command::Compare {
            before,
            after,
            json,
            overlay,
        } => run_compare(&before, &after, json, overlay, &config),
        Command::Serve => serve(&config),
    }
}

fn run_compare(
    before: &Path,
    after: &Path,
    json: bool,
    overlay: Option<PathBuf>,
    config: &DiffConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let before_img = file_to_image(before)?;
    let after_img = file_to_image(after)?;
    let result = imgcomparator::compare_with(&before_img, &after_img, config)?;

    if let Some(path) = overlay {
        save_image(&render_overlay(&after_img, &result), &path)?;
        tracing::info!(path = %path.display(), "overlay written");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Canvas: {}x{}", result.width, result.height);
    println!(
        "Mismatch: {:.2}% ({})",
        result.mismatch,
        result.overall_severity(config)
    );
    println!("Max ΔE: {:.2}", result.max_distance);
    println!("Regions: {}", result.regions.len());
    for region in &result.regions {
        println!(
            "  [{:>8}] x={} y={} w={} h={} ΔE={:.1}",
            region.level, region.x, region.y, region.w, region.h, region.max_distance
        );
    }
    Ok(())
}

fn serve(config: &DiffConfig) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<DiffRequest>(&line) {
            Ok(request) => handle_request(&request, config),
            Err(e) => DiffResponse::from(imgcomparator::DiffError::invalid(format!(
                "malformed request: {e}"
            ))),
        };
        serde_json::to_writer(&mut stdout, &response)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    }
    Ok(())
}
