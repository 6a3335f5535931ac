//! Autotents
//!
//! Reads a Tents puzzle from a game screenshot, hands the board to an
//! external solver and prints where to tap. Also maintains the calibration
//! preset and the digit sample corpus the recognizer depends on.

mod board;
mod calibration;
mod config;
mod digits;
mod error;
mod paths;
mod vision;

#[cfg(test)]
mod test_utils;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use board::{append_record, recognize, tap_plan, Recognition, Solver};
use calibration::{generate_preset, JsonPresetStore, Preset, Resolution};
use config::Config;
use digits::{analyze_corpus, collect_from_screenshots, DigitClassifier, DirSampleStore, StoreQuota};

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("autotents.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

#[derive(Parser, Debug)]
#[command(name = "autotents", about = "Tents puzzle screenshot recognition", version)]
struct Cli {
    /// Config file (defaults to config.json next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the data directory from the config
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recognize a screenshot and solve the board
    Solve {
        screenshot: PathBuf,

        /// Stop after printing the board description
        #[arg(long)]
        no_solve: bool,
    },
    /// Calibrate every board size from samples/<h>x<w>/sample-<n>x<n>.png
    GenPreset {
        #[arg(long, requires = "width")]
        height: Option<u32>,
        #[arg(long, requires = "height")]
        width: Option<u32>,
    },
    /// Save digits the corpus does not cover yet as provisional samples
    Collect {
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete provisional samples the corpus already covers
    Cleanup,
    /// Tag a provisional sample
    Promote { id: String, tag: String },
    /// Delete a sample
    Discard { id: String },
    /// Add a glyph image to the corpus under a tag
    Add { image: PathBuf, tag: String },
    /// Print matching score statistics of the corpus
    Analyze,
    /// Import legacy sample file names into the corpus index
    Migrate,
}

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        let log_path = paths::get_logs_dir().join("autotents.log");
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path) {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(paths::default_config_path);
    let mut config = Config::load(&config_path);
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    log(&format!("Data directory: {}", config.data_dir.display()));

    paths::ensure_directories(&config.data_dir).context("Failed to create data directories")?;

    match cli.command {
        Command::Solve {
            screenshot,
            no_solve,
        } => solve(&config, &screenshot, no_solve),
        Command::GenPreset { height, width } => {
            let resolution = match (height, width) {
                (Some(h), Some(w)) => Resolution::new(h, w),
                _ => config.reference_resolution,
            };
            gen_preset(&config, resolution)
        }
        Command::Collect { dry_run } => collect(&config, dry_run),
        Command::Cleanup => {
            let mut classifier = load_classifier(&config)?;
            classifier.cleanup_provisional()?;
            Ok(())
        }
        Command::Promote { id, tag } => load_classifier(&config)?.promote(&id, &tag),
        Command::Discard { id } => load_classifier(&config)?.discard(&id),
        Command::Add { image, tag } => {
            let glyph = image::open(&image)
                .with_context(|| format!("Failed to load glyph: {}", image.display()))?
                .to_luma8();
            let mut classifier = load_classifier(&config)?;
            let id = classifier.accept_sample(glyph, &tag)?;
            classifier.flush()?;
            log(&format!("Added {} as {}", id, tag));
            Ok(())
        }
        Command::Analyze => {
            let classifier = load_classifier(&config)?;
            let stats = analyze_corpus(classifier.glyphs(), classifier.matcher());
            println!("{}", stats);
            Ok(())
        }
        Command::Migrate => {
            let mut store = DirSampleStore::open(paths::digits_dir(&config.data_dir))?;
            let imported = store.import_legacy()?;
            log(&format!("Imported {} legacy sample(s)", imported));
            Ok(())
        }
    }
}

fn load_preset(config: &Config) -> Result<Preset<JsonPresetStore>> {
    Preset::load(JsonPresetStore::new(paths::preset_path(&config.data_dir)))
}

fn load_classifier(config: &Config) -> Result<DigitClassifier<DirSampleStore>> {
    let store = DirSampleStore::open(paths::digits_dir(&config.data_dir))?;
    Ok(DigitClassifier::load(store, config))
}

fn solve(config: &Config, screenshot: &Path, no_solve: bool) -> Result<()> {
    let solver = if no_solve {
        None
    } else {
        let bin = config
            .solver_bin()
            .ok_or_else(|| anyhow!("No solver configured; set solver_bin or TENTS_DEMO_BIN"))?;
        Some(Solver::new(bin)?)
    };

    let preset = load_preset(config)?;
    let mut classifier = load_classifier(config)?;
    let img = image::open(screenshot)
        .with_context(|| format!("Failed to load screenshot: {}", screenshot.display()))?
        .to_rgb8();
    log(&format!("Screenshot is {}", Resolution::of(&img).key()));

    let mut quota = StoreQuota::new(config.store_quota);
    let (description, bounds) = match recognize(&img, &preset, &mut classifier, config, &mut quota)? {
        Recognition::UnknownSize => return Err(anyhow!("Board size cannot be recognized")),
        Recognition::NotConfident { issues, saved } => {
            return Err(anyhow!(
                "Recognition might be inaccurate ({} issue(s)); {} sample(s) saved for tagging",
                issues.len(),
                saved
            ));
        }
        Recognition::Board {
            description,
            bounds,
        } => (description, bounds),
    };

    println!("# PUZZLE OUTPUT BEGIN");
    print!("{}", description);
    println!("# PUZZLE OUTPUT END");

    if let Some(records) = config.puzzle_records() {
        append_record(&records, &description)?;
    }

    let Some(solver) = solver else {
        return Ok(());
    };
    let tents = solver.solve(&description)?;
    for ((r, c), (x, y)) in tents.iter().zip(tap_plan(&bounds, &tents).iter().step_by(2)) {
        println!("tent {},{} -> tap ({}, {}) x2", r, c, x, y);
    }
    Ok(())
}

fn gen_preset(config: &Config, resolution: Resolution) -> Result<()> {
    let mut preset = load_preset(config)?;
    let mapping = generate_preset(config, resolution)?;
    log(&format!(
        "Registering {} size(s) for {}",
        mapping.len(),
        resolution.key()
    ));
    preset.register(resolution, mapping)
}

fn collect(config: &Config, dry_run: bool) -> Result<()> {
    let resolution = config.reference_resolution;
    let dir = paths::samples_dir(&config.data_dir, resolution);
    if !dir.is_dir() {
        return Err(anyhow!("No screenshots at {}", dir.display()));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect();
    files.sort();

    let mut screenshots = Vec::new();
    for path in files {
        match image::open(&path) {
            Ok(img) => screenshots.push((path.display().to_string(), img.to_rgb8())),
            Err(e) => log(&format!("Skipping {}: {}", path.display(), e)),
        }
    }

    let preset = load_preset(config)?;
    let mut classifier = load_classifier(config)?;
    let mut quota = StoreQuota::new(config.store_quota);
    collect_from_screenshots(&screenshots, &preset, &mut classifier, config, &mut quota, dry_run)?;
    Ok(())
}
