mod digest;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use digest::batch::{BatchProgress, CancelToken};
use digest::config::DigestConfig;
use digest::duplicates::DuplicatesEngine;
use digest::generate::GenerateEngine;
use digest::refresh::{RefreshEngine, RefreshMode};
use digest::report::ReportSink;
use digest::validate::ValidateEngine;

#[derive(Parser)]
#[command(name = "dirsum", version, about = "Directory digest tool: generate, validate and reconcile content-hash manifests")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk a directory, hash every file and save a digest
    Generate {
        directory: PathBuf,
        /// Directory to save the digest into (defaults to the working directory)
        #[arg(long)]
        digest_dir: Option<PathBuf>,
    },
    /// Re-hash every file listed in a digest and report mismatches
    Validate {
        directory: PathBuf,
        digest: PathBuf,
        /// Save a fresh digest of the successfully hashed files
        #[arg(long)]
        save: bool,
        #[arg(long)]
        digest_dir: Option<PathBuf>,
    },
    /// Reconcile a directory against a digest, re-hashing only drifted files
    FastRefresh {
        directory: PathBuf,
        digest: PathBuf,
        #[arg(long)]
        digest_dir: Option<PathBuf>,
    },
    /// Reconcile a directory against a digest, re-hashing everything
    FullRefresh {
        directory: PathBuf,
        digest: PathBuf,
        #[arg(long)]
        digest_dir: Option<PathBuf>,
    },
    /// Report duplicate content recorded in a digest
    Duplicates { digest: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = DigestConfig::load();
    let cancel = CancelToken::new();

    match cli.command {
        Command::Generate { directory, digest_dir } => {
            generate(&config, &directory, digest_dir.as_deref(), &cancel)
        }
        Command::Validate { directory, digest, save, digest_dir } => {
            validate(&config, &directory, &digest, save, digest_dir.as_deref(), &cancel)
        }
        Command::FastRefresh { directory, digest, digest_dir } => refresh(
            RefreshMode::Fast,
            &config,
            &directory,
            &digest,
            digest_dir.as_deref(),
            &cancel,
        ),
        Command::FullRefresh { directory, digest, digest_dir } => refresh(
            RefreshMode::Full,
            &config,
            &directory,
            &digest,
            digest_dir.as_deref(),
            &cancel,
        ),
        Command::Duplicates { digest } => duplicates(&config, &digest),
    }
}

fn generate(
    config: &DigestConfig,
    directory: &Path,
    digest_dir: Option<&Path>,
    cancel: &CancelToken,
) -> Result<()> {
    println!("Walking and hashing {}...", directory.display());

    let bar = hashing_bar();
    let engine = GenerateEngine::new(config.clone()).with_progress_callback(feed_bar(bar.clone()));
    let outcome = engine.run(directory, cancel)?;
    bar.finish_and_clear();

    let mut sink = ReportSink::new(true, config.print_to_log);
    sink.emit(&outcome.render());

    let saved = outcome.save_digest(digest_dir, digest_prefix(config, directory).as_deref())?;
    report_save(saved)
}

fn validate(
    config: &DigestConfig,
    directory: &Path,
    digest_path: &Path,
    save: bool,
    digest_dir: Option<&Path>,
    cancel: &CancelToken,
) -> Result<()> {
    println!("Validating {} against {}...", directory.display(), digest_path.display());

    let bar = hashing_bar();
    let engine = ValidateEngine::new().with_progress_callback(feed_bar(bar.clone()));
    let outcome = engine.run(directory, digest_path, cancel)?;
    bar.finish_and_clear();

    let mut sink = ReportSink::new(true, config.print_to_log);
    sink.emit(&outcome.render());

    if outcome.has_events() {
        println!("{}", "File changes detected.".red());
    } else {
        println!("{}", "All files match the digest.".green());
    }

    if save {
        let saved = outcome.save_digest(digest_dir, digest_prefix(config, directory).as_deref())?;
        report_save(saved)?;
    }
    Ok(())
}

fn refresh(
    mode: RefreshMode,
    config: &DigestConfig,
    directory: &Path,
    digest_path: &Path,
    digest_dir: Option<&Path>,
    cancel: &CancelToken,
) -> Result<()> {
    println!(
        "{}: {} against {}...",
        mode.label(),
        directory.display(),
        digest_path.display()
    );

    let bar = hashing_bar();
    let engine =
        RefreshEngine::new(mode, config.clone()).with_progress_callback(feed_bar(bar.clone()));
    let outcome = engine.run(directory, digest_path, cancel)?;
    bar.finish_and_clear();

    let mut sink = ReportSink::new(true, config.print_to_log);
    sink.emit(&outcome.render(config.revalidated_severity));

    if outcome.event_count() == 0 {
        println!("{}", "No drift detected.".green());
    }

    let saved = outcome.save_digest(digest_dir, digest_prefix(config, directory).as_deref())?;
    report_save(saved)
}

fn duplicates(config: &DigestConfig, digest_path: &Path) -> Result<()> {
    let manifest = digest::codec::read_digest(digest_path)?;

    let engine = DuplicatesEngine::new(config.sort_duplicates_by_size);
    let report = engine.analyze(manifest.files, manifest.hashes)?;

    let mut sink = ReportSink::new(true, config.print_to_log);
    sink.emit("Mode: Find duplicates");
    sink.emit(&report.render());
    Ok(())
}

fn hashing_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%)")
            .unwrap()
            .progress_chars("=>-"),
    );
    bar
}

fn feed_bar(bar: ProgressBar) -> impl Fn(BatchProgress) + Send + Sync + 'static {
    move |progress| {
        bar.set_length(progress.total as u64);
        bar.set_position(progress.processed as u64);
    }
}

/// Derive the digest filename prefix from the scanned directory's name
fn digest_prefix(config: &DigestConfig, directory: &Path) -> Option<String> {
    if !config.prefix_digest_filename {
        return None;
    }
    let name = directory.file_name()?.to_str()?;
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    Some(format!("{}_", sanitized))
}

fn report_save(saved: Option<PathBuf>) -> Result<()> {
    match saved {
        Some(path) => {
            println!("Digest saved to {}", path.display().to_string().green());
            Ok(())
        }
        None => {
            bail!(
                "could not save the digest: the destination directory does not exist. \
                 Re-run with --digest-dir pointing at an existing directory."
            )
        }
    }
}
