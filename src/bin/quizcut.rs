//! CLI binary for quizcut.
//!
//! A thin shim over the library crate that maps CLI flags to `CutConfig` /
//! `PackageConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use quizcut::{
    create_package, cut_pdf, AnchorLabels, CutConfig, CutOutput, CutProgressCallback, CutRequest,
    JobRunner, PackageConfig, ProgressCallback,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Page progress bar for a single cut.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Locating anchors…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl CutProgressCallback for CliProgressCallback {
    fn on_job_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Cutting");
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, crops_so_far: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{crops_so_far:>4} crops so far")),
        ));
        self.bar.inc(1);
    }

    fn on_crop_saved(&self, file_name: &str) {
        self.bar.set_prefix("Saving");
        self.bar.set_message(file_name.to_string());
    }

    fn on_job_complete(&self, total_crops: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} images written",
            green("✔"),
            bold(&total_crops.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Cut one exam into out/midterm/midterm019.png, midterm010.png, …
  quizcut cut midterm.pdf out/midterm midterm

  # Higher resolution, tighter margin, option object as JSON
  quizcut cut midterm.pdf out/midterm midterm --options '{"resolution": 3, "margin": 6}'

  # Cut several exams concurrently into out/<file stem>/
  quizcut batch out a.pdf b.pdf c.pdf

  # Package the images as a QTI quiz: dist/midterm(24).zip
  quizcut package out/midterm dist midterm

NAMING:
  {name}{nn}9.png   question nn (suffix configurable with --question-suffix)
  {name}{nn}{k}.png choice k of question nn, k = 0, 1, 2, …

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH          Path to libpdfium (file or directory)
  QUIZCUT_RESOLUTION       Render scale (1–8)
  QUIZCUT_MARGIN           Crop margin in page units
  QUIZCUT_QUESTION_SUFFIX  Question image suffix
  QUIZCUT_MEDIA_DIR        Media folder inside the quiz archive
  QUIZCUT_CHOICE_PATTERN   Choice indices to package, e.g. [0,1,2,3]
  RUST_LOG                 Log filter override
"#;

/// Cut exam PDFs into question and choice images and package them as quizzes.
#[derive(Parser, Debug)]
#[command(
    name = "quizcut",
    version,
    about = "Cut exam PDFs into question/choice images and package them as QTI quizzes",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "QUIZCUT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "QUIZCUT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cut one PDF into images.
    Cut {
        /// Exam PDF.
        input: PathBuf,
        /// Directory for the images (created if missing).
        output_dir: PathBuf,
        /// File-name prefix, usually the exam name.
        name: String,
        #[command(flatten)]
        cut: CutArgs,
        /// Print the result as JSON on stdout.
        #[arg(long)]
        json: bool,
        /// Disable progress bar.
        #[arg(long, env = "QUIZCUT_NO_PROGRESS")]
        no_progress: bool,
    },
    /// Cut several PDFs concurrently, each into `<OUTPUT_DIR>/<file stem>/`.
    Batch {
        output_dir: PathBuf,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[command(flatten)]
        cut: CutArgs,
    },
    /// Build `{name}({count}).zip` from a directory of cut images.
    Package {
        /// Directory holding the images.
        input_dir: PathBuf,
        /// Directory for the archive.
        output_dir: PathBuf,
        /// File-name prefix the images were cut with.
        name: String,
        #[command(flatten)]
        package: PackageArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct CutArgs {
    /// Render scale; also the scan stride (1–8). Default: 2.
    #[arg(long, env = "QUIZCUT_RESOLUTION",
          value_parser = clap::value_parser!(u32).range(1..=8))]
    resolution: Option<u32>,

    /// Padding above and below each block, in page units. Default: 8.
    #[arg(long, env = "QUIZCUT_MARGIN")]
    margin: Option<u32>,

    /// Option object, e.g. '{"resolution": 2, "margin": 8}'. Flags win.
    #[arg(long)]
    options: Option<String>,

    /// Suffix of question image names.
    #[arg(long, env = "QUIZCUT_QUESTION_SUFFIX", default_value = "9")]
    question_suffix: String,

    /// Label whose bottom edge starts the scan window on page 1.
    #[arg(long, default_value = "Version")]
    top_label: String,

    /// Label whose top edge ends the scan window on page 1.
    #[arg(long, default_value = "Page")]
    bottom_label: String,

    /// Label of the first question number; fixes the question column.
    #[arg(long, default_value = "1.")]
    question_label: String,

    /// Correct-choice marker; fixes the choice column.
    #[arg(long, default_value = "(O)")]
    correct_label: String,

    /// Incorrect-choice marker.
    #[arg(long, default_value = "(X)")]
    incorrect_label: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "QUIZCUT_PASSWORD")]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct PackageArgs {
    /// Folder for images inside the archive.
    #[arg(long, env = "QUIZCUT_MEDIA_DIR", default_value = "Uploaded Media")]
    media_dir: String,

    /// Suffix of question image names.
    #[arg(long, env = "QUIZCUT_QUESTION_SUFFIX", default_value = "9")]
    question_suffix: String,

    /// Choice indices to include, in order, as a JSON array.
    #[arg(long, env = "QUIZCUT_CHOICE_PATTERN", default_value = "[0,1,2,3]")]
    choice_pattern: String,

    /// Quiz time limit in minutes.
    #[arg(long, default_value_t = 75)]
    time_limit: u32,

    /// Points per question.
    #[arg(long, default_value_t = 1.0)]
    points: f64,

    /// Keep choices in file order instead of shuffling.
    #[arg(long)]
    no_shuffle: bool,

    /// 0-based index of the correct choice in every question.
    #[arg(long, default_value_t = 0)]
    correct_index: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the progress bar is active.
    let show_progress = match &cli.command {
        Command::Cut {
            json, no_progress, ..
        } => !cli.quiet && !no_progress && !json,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Cut {
            input,
            output_dir,
            name,
            cut,
            json,
            ..
        } => {
            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn CutProgressCallback>)
            } else {
                None
            };
            let config = build_cut_config(&cut, progress)?;
            let output = cut_pdf(&input, &output_dir, &name, &config)
                .await
                .with_context(|| format!("Cutting {} failed", input.display()))?;

            if json {
                let json =
                    serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
                println!("{json}");
            } else if !cli.quiet {
                print_summary(&output, &output_dir);
            }
        }

        Command::Batch {
            output_dir,
            inputs,
            cut,
        } => {
            let config = build_cut_config(&cut, None)?;
            let runner = JobRunner::new();
            let mut handles = Vec::with_capacity(inputs.len());
            for input in inputs {
                let stem = file_stem(&input)?;
                let request =
                    CutRequest::new(&input, output_dir.join(&stem), stem, config.clone());
                handles.push((input, runner.submit(request)));
            }

            let mut failed = 0usize;
            for (input, handle) in handles {
                match handle.wait().await {
                    Ok(output) => {
                        if !cli.quiet {
                            eprintln!(
                                "{} {}  {} questions, {} choices  {}",
                                green("✔"),
                                bold(&input.display().to_string()),
                                output.stats.questions,
                                output.stats.choices,
                                dim(&format!("{}ms", output.stats.duration_ms)),
                            );
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        eprintln!("{} {}  {}", red("✘"), input.display(), red(&e.to_string()));
                    }
                }
            }
            runner.join_all().await;
            if failed > 0 {
                anyhow::bail!("{failed} job(s) failed");
            }
        }

        Command::Package {
            input_dir,
            output_dir,
            name,
            package,
        } => {
            let config = build_package_config(&package)?;
            let out = tokio::task::spawn_blocking(move || {
                create_package(&input_dir, &output_dir, &name, &config)
            })
            .await
            .context("Packaging task panicked")?
            .context("Packaging failed")?;

            if !cli.quiet {
                eprintln!(
                    "{} {} questions  →  {}",
                    green("✔"),
                    out.questions,
                    bold(&out.zip_path.display().to_string())
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `CutConfig`. Explicit flags override the option object.
fn build_cut_config(args: &CutArgs, progress: Option<ProgressCallback>) -> Result<CutConfig> {
    let base = match args.options {
        Some(ref raw) => {
            let value: serde_json::Value =
                serde_json::from_str(raw).context("--options is not valid JSON")?;
            CutConfig::from_options(&value).context("Invalid --options")?
        }
        None => CutConfig::default(),
    };

    let labels = AnchorLabels {
        top: args.top_label.clone(),
        bottom: args.bottom_label.clone(),
        question: args.question_label.clone(),
        correct_choice: args.correct_label.clone(),
        incorrect_choice: args.incorrect_label.clone(),
    };

    let mut builder = CutConfig::builder()
        .resolution(args.resolution.unwrap_or(base.resolution))
        .margin(args.margin.unwrap_or(base.margin))
        .labels(labels)
        .question_suffix(args.question_suffix.clone());
    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Map CLI args to `PackageConfig`.
fn build_package_config(args: &PackageArgs) -> Result<PackageConfig> {
    let pattern: Vec<u32> = serde_json::from_str(&args.choice_pattern).with_context(|| {
        format!(
            "--choice-pattern must be a JSON array of integers, got '{}'",
            args.choice_pattern
        )
    })?;

    PackageConfig::builder()
        .media_dir(args.media_dir.clone())
        .question_suffix(args.question_suffix.clone())
        .choice_pattern(pattern)
        .time_limit_minutes(args.time_limit)
        .points_per_question(args.points)
        .shuffle_choices(!args.no_shuffle)
        .correct_choice_index(args.correct_index)
        .build()
        .context("Invalid package configuration")
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| format!("Cannot derive a name from {}", path.display()))
}

fn print_summary(output: &CutOutput, output_dir: &Path) {
    let s = &output.stats;
    eprintln!(
        "{}  {} images ({} questions, {} choices) from {} pages  {}ms  →  {}",
        green("✔"),
        s.total_crops(),
        s.questions,
        s.choices,
        s.total_pages,
        s.duration_ms,
        bold(&output_dir.display().to_string()),
    );
    if s.merged_blocks > 0 || s.dropped_blocks > 0 {
        eprintln!(
            "   {}",
            dim(&format!(
                "{} continuation block(s) merged, {} dropped",
                s.merged_blocks, s.dropped_blocks
            ))
        );
    }
}
