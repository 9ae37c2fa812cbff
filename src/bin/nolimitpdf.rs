//! CLI binary for nolimitpdf.
//!
//! A thin shim over the library crate: each subcommand maps its flags to an
//! `AssemblyConfig`, drives a `Pipeline` and prints the translated
//! notifications it emits.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use nolimitpdf::intake;
use nolimitpdf::thumbnail::MimeRenderer;
use nolimitpdf::{
    AssemblyConfig, AssemblyProgress, Assembler, ConvertOutcome, DirectorySink, EditOutcome,
    FileId, Language, Level, Notification, Notifier, OutputSink, Pipeline, Preferences, Theme,
    ThumbnailCache,
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Stands in for the busy overlay: a bar that advances as each file's pages
/// are placed. Decodes may start out of order; placement never does.
struct CliProgress {
    bar: ProgressBar,
    verb: &'static str,
}

impl CliProgress {
    fn new(verb: &'static str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix(verb);
        bar.set_message("Reading files…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar, verb })
    }
}

impl AssemblyProgress for CliProgress {
    fn on_assembly_start(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix(self.verb);
    }

    fn on_record_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_record_complete(&self, index: usize, total: usize) {
        self.bar.println(format!(
            "  {} File {:>3}/{:<3}",
            green("✓"),
            index,
            total
        ));
        self.bar.inc(1);
    }

    fn on_assembly_complete(&self, _total: usize, _succeeded: bool) {
        self.bar.finish_and_clear();
    }
}

// ── Notifications ────────────────────────────────────────────────────────────

/// Prints each notification on stderr, coloured by level.
struct TerminalNotifier {
    quiet: bool,
}

impl Notifier for TerminalNotifier {
    fn notify(&self, n: Notification) {
        match n.level {
            Level::Success if !self.quiet => eprintln!("{} {}", green("✔"), bold(&n.message)),
            Level::Success => {}
            Level::Warning => eprintln!("{} {}", yellow("⚠"), n.message),
            Level::Error => eprintln!("{} {}", red("✘"), n.message),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Images to one A4 PDF (writes ./converted.pdf)
  nolimitpdf convert scan1.jpg scan2.png photo.webp

  # Merge PDFs into ./out/merged.pdf
  nolimitpdf merge a.pdf b.pdf c.pdf -o out

  # Move the third file to the front, drop the second, then merge
  nolimitpdf merge a.pdf b.pdf c.pdf --move 3:1 --remove 2

  # PNG previews for a mix of images and PDFs
  nolimitpdf thumbnails *.pdf *.jpg --out-dir previews

  # Prerender localised landing pages into a built site
  nolimitpdf prerender --dist dist

  # Switch messages to English and toggle the theme
  nolimitpdf prefs --set-lang en --theme toggle

ENVIRONMENT VARIABLES:
  NOLIMITPDF_OUT_DIR      Default output directory
  NOLIMITPDF_LANG         Message language (ko, en); overrides the preferences file
  NOLIMITPDF_THEME        Default theme when no preferences file exists
  PDFIUM_LIB_PATH         Path to libpdfium, used for PDF previews only

Image conversion and merging never need pdfium. Only `thumbnails` on PDF
inputs does; without it those previews are reported as failed.
"#;

/// Convert images to PDF and merge PDF files, entirely offline.
#[derive(Parser, Debug)]
#[command(
    name = "nolimitpdf",
    version,
    about = "Convert images to PDF and merge PDF files",
    long_about = "Convert JPG, PNG, WebP, GIF and BMP images into a single A4 PDF, or merge \
several PDF documents into one. Files are processed locally in the order given, which can \
be adjusted with --move and --remove before the document is built.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Message language (ko, en). Defaults to the saved preference.
    #[arg(long, global = true, env = "NOLIMITPDF_LANG")]
    lang: Option<Language>,

    /// Preferences file.
    #[arg(long, global = true, env = "NOLIMITPDF_PREFS")]
    prefs_file: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, global = true, env = "NOLIMITPDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "NOLIMITPDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except warnings and errors.
    #[arg(short, long, global = true, env = "NOLIMITPDF_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert images into one PDF, one A4 page per image.
    Convert {
        /// Image files, in page order.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        build: BuildArgs,

        /// JPEG quality for non-PNG images (1–100).
        #[arg(long, env = "NOLIMITPDF_JPEG_QUALITY", default_value_t = 92,
              value_parser = clap::value_parser!(u8).range(1..=100))]
        jpeg_quality: u8,

        /// Images decoded ahead of page placement.
        #[arg(short, long, env = "NOLIMITPDF_CONCURRENCY", default_value_t = 4)]
        concurrency: usize,
    },

    /// Merge PDFs into one, in the order given.
    Merge {
        /// PDF files, in output order (at least two).
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Write a PNG preview of each file (first page for PDFs).
    Thumbnails {
        /// Image or PDF files.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for the `<name>.png` previews.
        #[arg(short, long, env = "NOLIMITPDF_OUT_DIR", default_value = ".")]
        out_dir: PathBuf,

        /// Longest edge of image previews, in pixels.
        #[arg(long, default_value_t = 512)]
        max_edge: u32,

        /// Path to libpdfium.
        #[arg(long, env = "PDFIUM_LIB_PATH")]
        pdfium_lib: Option<PathBuf>,
    },

    /// Inject per-language SEO tags into a built site and write sitemap.xml.
    Prerender {
        /// Directory holding the bundled index.html.
        #[arg(long, default_value = "dist")]
        dist: PathBuf,
    },

    /// Show or change saved preferences.
    Prefs {
        /// Set the interface language.
        #[arg(long = "set-lang")]
        set_lang: Option<Language>,

        /// Set or toggle the theme.
        #[arg(long, value_enum)]
        theme: Option<ThemeArg>,
    },
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Output directory for converted.pdf / merged.pdf.
    #[arg(short, long, env = "NOLIMITPDF_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Move the file at position FROM to position TO (1-based). Repeatable;
    /// applied in order.
    #[arg(long = "move", value_name = "FROM:TO", value_parser = parse_move)]
    moves: Vec<(usize, usize)>,

    /// Drop input N as given on the command line (1-based). Repeatable.
    #[arg(long = "remove", value_name = "N")]
    removals: Vec<usize>,

    /// Write streams uncompressed.
    #[arg(long)]
    no_compress: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ThemeArg {
    Light,
    Dark,
    Toggle,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar and notifications carry the feedback; library INFO
    // logs only show with --verbose or RUST_LOG.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let prefs_path = cli.prefs_file.clone().or_else(Preferences::default_path);
    let prefs = match &prefs_path {
        Some(path) => Preferences::load(path).context("Failed to load preferences")?,
        None => Preferences::from_env(),
    };
    let language = cli.lang.unwrap_or(prefs.language);
    let flags = Flags {
        quiet: cli.quiet,
        verbose: cli.verbose,
        show_progress: !cli.quiet && !cli.no_progress,
    };

    match cli.command {
        Command::Convert {
            inputs,
            build,
            jpeg_quality,
            concurrency,
        } => {
            let config = AssemblyConfig::builder()
                .jpeg_quality(jpeg_quality)
                .decode_concurrency(concurrency)
                .compress(!build.no_compress)
                .build()
                .context("Invalid configuration")?;
            let pipeline = Pipeline::image_to_pdf(config, DirectorySink::new(&build.out_dir));
            run_build(pipeline, &inputs, &build, language, &flags)
                .await
        }
        Command::Merge { inputs, build } => {
            let config = AssemblyConfig::builder()
                .compress(!build.no_compress)
                .build()
                .context("Invalid configuration")?;
            let pipeline = Pipeline::pdf_merge(config, DirectorySink::new(&build.out_dir));
            run_build(pipeline, &inputs, &build, language, &flags)
                .await
        }
        Command::Thumbnails {
            inputs,
            out_dir,
            max_edge,
            pdfium_lib,
        } => {
            let mut builder = AssemblyConfig::builder().thumbnail_max_edge(max_edge);
            if let Some(path) = pdfium_lib {
                builder = builder.pdfium_lib_path(path);
            }
            let config = builder.build().context("Invalid configuration")?;
            run_thumbnails(&inputs, &out_dir, &config, cli.quiet).await
        }
        Command::Prerender { dist } => {
            let site = site_prerender::SiteConfig::nolimitpdf();
            let dist_for_task = dist.clone();
            let report =
                tokio::task::spawn_blocking(move || site_prerender::prerender(&site, dist_for_task))
                    .await
                    .context("Prerender task failed")?
                    .with_context(|| format!("Failed to prerender {}", dist.display()))?;
            if !cli.quiet {
                for path in &report.written {
                    eprintln!("  {} {}", green("✓"), dim(&path.display().to_string()));
                }
                eprintln!(
                    "{} {} files prerendered",
                    green("✔"),
                    bold(&report.written.len().to_string())
                );
            }
            Ok(())
        }
        Command::Prefs { set_lang, theme } => {
            let Some(path) = prefs_path else {
                bail!("No configuration directory on this platform; pass --prefs-file");
            };
            let mut prefs = prefs;
            let changed = set_lang.is_some() || theme.is_some();
            if let Some(lang) = set_lang {
                prefs.set_language(lang);
            }
            match theme {
                Some(ThemeArg::Light) => prefs.theme = Theme::Light,
                Some(ThemeArg::Dark) => prefs.theme = Theme::Dark,
                Some(ThemeArg::Toggle) => {
                    prefs.toggle_theme();
                }
                None => {}
            }
            if changed {
                prefs.save(&path).context("Failed to save preferences")?;
            }
            println!("Language:  {}", prefs.language);
            println!("Theme:     {}", prefs.theme);
            println!("File:      {}", path.display());
            Ok(())
        }
    }
}

struct Flags {
    quiet: bool,
    verbose: bool,
    show_progress: bool,
}

/// Read, load into a pipeline, apply the requested edits, build.
async fn run_build<A, S>(
    pipeline: Pipeline<A, S>,
    inputs: &[PathBuf],
    build: &BuildArgs,
    language: Language,
    flags: &Flags,
) -> Result<()>
where
    A: Assembler,
    S: OutputSink,
{
    let verb = match pipeline.feature() {
        nolimitpdf::Feature::ImageToPdf => "Converting",
        nolimitpdf::Feature::PdfMerge => "Merging",
    };
    let mut pipeline = pipeline
        .with_language(language)
        .with_notifier(Arc::new(TerminalNotifier { quiet: flags.quiet }));
    let progress = flags.show_progress.then(|| CliProgress::new(verb));
    if let Some(p) = &progress {
        pipeline = pipeline.with_progress(p.clone());
    }

    let files = intake::read_files(inputs)
        .await
        .context("Failed to read input files")?;
    let feature = pipeline.feature();
    let kept: Vec<bool> = files.iter().map(|f| feature.accepts(f)).collect();
    let report = pipeline.add_files(files);
    if report.rejected > 0 && !flags.quiet {
        eprintln!(
            "   {}",
            dim(&format!("{} file(s) skipped", report.rejected))
        );
    }
    let given = given_positions(&kept, &report.accepted);

    apply_edits(&pipeline, &given, &build.moves, &build.removals)?;

    let outcome = pipeline.convert().await;
    // Validation failures return before the assembler touches the bar.
    if let Some(p) = &progress {
        p.bar.finish_and_clear();
    }
    match outcome {
        ConvertOutcome::Saved { path, page_count } => {
            if !flags.quiet {
                eprintln!(
                    "{}  {} pages  →  {}",
                    cyan("◆"),
                    page_count,
                    bold(&path.display().to_string())
                );
            }
            Ok(())
        }
        // The notifier has already printed the translated message.
        ConvertOutcome::Invalid(e) => exit_after_notice(flags, &e),
        ConvertOutcome::Failed(e) => exit_after_notice(flags, &e),
        ConvertOutcome::AlreadyBusy => bail!("A build is already running"),
    }
}

/// Exit non-zero without a second error line; the detail only with
/// `--verbose`.
fn exit_after_notice(flags: &Flags, detail: &dyn std::fmt::Display) -> ! {
    if flags.verbose {
        eprintln!("   {}", dim(&detail.to_string()));
    }
    std::process::exit(1)
}

/// The id each input received, by position on the command line. Inputs
/// rejected by type map to `None`.
fn given_positions(kept: &[bool], accepted: &[FileId]) -> Vec<Option<FileId>> {
    let mut ids = accepted.iter().copied();
    kept.iter()
        .map(|&k| if k { ids.next() } else { None })
        .collect()
}

/// Removals name positions in the list as given on the command line; moves
/// then apply to what remains, one after another.
fn apply_edits<A, S>(
    pipeline: &Pipeline<A, S>,
    given: &[Option<FileId>],
    moves: &[(usize, usize)],
    removals: &[usize],
) -> Result<()>
where
    A: Assembler,
    S: OutputSink,
{
    let doomed: Vec<FileId> = removals
        .iter()
        .map(|&n| given_id(given, n).context("--remove"))
        .collect::<Result<_>>()?;
    for id in doomed {
        pipeline.remove(id);
    }

    for &(from, to) in moves {
        let ids = pipeline.ids();
        let source = position(&ids, from).context("--move")?;
        let target = position(&ids, to).context("--move")?;
        if pipeline.reorder(source, target) == EditOutcome::Busy {
            bail!("Cannot reorder while a build is running");
        }
    }
    Ok(())
}

fn position(ids: &[FileId], n: usize) -> Result<FileId> {
    if n == 0 {
        bail!("Positions are 1-indexed, minimum is 1 (got 0)");
    }
    ids.get(n - 1)
        .copied()
        .with_context(|| format!("Position {n} is out of range (list has {} files)", ids.len()))
}

fn given_id(given: &[Option<FileId>], n: usize) -> Result<FileId> {
    if n == 0 {
        bail!("Positions are 1-indexed, minimum is 1 (got 0)");
    }
    match given.get(n - 1) {
        Some(Some(id)) => Ok(*id),
        Some(None) => bail!("Input {n} was skipped (wrong file type)"),
        None => bail!("Position {n} is out of range ({} inputs given)", given.len()),
    }
}

/// Parse `FROM:TO` into a 1-based position pair.
fn parse_move(s: &str) -> Result<(usize, usize), String> {
    let (from, to) = s
        .split_once(':')
        .ok_or_else(|| format!("expected FROM:TO, got '{s}'"))?;
    let from: usize = from
        .trim()
        .parse()
        .map_err(|_| format!("invalid position '{}'", from.trim()))?;
    let to: usize = to
        .trim()
        .parse()
        .map_err(|_| format!("invalid position '{}'", to.trim()))?;
    if from == 0 || to == 0 {
        return Err("positions are 1-indexed".into());
    }
    Ok((from, to))
}

/// One PNG per input. A failed preview is reported and skipped; the command
/// fails only if every preview failed.
async fn run_thumbnails(
    inputs: &[PathBuf],
    out_dir: &Path,
    config: &AssemblyConfig,
    quiet: bool,
) -> Result<()> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let cache = ThumbnailCache::new();
    let renderer = Arc::new(MimeRenderer::new(config));
    let mut written = 0usize;

    for path in inputs {
        let file = intake::read_file(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let id = FileId::next();
        match cache.populate(id, &file, renderer.clone()).await {
            Ok(thumb) => {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| id.to_string());
                let out = out_dir.join(format!("{stem}.png"));
                tokio::fs::write(&out, thumb.png())
                    .await
                    .with_context(|| format!("Failed to write {}", out.display()))?;
                written += 1;
                if !quiet {
                    eprintln!(
                        "  {} {}  {}",
                        green("✓"),
                        out.display(),
                        dim(&format!("{}×{}", thumb.width(), thumb.height()))
                    );
                }
            }
            Err(e) => eprintln!("  {} {}  {}", red("✗"), path.display(), red(&e.to_string())),
        }
        cache.evict(id);
    }

    if written == 0 {
        bail!("No previews could be rendered");
    }
    if !quiet {
        eprintln!(
            "{} {}/{} previews written",
            green("✔"),
            bold(&written.to_string()),
            inputs.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_positions_follow_the_command_line() {
        let (a, c) = (FileId::next(), FileId::next());
        let given = given_positions(&[true, false, true], &[a, c]);
        assert_eq!(given, vec![Some(a), None, Some(c)]);

        assert_eq!(given_id(&given, 3).unwrap(), c);
        assert!(given_id(&given, 2).unwrap_err().to_string().contains("skipped"));
        assert!(given_id(&given, 4).is_err());
        assert!(given_id(&given, 0).is_err());
    }

    #[test]
    fn parse_move_rejects_zero() {
        assert_eq!(parse_move("3:1").unwrap(), (3, 1));
        assert!(parse_move("0:1").is_err());
        assert!(parse_move("2-1").is_err());
    }
}
