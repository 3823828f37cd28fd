use blog_digest::fetch::HttpFetcher;
use blog_digest::imaging::RustBackend;
use blog_digest::pipeline::Ingestor;
use blog_digest::prompt::{self, LinePrompter};
use blog_digest::{config, maintenance, output};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

fn version_string() -> &'static str {
    let on_tag = env!("BLOG_DIGEST_ON_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("BLOG_DIGEST_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "blog-digest")]
#[command(about = "Ingest markdown posts into a static blog")]
#[command(long_about = "\
Ingest markdown posts into a static blog

An ingested post gets front-matter (title, date, categories, tags, permalink),
its remote images are downloaded into the site, and the manifest plus the
README post lists are updated.

Site layout (defaults, see blog.toml):

  site/
  ├── blog.toml                    # Optional config
  ├── _data/blogs.json             # Manifest: post id → record
  ├── _posts/                      # <date>-<name>.md published posts
  ├── assets/img/blogs/            # <uuid>.<format> published images
  ├── README.md                    # '## Blog list' section kept in sync
  └── README.zh_CN.md              # '## 博客列表' section kept in sync

A document whose first block is an image uses it as the cover: it moves into
the front-matter and, if its aspect ratio is off, can be cropped to fit.

Run 'blog-digest gen-config' to generate a documented blog.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Log debug diagnostics to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish a markdown document (picks one interactively when no path is given)
    Ingest {
        /// Source document; words are joined with spaces
        path: Vec<String>,
    },
    /// Run a batch repair over every published post
    Sync {
        #[arg(value_enum)]
        mode: SyncMode,
    },
    /// Print a stock blog.toml with all options documented
    GenConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum SyncMode {
    /// Regenerate the README post lists
    Readme,
    /// Set each post's permalink from its manifest id
    Permalink,
    /// Copy each post's front-matter date into the manifest
    Date,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Ingest { path } => {
            let config = config::load_config(&cli.root)?;
            let prompter = LinePrompter::terminal();
            let source = if path.is_empty() {
                let browse_root = config.browse.root_dir();
                prompt::select_markdown_file(&prompter, &browse_root, config.browse.max_depth)?
                    .ok_or("no markdown file selected")?
            } else {
                PathBuf::from(path.join(" "))
            };

            let fetcher = HttpFetcher::new(&config.download)?;
            let backend = RustBackend::new();
            let ingestor = Ingestor {
                root: &cli.root,
                config: &config,
                fetcher: &fetcher,
                backend: &backend,
                prompter: &prompter,
            };
            let report = ingestor.ingest(&source, config.site.now()?)?;
            output::print_ingest_report(&report, &cli.root);
        }
        Command::Sync { mode } => {
            let config = config::load_config(&cli.root)?;
            match mode {
                SyncMode::Readme => {
                    let outcomes = maintenance::sync_readmes(&cli.root, &config)?;
                    output::print_readme_outcomes(&outcomes);
                }
                SyncMode::Permalink => {
                    let report = maintenance::repair_permalinks(&cli.root, &config)?;
                    output::print_maintenance_report("Permalinks", &report);
                }
                SyncMode::Date => {
                    let report = maintenance::backfill_dates(&cli.root, &config)?;
                    output::print_maintenance_report("Dates", &report);
                }
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
