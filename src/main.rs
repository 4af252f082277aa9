use blogsmith::config::{self, BuildConfig, SiteConfig};
use blogsmith::search::SearchIndex;
use blogsmith::server::{self, OAuthSettings, ServeConfig};
use blogsmith::store::{BlockingIndex, Store};
use blogsmith::{output, pipeline};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Handle;

#[derive(Parser)]
#[command(name = "blogsmith")]
#[command(about = "Static site generator for a personal blog and docs site")]
#[command(long_about = "\
Static site generator for a personal blog and docs site

A directory with a _metadata.yml is a collection; the Markdown files inside
it are its posts. Collections nest.

Content structure:

  content/
  ├── profile.md                   # Profile page (optional)
  ├── blog/                        # Main blog, paginated at /blog/
  │   ├── _metadata.yml            # name, description, type, icon, banner
  │   ├── hello-world.md           # Post: frontmatter + Markdown
  │   └── rust/                    # Nested series
  │       ├── _metadata.yml
  │       └── part-1.md
  └── guides/                      # Docs topic (ordered by `order:`)
      ├── _metadata.yml
      └── install.md

  templates/   Tera templates (base.html, home.html, post.html, ...)
  static/      Copied to the output; CSS and JS minified and fingerprinted
  site.yml     Site title, base URL, profile, referrals

Post frontmatter:
  title, description, date (YYYY-MM-DD), updated, draft, order

Run 'blogsmith dev' for a live-reloading server with comments and reactions,
or 'blogsmith serve' to serve a finished build.")]
#[command(version)]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    content: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Static asset directory
    #[arg(long, default_value = "static", global = true)]
    static_dir: PathBuf,

    /// Template directory
    #[arg(long, default_value = "templates", global = true)]
    templates: PathBuf,

    /// Site configuration file
    #[arg(long, default_value = "site.yml", global = true)]
    site_config: PathBuf,

    /// SQLite database for users, comments, reactions and search
    #[arg(long, default_value = "data/sqlite.db", global = true)]
    db: PathBuf,

    /// Cap on card-rendering threads (default: all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site into the output directory
    Build {
        /// Canonical origin (default: site.yml base_url)
        #[arg(long)]
        base_url: Option<String>,
        /// Skip refreshing the search index in the database
        #[arg(long)]
        no_index: bool,
    },
    /// Build, watch for changes, and serve with live reload
    Dev {
        #[arg(long, default_value_t = 3000)]
        port: u16,
        /// Origin (default: site.yml dev_base_url, then localhost)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Serve an existing build with the comments/reactions/search API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// Origin (default: site.yml base_url, then localhost)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Validate content and templates without writing anything
    Check,
}

impl Cli {
    fn build_config(&self, site: SiteConfig, base_url: String, dev_mode: bool) -> BuildConfig {
        BuildConfig {
            content_dir: self.content.clone(),
            output_dir: self.output.clone(),
            static_dir: self.static_dir.clone(),
            template_dir: self.templates.clone(),
            base_url,
            dev_mode,
            site,
            max_threads: self.threads,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    init_thread_pool(cli.threads);
    let site = config::load_site_config(&cli.site_config)?;

    match &cli.command {
        Command::Build { base_url, no_index } => {
            let base_url = site.resolve_base_url(base_url.as_deref(), false, None);
            let build = cli.build_config(site, base_url, false);
            let store = if *no_index {
                None
            } else {
                Some(Store::open(&cli.db).await?)
            };

            println!("==> Building {} → {}", build.content_dir.display(), build.output_dir.display());
            let index = store.clone().map(|s| BlockingIndex::new(s, Handle::current()));
            let report = tokio::task::spawn_blocking(move || {
                let result = pipeline::build(&build, index.as_ref().map(|i| i as &dyn SearchIndex));
                result.map(|report| (report, build.output_dir))
            })
            .await?;
            if let Some(store) = store {
                store.close().await;
            }
            let (report, output_dir) = report?;
            output::print_build_report(&report, &output_dir);
            println!("==> Build complete");
        }
        Command::Dev { port, base_url } => {
            let base_url = site.resolve_base_url(base_url.as_deref(), true, Some(*port));
            let build = cli.build_config(site, base_url.clone(), true);
            server::run(ServeConfig {
                build,
                port: *port,
                db_path: cli.db.clone(),
                oauth: OAuthSettings::from_env(&base_url),
            })
            .await?;
        }
        Command::Serve { port, base_url } => {
            let base_url = site.resolve_base_url(base_url.as_deref(), false, Some(*port));
            let build = cli.build_config(site, base_url.clone(), false);
            server::run(ServeConfig {
                build,
                port: *port,
                db_path: cli.db.clone(),
                oauth: OAuthSettings::from_env(&base_url),
            })
            .await?;
        }
        Command::Check => {
            let build = cli.build_config(site, String::new(), false);
            println!("==> Checking {}", build.content_dir.display());
            let report = pipeline::check(&build)?;
            output::print_check_report(&report);
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool used for card rendering.
///
/// Capped at the number of available cores; `--threads` can only lower it.
fn init_thread_pool(max_threads: Option<usize>) {
    let threads = config::effective_threads(max_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
