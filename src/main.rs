use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// Use library instead of local modules
use ics_feed::config::KNOWN_KEYS;
use ics_feed::{FeedConfig, FeedService, HttpFetcher, PropertyStore, SqliteCache, SqlitePropertyStore};

const USAGE: &str = "Usage: ics-feed <command>

Commands:
  render            Print the feed JSON (cache-aware)
  clear             Force regeneration on the next render
  config            Show stored properties and the resolved configuration
  get KEY           Print one property
  set KEY VALUE     Store a property
  unset KEY         Remove a property

Environment:
  ICS_FEED_DB       SQLite database path (default: ics-feed.db)
  RUST_LOG          Log filter (default: ics_feed=info)";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ics_feed=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let db_path = database_path();

    match args.first().map(String::as_str) {
        Some("render") => run_render(&db_path),
        Some("clear") => {
            open_properties(&db_path)?
                .set(ics_feed::config::CLEAR_CACHE, "true")
                .context("Failed to raise clear flag")?;
            eprintln!("✓ Cache will be rebuilt on the next render");
            Ok(())
        }
        Some("config") => run_config(&db_path),
        Some("get") if args.len() == 2 => {
            match open_properties(&db_path)?.get(&args[1])? {
                Some(value) => println!("{}", value),
                None => eprintln!("❌ {} is not set", args[1]),
            }
            Ok(())
        }
        Some("set") if args.len() == 3 => {
            open_properties(&db_path)?.set(&args[1], &args[2])?;
            if !KNOWN_KEYS.contains(&args[1].as_str()) {
                eprintln!("⚠️  {} is not a key the feed reads", args[1]);
            }
            eprintln!("✓ {} updated", args[1]);
            Ok(())
        }
        Some("unset") if args.len() == 2 => {
            open_properties(&db_path)?.remove(&args[1])?;
            eprintln!("✓ {} removed", args[1]);
            Ok(())
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

fn database_path() -> PathBuf {
    env::var_os("ICS_FEED_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ics-feed.db"))
}

fn open_properties(db_path: &Path) -> Result<SqlitePropertyStore> {
    SqlitePropertyStore::open(db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))
}

fn run_render(db_path: &Path) -> Result<()> {
    let properties = Arc::new(open_properties(db_path)?);
    let cache = Arc::new(
        SqliteCache::open(db_path)
            .with_context(|| format!("Failed to open cache: {}", db_path.display()))?,
    );
    let fetcher = Arc::new(HttpFetcher::new().context("Failed to create HTTP client")?);

    let service = FeedService::new(properties, cache, fetcher);
    let response = service.handle();

    println!("{}", response.body);
    if response.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_config(db_path: &Path) -> Result<()> {
    let properties = open_properties(db_path)?;

    println!("📂 Database: {}", db_path.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for (key, value) in properties.all()? {
        println!("{:<24} {}", key, value);
    }

    let config = FeedConfig::load(&properties)?;
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Source URL:     {}", config.ics_url.as_deref().unwrap_or("(missing)"));
    println!("Debug:          {}", config.debug);
    println!("Cache timeout:  {}s", config.cache_timeout.as_secs());
    println!("Enrichment:     {} field(s)", config.enrichment.len());
    println!("Renames:        {} key(s)", config.renames.len());
    println!("Placeholders:   {} key(s)", config.placeholders.len());
    println!("Report to:      {}", config.email_log.as_deref().unwrap_or("(none)"));

    Ok(())
}
