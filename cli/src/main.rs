use std::path::PathBuf;
use std::process::exit;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use shelfmark_backend::db::{open_catalog, CatalogDbHandle};
use shelfmark_backend::ebook::locator::find_ebook_dirs;
use shelfmark_backend::library::{Library, LibraryParams};
use shelfmark_backend::logger::init_logging;
use shelfmark_backend::types::EbookSortType;
use shelfmark_backend::{CatalogConfig, CatalogError, EbookExtractor, EbookRecord};

#[derive(Parser, Debug)]
#[command(author, version, about = "Shelfmark ebook catalog CLI", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Root of the served site. Title directories live under {web_root}/ebooks/.
    #[arg(long, global = true, value_name = "DIRECTORY_PATH", env = "SHELFMARK_WEB_ROOT")]
    web_root: Option<PathBuf>,

    /// Directory of the title repositories.
    #[arg(long, global = true, value_name = "DIRECTORY_PATH", env = "SHELFMARK_REPOS_ROOT")]
    repos_root: Option<PathBuf>,

    /// Path or URL of the catalog SQLite database.
    #[arg(long, global = true, value_name = "DATABASE_URL", env = "SHELFMARK_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract one title and print its record as JSON
    #[command(arg_required_else_help = true)]
    Extract {
        /// The title's serving directory, containing content.opf
        #[arg(value_name = "DIRECTORY_PATH")]
        path: PathBuf,
    },

    /// Extract titles and create or update them in the catalog
    #[command(arg_required_else_help = true)]
    Import {
        #[arg(value_name = "DIRECTORY_PATH", required = true)]
        paths: Vec<PathBuf>,
    },

    /// Extract every title under the ebooks directory and import it
    Rebuild {
        /// Defaults to {web_root}/ebooks
        #[arg(value_name = "DIRECTORY_PATH")]
        ebooks_dir: Option<PathBuf>,

        /// Stop without importing anything if any title fails to extract
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Search the catalog
    Search {
        /// Phrase to match against titles, authors, collections, tags and subjects
        query: Option<String>,

        /// Tag URL name, may be repeated
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Author URL name, e.g. jules-verne or karl-marx_friedrich-engels
        #[arg(long, conflicts_with_all = ["collection", "query", "tags"])]
        author: Option<String>,

        /// Collection URL name
        #[arg(long, conflicts_with_all = ["author", "query", "tags"])]
        collection: Option<String>,

        /// newest, author-alpha, reading-ease or length
        #[arg(long, default_value = "newest")]
        sort: EbookSortType,

        #[arg(long, default_value_t = 1)]
        page: i64,

        /// Defaults to SHELFMARK_PAGE_SIZE
        #[arg(long)]
        per_page: Option<i64>,

        /// Print full records as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List all tags
    Tags,

    /// List all collections
    Collections,
}

fn print_records(records: &[EbookRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    for r in records {
        let authors: Vec<&str> = r.authors.iter().map(|a| a.name.as_str()).collect();
        println!("{}: {} ({})", r.derived.url, r.title, authors.join(", "));
    }
    Ok(())
}

fn extract_command(config: CatalogConfig, path: PathBuf) -> Result<()> {
    let extractor = EbookExtractor::new(config);
    let record = extractor.extract(&path)
        .with_context(|| format!("Failed to extract: {}", path.display()))?;
    println!("{}", record.to_json()?);
    Ok(())
}

fn import_command(config: CatalogConfig, paths: Vec<PathBuf>) -> Result<()> {
    let db = open_catalog(&config)?;
    let extractor = EbookExtractor::new(config.clone());

    for path in paths {
        let record = extractor.extract(&path)
            .with_context(|| format!("Failed to extract: {}", path.display()))?;
        db.create_or_update_ebook(&record, &config)
            .with_context(|| format!("Failed to import: {}", record.identifier))?;
        println!("{}", record.identifier);
    }

    Ok(())
}

fn rebuild_command(config: CatalogConfig, ebooks_dir: Option<PathBuf>, strict: bool) -> Result<()> {
    let ebooks_dir = ebooks_dir.unwrap_or_else(|| config.ebooks_dist_path());
    if !ebooks_dir.is_dir() {
        return Err(anyhow!("Ebooks directory does not exist: {}", ebooks_dir.display()));
    }

    let dirs = find_ebook_dirs(&ebooks_dir);
    tracing::info!("Found {} titles under {}", dirs.len(), ebooks_dir.display());

    let extractor = EbookExtractor::new(config.clone());

    let pb = ProgressBar::new(dirs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    // Extraction is independent per title. Writes stay serial.
    let results: Vec<(PathBuf, Result<EbookRecord, CatalogError>)> = dirs
        .par_iter()
        .map(|dir| {
            let result = extractor.extract(dir);
            pb.inc(1);
            (dir.clone(), result)
        })
        .collect();
    pb.finish_with_message("extracted");

    let (records, failures): (Vec<_>, Vec<_>) = results.into_iter().partition(|(_, r)| r.is_ok());

    for (dir, result) in &failures {
        if let Err(e) = result {
            tracing::warn!("{}: {}", dir.display(), e);
        }
    }

    if strict && !failures.is_empty() {
        return Err(anyhow!("{} of {} titles failed to extract", failures.len(), dirs.len()));
    }

    let db = open_catalog(&config)?;
    let mut imported = 0;
    for (_, result) in records {
        if let Ok(record) = result {
            db.create_or_update_ebook(&record, &config)
                .with_context(|| format!("Failed to import: {}", record.identifier))?;
            imported += 1;
        }
    }

    tracing::info!("Imported {} titles, {} failed", imported, failures.len());
    println!("Imported {} of {} titles", imported, dirs.len());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn search_command(
    config: CatalogConfig,
    db: &CatalogDbHandle,
    query: Option<String>,
    tags: Vec<String>,
    author: Option<String>,
    collection: Option<String>,
    sort: EbookSortType,
    page: i64,
    per_page: Option<i64>,
    json: bool,
) -> Result<()> {
    let library = Library::new(db, &config);

    if let Some(author) = author {
        let records = library.get_ebooks_by_author(&author)?;
        return print_records(&records, json);
    }

    if let Some(collection) = collection {
        let records = library.get_ebooks_by_collection(&collection)?;
        return print_records(&records, json);
    }

    let params = LibraryParams {
        query,
        tags,
        sort,
        page,
        per_page: per_page.unwrap_or(config.page_size),
    };
    let result = library.filter_ebooks(&params)?;

    print_records(&result.ebooks, json)?;
    if !json {
        println!("Page {} of {}, {} titles", result.page, result.page_count, result.total);
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<CatalogConfig> {
    let mut config = CatalogConfig::load()?;
    if let Some(p) = &cli.web_root {
        config.web_root = p.clone();
    }
    if let Some(p) = &cli.repos_root {
        config.repos_root = p.clone();
    }
    if let Some(url) = &cli.database_url {
        config.database_url = Some(url.clone());
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Extract { path } => extract_command(config, path),

        Commands::Import { paths } => import_command(config, paths),

        Commands::Rebuild { ebooks_dir, strict } => rebuild_command(config, ebooks_dir, strict),

        Commands::Search { query, tags, author, collection, sort, page, per_page, json } => {
            let db = open_catalog(&config)?;
            search_command(config, &db, query, tags, author, collection, sort, page, per_page, json)
        }

        Commands::Tags => {
            let db = open_catalog(&config)?;
            for tag in Library::new(&db, &config).get_tags()? {
                println!("{}: {}", tag.url_name, tag.name);
            }
            Ok(())
        }

        Commands::Collections => {
            let db = open_catalog(&config)?;
            for c in Library::new(&db, &config).get_collections()? {
                println!("{}: {}", c.url_name, c.name);
            }
            Ok(())
        }
    }
}

fn main() {
    // Load .env before clap reads the SHELFMARK_* variables.
    dotenv().ok();

    let cli = Cli::parse();
    init_logging();

    if let Err(e) = run(cli) {
        eprintln!("Error executing command: {:#}", e);
        exit(1);
    }
}
