//! unisearch CLI
//!
//! Local entry point for managing the item and university indices.
//! Every command prints its result as JSON on stdout.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use unisearch::{
    config::Config,
    context::AppContext,
    error::Result,
    models::{ItemFields, ItemPatch, PageRequest, UniversityFields, UniversityPatch},
};

/// unisearch - Item and University Directory
#[derive(Parser, Debug)]
#[command(
    name = "unisearch",
    version,
    about = "Item and university directory backed by a search index"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "unisearch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the item and university indices if missing
    Init,

    /// Manage items
    #[command(subcommand)]
    Items(ItemCommand),

    /// Manage universities
    #[command(subcommand)]
    Universities(UniversityCommand),

    /// Universities in a country, fetched from the provider on first request
    Lookup {
        country: String,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Fetch a country's universities from the provider and store new ones
    Backfill { country: String },
}

#[derive(Args, Debug)]
struct PageArgs {
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    page: u64,

    /// Results per page
    #[arg(long, default_value_t = 10)]
    size: u64,
}

impl PageArgs {
    fn request(&self) -> Result<PageRequest> {
        PageRequest::new(self.page, self.size)
    }
}

#[derive(Subcommand, Debug)]
enum ItemCommand {
    /// Create an item
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        description: Option<String>,
        /// Mark the item as out of stock
        #[arg(long)]
        out_of_stock: bool,
    },
    /// Show an item
    Get { id: String },
    /// Update the given fields of an item
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        in_stock: Option<bool>,
    },
    /// Delete an item
    Delete { id: String },
    /// Search items by name and description
    Search {
        #[arg(short, long)]
        query: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Subcommand, Debug)]
enum UniversityCommand {
    /// Create a university under a generated id
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        country: String,
        #[arg(long)]
        alpha_two_code: String,
        /// Domain (repeatable, at least one)
        #[arg(long = "domain", required = true)]
        domains: Vec<String>,
        /// Web page (repeatable)
        #[arg(long = "web-page")]
        web_pages: Vec<String>,
        #[arg(long)]
        state_province: Option<String>,
    },
    /// Show a university
    Get { id: String },
    /// Update the given fields of a university
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        alpha_two_code: Option<String>,
        #[arg(long = "domain")]
        domains: Option<Vec<String>>,
        #[arg(long = "web-page")]
        web_pages: Option<Vec<String>>,
        #[arg(long)]
        state_province: Option<String>,
    },
    /// Delete a university
    Delete { id: String },
    /// Search universities by name and country
    Search {
        #[arg(short, long)]
        query: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_items(context: &AppContext, command: ItemCommand) -> Result<()> {
    let items = &context.items;
    match command {
        ItemCommand::Create {
            name,
            price,
            description,
            out_of_stock,
        } => {
            let item = items
                .create(ItemFields {
                    name,
                    description,
                    price,
                    in_stock: !out_of_stock,
                })
                .await?;
            log::info!("Created item {}", item.id);
            print_json(&item)
        }
        ItemCommand::Get { id } => print_json(&items.get(&id).await?),
        ItemCommand::Update {
            id,
            name,
            price,
            description,
            in_stock,
        } => {
            let patch = ItemPatch {
                name,
                description,
                price,
                in_stock,
            };
            print_json(&items.update(&id, &patch).await?)
        }
        ItemCommand::Delete { id } => {
            items.delete(&id).await?;
            log::info!("Deleted item {}", id);
            Ok(())
        }
        ItemCommand::Search { query, page } => {
            print_json(&items.search(query.as_deref(), page.request()?).await?)
        }
    }
}

async fn run_universities(context: &AppContext, command: UniversityCommand) -> Result<()> {
    let universities = context.universities.repository();
    match command {
        UniversityCommand::Create {
            name,
            country,
            alpha_two_code,
            domains,
            web_pages,
            state_province,
        } => {
            let university = universities
                .create(UniversityFields {
                    web_pages,
                    state_province,
                    name,
                    domains,
                    country,
                    alpha_two_code,
                })
                .await?;
            log::info!("Created university {}", university.id);
            print_json(&university)
        }
        UniversityCommand::Get { id } => print_json(&universities.get(&id).await?),
        UniversityCommand::Update {
            id,
            name,
            country,
            alpha_two_code,
            domains,
            web_pages,
            state_province,
        } => {
            let patch = UniversityPatch {
                web_pages,
                state_province,
                name,
                domains,
                country,
                alpha_two_code,
            };
            print_json(&universities.update(&id, &patch).await?)
        }
        UniversityCommand::Delete { id } => {
            universities.delete(&id).await?;
            log::info!("Deleted university {}", id);
            Ok(())
        }
        UniversityCommand::Search { query, page } => {
            print_json(&universities.search(query.as_deref(), page.request()?).await?)
        }
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A malformed file aborts here; only a missing one falls back to defaults.
    let file_config = Config::load_optional(&cli.config)?;
    let loaded = file_config.is_some();
    let config = file_config.unwrap_or_default().with_env();
    init_logging(cli.verbose, &config.logging.level);

    if loaded {
        log::info!("Loaded configuration from {}", cli.config.display());
    } else {
        log::warn!(
            "No configuration at {}. Using defaults.",
            cli.config.display()
        );
    }

    let context = AppContext::from_config(&config)?;

    // Indices are created once per process before anything touches them.
    let (items, universities) = context.ensure_indices().await?;
    log::debug!("Index status: items={:?}, universities={:?}", items, universities);

    match cli.command {
        Command::Init => {
            log::info!(
                "Indices ready: {} ({:?}), {} ({:?})",
                context.items.index(),
                items,
                context.universities.repository().index(),
                universities
            );
            Ok(())
        }
        Command::Items(command) => run_items(&context, command).await,
        Command::Universities(command) => run_universities(&context, command).await,
        Command::Lookup { country, page } => {
            let result = context
                .universities
                .lookup_by_country(&country, page.request()?)
                .await?;
            print_json(&result)
        }
        Command::Backfill { country } => {
            let result = context.universities.fetch_and_save(&country).await?;
            log::info!(
                "Fetched {} universities for '{}', saved {}",
                result.total_fetched,
                country,
                result.total_saved
            );
            print_json(&result)
        }
    }
}
