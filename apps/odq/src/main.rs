mod commands;

use anyhow::Result;
use clap::{Parser as ClapParser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(ClapParser, Debug)]
#[command(name = "odq")]
#[command(about = "Compile, evaluate and run OData queries", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the $filter clause for a predicate file
    Compile {
        /// Predicate AST as JSON
        predicate: PathBuf,

        /// Render booleans as NoYes enumeration members
        #[arg(long, default_value_t = false)]
        sentinel: bool,
    },

    /// Print the records of a JSON array (or page) that match a predicate
    Eval {
        /// Predicate AST as JSON
        predicate: PathBuf,

        /// JSON array of records, or a page with a `value` array
        records: PathBuf,

        /// Read NoYes labels in records as booleans
        #[arg(long, default_value_t = false)]
        sentinel: bool,
    },

    /// Run a query against the configured service and print the records
    Fetch {
        /// Entity set name
        entity: String,

        /// Server-side predicate file
        #[arg(long)]
        filter: Option<PathBuf>,

        /// Client-side predicate file, applied page by page
        #[arg(long)]
        local_filter: Option<PathBuf>,

        /// Comma-separated fields for $select
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,

        /// Stop after this many records
        #[arg(long)]
        limit: Option<usize>,

        /// Ask the service for @odata.count
        #[arg(long, default_value_t = false)]
        count: bool,

        /// Query across all legal entities
        #[arg(long, default_value_t = false)]
        cross_company: bool,

        /// YAML client config; ODATA_* environment variables otherwise
        #[arg(long, env = "ODQ_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "odq=info,odata_query=info,odata_client=info".into());

    // stdout carries results; logs go to stderr.
    Registry::default()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Commands::Compile {
            predicate,
            sentinel,
        } => {
            println!("{}", commands::compile(&predicate, sentinel)?);
        }
        Commands::Eval {
            predicate,
            records,
            sentinel,
        } => {
            let matched = commands::eval(&predicate, &records, sentinel)?;
            println!("{}", serde_json::to_string_pretty(&matched)?);
        }
        Commands::Fetch {
            entity,
            filter,
            local_filter,
            select,
            limit,
            count,
            cross_company,
            config,
        } => {
            let options = commands::FetchOptions {
                entity,
                filter,
                local_filter,
                select,
                limit,
                count,
                cross_company,
                config,
            };
            let records = commands::fetch(options).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    Ok(())
}
