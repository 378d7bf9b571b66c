use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;

use crate::config::{load_config_file, ConfigError, ConfigLayer, LoaderConfig};
use crate::data::check::check_file;
use crate::data::import::{apply_import, plan_import};
use crate::data::schema::{PrimaryLanguage, RecordSchema};
use crate::logging::init_logging;
use crate::store::inspect::{clear_collection, list_documents, test_connection, DEFAULT_LIST_LIMIT};
use crate::store::{MongoStore, StoreError};

#[derive(Debug, Parser)]
#[command(
    name = "newsloader",
    version,
    about = "Inspect a MongoDB collection and bulk-load bilingual news records into it"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// MongoDB connection string; its path names the database
    #[arg(long = "uri", env = "NEWSLOADER_URI", global = true)]
    pub connection_string: Option<String>,

    /// Target collection
    #[arg(long, env = "NEWSLOADER_COLLECTION", global = true)]
    pub collection: Option<String>,

    /// Database to use instead of the one in the connection string
    #[arg(long, env = "NEWSLOADER_DATABASE", global = true)]
    pub database: Option<String>,

    /// YAML file with default settings
    #[arg(long, env = "NEWSLOADER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Key of the non-English language in bilingual fields
    #[arg(long = "primary-lang", value_enum, global = true)]
    pub primary_language: Option<PrimaryLanguage>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Ping the server, list collections and count the target collection
    Ping,
    /// Print documents of the target collection
    List {
        #[arg(
            long,
            default_value_t = DEFAULT_LIST_LIMIT,
            value_parser = clap::value_parser!(i64).range(0..)
        )]
        limit: i64,
    },
    /// Replace the target collection with the records of a JSON file
    Import {
        /// JSON array of records; defaults to the configured import file
        path: Option<PathBuf>,
        /// Validate and transform only; do not connect
        #[arg(long)]
        dry_run: bool,
        /// Abort instead of substituting the import time for bad publishTime values
        #[arg(long, overrides_with = "no_strict_timestamps")]
        strict_timestamps: bool,
        /// Substitute the import time even if the config file asks for strict timestamps
        #[arg(long, overrides_with = "strict_timestamps")]
        no_strict_timestamps: bool,
    },
    /// Delete every document in the target collection
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Validate a JSON file offline
    Check { path: PathBuf },
}

impl Command {
    /// Timestamp strictness requested on the command line, if any.
    pub fn strict_timestamps(&self) -> Option<bool> {
        match self {
            Command::Import {
                strict_timestamps: true,
                ..
            } => Some(true),
            Command::Import {
                no_strict_timestamps: true,
                ..
            } => Some(false),
            _ => None,
        }
    }
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    Cli::try_parse_from(args).ok().map(|cli| cli.command)
}

pub fn run_with_args(args: &[String]) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };
    init_logging(cli.global.verbose);

    let config = match resolve_config(&cli.global, cli.command.strict_timestamps()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return 2;
        }
    };
    debug!(
        collection = %config.store.collection,
        database = ?config.store.database,
        "resolved configuration"
    );

    match cli.command {
        Command::Ping => handle_ping(&config),
        Command::List { limit } => handle_list(&config, limit),
        Command::Import { path, dry_run, .. } => handle_import(&config, path, dry_run),
        Command::Clear { yes } => handle_clear(&config, yes),
        Command::Check { path } => handle_check(&config, &path),
    }
}

fn resolve_config(
    global: &GlobalArgs,
    strict_timestamps: Option<bool>,
) -> Result<LoaderConfig, ConfigError> {
    let file_layer = match &global.config {
        Some(path) => load_config_file(path)?,
        None => ConfigLayer::default(),
    };
    let cli_layer = ConfigLayer {
        connection_string: global.connection_string.clone(),
        collection: global.collection.clone(),
        database: global.database.clone(),
        primary_language: global.primary_language,
        strict_timestamps,
        ..ConfigLayer::default()
    };
    LoaderConfig::resolve(cli_layer.or(file_layer))
}

fn connect(config: &LoaderConfig) -> Result<MongoStore, StoreError> {
    MongoStore::connect(&config.store)
}

fn handle_ping(config: &LoaderConfig) -> i32 {
    let result = connect(config).and_then(|store| test_connection(&store, &config.store.collection));
    match result {
        Ok(summary) => {
            println!("{summary}");
            0
        }
        Err(err) => {
            eprintln!("connection test failed: {err}");
            1
        }
    }
}

fn handle_list(config: &LoaderConfig, limit: i64) -> i32 {
    let collection = &config.store.collection;
    let result = connect(config).and_then(|store| list_documents(&store, collection, limit));
    let documents = match result {
        Ok(documents) => documents,
        Err(err) => {
            eprintln!("failed to list documents: {err}");
            return 1;
        }
    };

    println!("documents in collection '{collection}':");
    if documents.is_empty() {
        println!("collection is empty");
        return 0;
    }
    for (offset, document) in documents.iter().enumerate() {
        match serde_json::to_string_pretty(document) {
            Ok(payload) => println!("document {}:\n{payload}", offset + 1),
            Err(err) => {
                eprintln!("failed to serialize document {}: {err}", offset + 1);
                return 1;
            }
        }
    }
    0
}

fn handle_import(config: &LoaderConfig, path: Option<PathBuf>, dry_run: bool) -> i32 {
    let path = path.unwrap_or_else(|| config.default_import_path.clone());
    let schema = RecordSchema::import(config.primary_language);

    let plan = match plan_import(&path, &schema, config.timestamp_policy) {
        Ok(plan) => plan,
        Err(err) => {
            eprintln!("import failed: {err}");
            return 1;
        }
    };
    if dry_run {
        println!("{plan}");
        return 0;
    }

    let store = match connect(config) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("import failed: {err}");
            return 1;
        }
    };
    match apply_import(&store, &config.store.collection, plan) {
        Ok(report) => {
            println!("{report}");
            0
        }
        Err(err) => {
            eprintln!("import failed: {err}");
            1
        }
    }
}

fn handle_clear(config: &LoaderConfig, yes: bool) -> i32 {
    let collection = &config.store.collection;
    if !yes {
        let prompt = format!("Delete every document in '{collection}'? This cannot be undone [y/N]: ");
        let confirmed = confirm(&prompt, &mut io::stdin().lock(), &mut io::stdout());
        if !confirmed {
            println!("clear cancelled");
            return 0;
        }
    }

    match connect(config).and_then(|store| clear_collection(&store, collection)) {
        Ok(deleted) => {
            println!("collection '{collection}' cleared: {deleted} documents removed");
            0
        }
        Err(err) => {
            eprintln!("failed to clear collection: {err}");
            1
        }
    }
}

fn handle_check(config: &LoaderConfig, path: &Path) -> i32 {
    let schema = RecordSchema::check(config.primary_language);
    match check_file(path, &schema) {
        Ok(summary) if summary.passed() => {
            println!("{summary}");
            0
        }
        Ok(summary) => {
            eprintln!("{summary}");
            1
        }
        Err(err) => {
            eprintln!("check failed: {err}");
            1
        }
    }
}

/// Writes `prompt` and reads one answer; only `y`/`yes` confirm.
pub fn confirm<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> bool {
    if write!(output, "{prompt}").and_then(|_| output.flush()).is_err() {
        return false;
    }
    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
