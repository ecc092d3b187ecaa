//! resstore CLI - Inspect the resources of a dictionary directory

use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use resstore_storage::{Progress, ResourceProvider, ResourceStore, StorageError, StoreOptions};

#[derive(Parser)]
#[command(name = "resstore")]
#[command(about = "Inspect dictionary resource storage", long_about = None)]
struct Cli {
    /// Storage options as a JSON file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which backends a directory provides
    Info {
        /// Dictionary directory
        dir: PathBuf,
    },
    /// Check whether resources exist
    Has {
        /// Dictionary directory
        dir: PathBuf,
        /// Resource names (either separator)
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// List archive entries and loose files
    List {
        /// Dictionary directory
        dir: PathBuf,
    },
    /// Write a resource's bytes to stdout or a file
    Cat {
        /// Dictionary directory
        dir: PathBuf,
        /// Resource name
        name: String,
        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let options = match &cli.config {
        Some(path) => match StoreOptions::from_json_file(path) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("Error reading config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => StoreOptions::default(),
    };

    match cli.command {
        Commands::Info { dir } => cmd_info(&dir, &options),
        Commands::Has { dir, names } => cmd_has(&dir, &options, &names),
        Commands::List { dir } => cmd_list(&dir, &options),
        Commands::Cat { dir, name, output } => cmd_cat(&dir, &options, &name, output),
    }
}

fn load_or_exit(dir: &Path, options: &StoreOptions) -> ResourceStore {
    let on_progress = |p: Progress| debug!(progress = %p, "loading");
    match ResourceStore::load_with(dir, options, on_progress) {
        Ok(store) => store,
        Err(e) => {
            report_load_error(dir, &e);
            std::process::exit(1);
        }
    }
}

fn report_load_error(dir: &Path, err: &StorageError) {
    eprintln!("✗ {} - {}", dir.display(), err);
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}

fn cmd_info(dir: &Path, options: &StoreOptions) {
    let store = load_or_exit(dir, options);

    println!("Directory: {}", store.root().display());
    println!("Backends: {}", store.backends().name());
    if let Some(database) = store.backends().database() {
        println!("Archive: {}", database.path().display());
    }
    print!("{}", store.stats());
}

fn cmd_has(dir: &Path, options: &StoreOptions, names: &[String]) {
    let store = load_or_exit(dir, options);

    let mut all_found = true;
    for name in names {
        if store.have_file(name) {
            println!("yes {}", name);
        } else {
            println!("no  {}", name);
            all_found = false;
        }
    }

    if !all_found {
        std::process::exit(1);
    }
}

fn cmd_list(dir: &Path, options: &StoreOptions) {
    let store = load_or_exit(dir, options);

    if let Some(database) = store.backends().database() {
        println!("# archive ({} entries)", database.len());
        for entry in database.entries() {
            println!("{:>12}  {}", entry.length, entry.path);
        }
    }
    if let Some(files) = store.backends().files() {
        println!("# loose files ({} entries)", files.len());
        for path in files.iter() {
            println!("{}", path);
        }
    }
}

fn cmd_cat(dir: &Path, options: &StoreOptions, name: &str, output: Option<PathBuf>) {
    let store = load_or_exit(dir, options);

    let bytes = match store.read_file(name) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {}", name, e);
            std::process::exit(1);
        }
    };

    let result = match &output {
        Some(path) => fs::write(path, &bytes),
        None => std::io::stdout().lock().write_all(&bytes),
    };
    if let Err(e) = result {
        eprintln!("Error writing output: {}", e);
        std::process::exit(1);
    }
}
