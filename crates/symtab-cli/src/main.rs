//! symtab CLI: inspect and administer a saved engine symbol table.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use symtab_core::config::ClientConfig;
use symtab_core::engine::SymbolTable;
use symtab_core::error::Error;
use symtab_core::protocol::{DTypeHint, DeleteOutcome};
use symtab_engine::MemoryEngine;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "symtab")]
#[command(about = "Inspect and administer a symtab engine snapshot", long_about = None)]
struct Cli {
    /// Snapshot file (defaults to $SYMTAB_STATE)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List symbol names
    Ls {
        /// Only registered names
        #[arg(long)]
        registered: bool,

        /// Only names starting with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Attach a name and print the resolved object
    Show {
        name: String,

        /// Type hint: infer, plain, string, categorical, segmented-array, grouped-result, tabular
        #[arg(long, default_value = "infer")]
        dtype: String,
    },

    /// Unregister an object and its components by name
    Unregister {
        name: String,

        #[arg(long, default_value = "infer")]
        dtype: String,
    },

    /// Delete one unregistered symbol
    Delete { name: String },

    /// Remove every unregistered symbol
    Clear,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        for hint in e.suggestions() {
            eprintln!("  hint: {}", hint);
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), Error> {
    let mut config = ClientConfig::from_env();
    if let Some(path) = &cli.state {
        config.state_path = Some(path.display().to_string());
    }
    config.validate()?;
    let path = config
        .state_path
        .clone()
        .ok_or_else(|| Error::Config("no snapshot given; pass --state or set SYMTAB_STATE".into()))?;
    let engine = MemoryEngine::load(&path, config)?;

    match cli.command {
        Commands::Ls { registered, prefix } => {
            let names = if registered {
                symtab_registry::list_registry(&engine)?
            } else {
                symtab_registry::list_symbol_table(&engine)?
            };
            for name in names
                .iter()
                .filter(|n| prefix.as_deref().map_or(true, |p| n.starts_with(p)))
            {
                println!("{}", name);
            }
        }
        Commands::Show { name, dtype } => {
            let hint: DTypeHint = dtype.parse()?;
            let attached = symtab_registry::attach(&engine, &name, hint)?;
            let status = match symtab_registry::is_registered(&engine, &attached) {
                Ok(true) => "registered".to_string(),
                Ok(false) => "not registered".to_string(),
                Err(e) if e.is_inconsistency() => format!("inconsistent ({})", e),
                Err(e) => return Err(e),
            };
            println!("{}", serde_json::to_string_pretty(&attached)?);
            println!("status: {}", status);
        }
        Commands::Unregister { name, dtype } => {
            let hint: DTypeHint = dtype.parse()?;
            let msg = symtab_registry::unregister_by_name(&engine, &name, hint)?;
            engine.save(&path)?;
            println!("{}", msg);
        }
        Commands::Delete { name } => {
            match engine.delete(&name)? {
                DeleteOutcome::Deleted => println!("deleted {}", name),
                DeleteOutcome::RegisteredNotDeleted => {
                    println!("{} is registered, not deleted", name)
                }
            }
            engine.save(&path)?;
        }
        Commands::Clear => {
            let before = symtab_registry::list_symbol_table(&engine)?.len();
            symtab_registry::clear(&engine)?;
            let after = symtab_registry::list_symbol_table(&engine)?.len();
            engine.save(&path)?;
            info!(removed = before - after, "cleared");
            println!("removed {} unregistered symbol(s), {} remain", before - after, after);
        }
    }
    Ok(())
}
