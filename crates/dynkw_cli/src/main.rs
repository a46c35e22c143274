//! Keyword listing tool for module metadata stores.
//!
//! # Responsibility
//! - Open a metadata store and run discovery for each stored module.
//! - Print the discovered keyword forest as text or JSON.
//!
//! # Invariants
//! - A module that fails discovery is reported and does not stop the others.
//! - Exit status is non-zero when the store cannot be read or any module
//!   failed.

use clap::Parser;
use dynkw_core::model::spec::{KeywordSpec, ModuleRef};
use dynkw_core::{
    discover_keywords, init_logging, open_db, MetadataRepository, SqliteMetadataRepository,
};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "dynkw", version, about = "List keywords declared in a module metadata store")]
struct Args {
    /// Path to the metadata store.
    #[arg(long)]
    store: PathBuf,

    /// Only list this module (case-insensitive).
    #[arg(long)]
    module: Option<String>,

    /// Print JSON instead of an indented tree.
    #[arg(long)]
    json: bool,

    #[arg(long, default_value_t = dynkw_core::default_log_level().to_string())]
    log_level: String,

    /// Absolute directory for log files; logging is off when omitted.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

enum Listing {
    Keywords(Vec<Arc<KeywordSpec>>),
    Failed(String),
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(log_dir) = &args.log_dir {
        if let Err(err) = init_logging(&args.log_level, &log_dir.to_string_lossy()) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("event=cli_list module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when at least one module failed discovery.
fn run(args: &Args) -> Result<bool, Box<dyn std::error::Error>> {
    let conn = open_db(&args.store)?;
    let repo = SqliteMetadataRepository::new(&conn);

    let modules = match &args.module {
        Some(name) => match repo.find_module(name)? {
            Some(module) => vec![module],
            None => return Err(format!("module `{name}` is not in the store").into()),
        },
        None => repo.list_modules()?,
    };

    let mut listings = Vec::with_capacity(modules.len());
    for module in modules {
        let listing = match repo.load_module(module.id) {
            Ok(metadata) => match discover_keywords(&metadata) {
                Ok(forest) => Listing::Keywords(forest.into_values().collect()),
                Err(err) => Listing::Failed(err.to_string()),
            },
            Err(err) => Listing::Failed(err.to_string()),
        };
        listings.push((module, listing));
    }

    let all_ok = listings
        .iter()
        .all(|(_, listing)| matches!(listing, Listing::Keywords(_)));
    info!(
        "event=cli_list module=cli status={} module_count={}",
        if all_ok { "ok" } else { "partial" },
        listings.len()
    );

    if args.json {
        print_json(&listings)?;
    } else {
        print_text(&listings);
    }
    Ok(all_ok)
}

fn print_json(listings: &[(ModuleRef, Listing)]) -> serde_json::Result<()> {
    let modules: Vec<serde_json::Value> = listings
        .iter()
        .map(|(module, listing)| match listing {
            Listing::Keywords(keywords) => serde_json::json!({
                "module": module,
                "keywords": keywords,
            }),
            Listing::Failed(message) => serde_json::json!({
                "module": module,
                "error": message,
            }),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&modules)?);
    Ok(())
}

fn print_text(listings: &[(ModuleRef, Listing)]) {
    for (module, listing) in listings {
        println!("{module} ({})", module.id);
        match listing {
            Listing::Keywords(keywords) if keywords.is_empty() => println!("  (no keywords)"),
            Listing::Keywords(keywords) => {
                for keyword in keywords {
                    print_keyword(keyword, 1);
                }
            }
            Listing::Failed(message) => println!("  discovery failed: {message}"),
        }
    }
}

fn print_keyword(keyword: &KeywordSpec, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{indent}{} [body={} use={}]",
        keyword.name, keyword.body_mode, keyword.use_mode
    );
    for parameter in &keyword.parameters {
        let sets: Vec<String> = parameter
            .parameter_sets
            .iter()
            .map(|(set, data)| {
                let position = data
                    .position
                    .map_or_else(|| "named".to_string(), |position| format!("pos {position}"));
                let mandatory = if data.mandatory { ", mandatory" } else { "" };
                format!("{set}: {position}{mandatory}")
            })
            .collect();
        println!(
            "{indent}  -{} <{}> ({})",
            parameter.name,
            parameter.type_name,
            sets.join("; ")
        );
    }
    for property in &keyword.properties {
        let mandatory = if property.mandatory { " mandatory" } else { "" };
        println!(
            "{indent}  .{} <{}>{mandatory}",
            property.name, property.type_constraint
        );
    }
    for child in &keyword.children {
        print_keyword(child, depth + 1);
    }
}
