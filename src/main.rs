// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Erdsketch CLI entrypoint.
//!
//! Runs the layout engine and a folder-backed session outside an editor host. Logs go to
//! stderr, filtered by `RUST_LOG` (default `warn`).

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use erdsketch::config::LayoutMode;
use erdsketch::layout::compute_elements_positions;
use erdsketch::persist::PersistenceAdapter;
use erdsketch::store::{FolderTransport, PersistFolder, WriteDurability};
use erdsketch::{DiagramConfig, DiagramSession, EntityKind, Schema, ScopeKey};

#[derive(Parser, Debug)]
#[command(name = "erdsketch", version, about = "Lay out and persist ER diagrams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the computed initial layout of a schema
    Layout {
        /// Parsed schema as JSON
        schema: PathBuf,
        /// Use the deterministic grid instead of the layered layout
        #[arg(long)]
        grid: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Open a schema against a folder store and print the resulting diagram state
    Open {
        schema: PathBuf,
        /// Directory holding one JSON file per persisted key
        #[arg(long)]
        store: PathBuf,
        /// Document scope, usually the schema file URI
        #[arg(long)]
        scope: String,
        #[arg(long)]
        config: Option<PathBuf>,
        /// fsync every write
        #[arg(long)]
        durable_writes: bool,
    },
    /// List the keys persisted in a folder store
    Keys {
        #[arg(long)]
        store: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Layout {
            schema,
            grid,
            config,
        } => cmd_layout(&schema, grid, config.as_deref()),
        Commands::Open {
            schema,
            store,
            scope,
            config,
            durable_writes,
        } => cmd_open(&schema, store, &scope, config.as_deref(), durable_writes),
        Commands::Keys { store } => cmd_keys(store),
    };

    if let Err(err) = result {
        eprintln!("erdsketch: {err}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<DiagramConfig, Box<dyn Error>> {
    match path {
        Some(path) => Ok(DiagramConfig::from_path(path)?),
        None => Ok(DiagramConfig::default()),
    }
}

fn load_schema(path: &Path) -> Result<Schema, Box<dyn Error>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn cmd_layout(schema: &Path, grid: bool, config: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(config)?;
    if grid {
        config.layout.mode = LayoutMode::Grid;
    }
    let schema = load_schema(schema)?;
    let positions = compute_elements_positions(&schema.tables, &schema.refs, &schema.enums, &config);
    println!("{}", serde_json::to_string_pretty(&positions)?);
    Ok(())
}

fn cmd_open(
    schema: &Path,
    store: PathBuf,
    scope: &str,
    config: Option<&Path>,
    durable_writes: bool,
) -> Result<(), Box<dyn Error>> {
    let config = load_config(config)?;
    let schema = load_schema(schema)?;
    let scope = ScopeKey::new(scope)?;

    let durability = if durable_writes {
        WriteDurability::Durable
    } else {
        WriteDurability::BestEffort
    };
    let folder = PersistFolder::new(store).with_durability(durability);
    let snapshot = folder.load_all()?;

    let (tx, rx) = mpsc::channel();
    let transport = FolderTransport::spawn(folder, tx)?;
    let adapter = PersistenceAdapter::default()
        .with_snapshot(snapshot)
        .with_durable_store(Box::new(transport.clone()))
        .into_shared();

    let mut session = DiagramSession::create(config, adapter);
    session.switch_scope(scope.clone(), schema);
    session.save_all();

    // Acks can release parked writes, so drain until the worker goes quiet.
    loop {
        transport.flush();
        let events = rx.try_iter().collect::<Vec<_>>();
        if events.is_empty() {
            break;
        }
        for event in events {
            session.handle_host_event(event);
        }
    }

    let groups = session.groups().groups().collect::<Vec<_>>();
    let state = json!({
        "scope": scope.as_str(),
        "tables": session.positions(EntityKind::Table),
        "enums": session.positions(EntityKind::Enum),
        "groups": groups,
    });
    println!("{}", serde_json::to_string_pretty(&state)?);
    session.dispose();
    transport.flush();
    Ok(())
}

fn cmd_keys(store: PathBuf) -> Result<(), Box<dyn Error>> {
    let folder = PersistFolder::new(store);
    for key in folder.load_all()?.keys() {
        println!("{key}");
    }
    Ok(())
}
