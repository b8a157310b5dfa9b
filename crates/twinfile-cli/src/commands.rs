use std::fs;
use std::io::{self, Read};

use anyhow::Context;
use chrono::{DateTime, Utc};
use colored::Colorize;
use twinfile_store::{DualSlotStore, SlotStatus, StoreConfig, SyncMode};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let store = open_store(&cli)?;
    match cli.command {
        Command::Write(args) => cmd_write(&store, args),
        Command::Read => cmd_read(&store),
        Command::Status => cmd_status(&store, &cli.format),
        Command::Delete => cmd_delete(&store),
    }
}

fn store_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StoreConfig::new(cli.base.clone(), cli.ext.clone()),
    };
    if cli.no_sync {
        config.sync_mode = SyncMode::OsDefault;
    }
    Ok(config)
}

fn open_store(cli: &Cli) -> anyhow::Result<DualSlotStore> {
    Ok(DualSlotStore::from_config(store_config(cli)?)?)
}

fn cmd_write(store: &DualSlotStore, args: WriteArgs) -> anyhow::Result<()> {
    let content = match (args.content, args.file) {
        (Some(content), _) => content,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };
    let slot = store.write(&content)?;
    println!(
        "{} Wrote {} bytes to {}",
        "✓".green().bold(),
        content.len(),
        store.slot(slot).path().display().to_string().bold()
    );
    Ok(())
}

fn cmd_read(store: &DualSlotStore) -> anyhow::Result<()> {
    print!("{}", store.read()?);
    Ok(())
}

fn cmd_status(store: &DualSlotStore, format: &OutputFormat) -> anyhow::Result<()> {
    let status = store.status();
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    print_slot(&status.a);
    print_slot(&status.b);
    println!("Newest: {}", fmt_time(status.newest));
    println!("Oldest: {}", fmt_time(status.oldest));
    match store.read_source() {
        Ok(slot) => println!("Read source:  {}", slot.to_string().yellow()),
        Err(e) => println!("Read source:  {}", e.to_string().red()),
    }
    match store.write_target() {
        Ok(slot) => println!("Write target: {}", slot.to_string().yellow()),
        Err(e) => println!("Write target: {}", e.to_string().red()),
    }
    Ok(())
}

fn fmt_time(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
}

fn print_slot(status: &SlotStatus) {
    let state = if !status.exists {
        "missing".dimmed()
    } else if status.failure.is_some() {
        "unobservable".red()
    } else {
        "present".green()
    };
    println!("{} {} ({})", status.id.to_string().bold(), status.path.display(), state);
    if status.exists {
        let flag = |b: bool| if b { "yes".green() } else { "no".red() };
        println!("  readable: {}  writable: {}", flag(status.readable), flag(status.writable));
        if let Some(modified) = status.modified {
            println!("  modified: {}", modified.to_rfc3339());
        }
        if let Some(failure) = status.failure {
            println!("  probe failure: {failure:?}");
        }
    }
}

fn cmd_delete(store: &DualSlotStore) -> anyhow::Result<()> {
    store.delete()?;
    println!("{} Removed both files", "✓".green().bold());
    Ok(())
}
