use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::load::DEFAULT_BATCH_SIZE;
use crate::source::DEFAULT_CSV_ENTRY;

const DEFAULT_DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data");

#[derive(Parser, Debug)]
#[command(name = "drg-explorer")]
#[command(about = "Medicare inpatient DRG explorer backend (SQLite)", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replace the record store with the contents of the source ZIP/CSV.
    Load(LoadArgs),
    /// Serve the HTTP API (requires a completed load).
    Serve(ServeArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct LoadArgs {
    /// Backend data directory (source files, SQLite DB, load metadata).
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    /// Source archive (.zip) or extracted CSV. Defaults to the CMS ZIP under <data-dir>/source.
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// CSV entry to read when the source is a ZIP archive.
    #[arg(long, default_value = DEFAULT_CSV_ENTRY)]
    pub csv_entry: String,

    /// Rows per insert batch.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Backend data directory (SQLite DB and load metadata).
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8787)]
    pub port: u16,
}
