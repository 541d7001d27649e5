pub mod list;
pub mod remove;
pub mod rename;
pub mod reset;
pub mod scan;
pub mod seek;
pub mod show;

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use std::sync::Arc;

use audioshelf::config::Config;
use audioshelf::library::LibraryStore;
use audioshelf::media::LoftyMedia;

use crate::cli::Cli;

/// Settings shared by every command, resolved once from config and flags
pub struct Context {
    pub config: Config,
    pub data_dir: PathBuf,
    fifo_override: Option<PathBuf>,
    pub quiet: bool,
}

impl Context {
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load().context("Failed to load config")?,
        };
        let data_dir = config.data_dir(cli.data_dir.as_deref())?;

        Ok(Self {
            config,
            data_dir,
            fifo_override: cli.fifo.clone(),
            quiet: cli.quiet,
        })
    }

    /// Tag decoder pipe; only commands that talk to the decoder need it
    pub fn fifo(&self) -> Result<PathBuf> {
        self.config.fifo_path(self.fifo_override.as_deref())
    }

    pub fn open_store(&self) -> Result<LibraryStore> {
        LibraryStore::open(
            &self.data_dir,
            self.config.store_options(),
            Arc::new(LoftyMedia),
        )
        .with_context(|| format!("Failed to open library at {:?}", self.data_dir))
    }
}
