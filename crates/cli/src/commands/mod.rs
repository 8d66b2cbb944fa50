//! CLI subcommands.

mod inspect;
mod replay;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use storage_content::ContentFactory;
use storage_core::{
    Catalog, FluidHandle, ItemHandle, MachineRecord, MachineStorage, Resource, StorageConfig,
};

use crate::config::CliConfig;

pub use inspect::Inspect;
pub use replay::Replay;

/// On-disk encoding of saved machine records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum RecordFormat {
    #[default]
    Json,
    Bincode,
}

impl RecordFormat {
    pub fn encode(self, record: &MachineRecord) -> Result<Vec<u8>> {
        Ok(match self {
            Self::Json => record.to_json()?.into_bytes(),
            Self::Bincode => record.to_bincode()?,
        })
    }

    pub fn decode(self, bytes: &[u8]) -> Result<MachineRecord> {
        Ok(match self {
            Self::Json => {
                let json = std::str::from_utf8(bytes).context("JSON record is not UTF-8")?;
                MachineRecord::from_json(json)?
            }
            Self::Bincode => MachineRecord::from_bincode(bytes)?,
        })
    }
}

/// Catalogs and configuration loaded once and shared by every machine built.
pub struct Content {
    factory: ContentFactory,
    config: StorageConfig,
    pub items: Arc<Catalog<ItemHandle>>,
    pub fluids: Arc<Catalog<FluidHandle>>,
}

impl Content {
    pub fn load(dir: &Path) -> Result<Self> {
        let factory = ContentFactory::new(dir);
        let config = factory.load_config()?;
        let items = Arc::new(factory.load_items()?);
        let fluids = Arc::new(factory.load_fluids()?);
        tracing::debug!(
            dir = %dir.display(),
            items = items.len(),
            fluids = fluids.len(),
            "loaded content"
        );

        Ok(Self {
            factory,
            config,
            items,
            fluids,
        })
    }

    /// Builds a fresh machine from `machines/{name}.ron`.
    pub fn build(&self, name: &str) -> Result<MachineStorage> {
        let spec = self
            .factory
            .load_machine_spec(name, &self.items, &self.fluids, &self.config)?;
        let machine =
            MachineStorage::new(spec, self.items.clone(), self.fluids.clone(), &self.config)
                .with_context(|| format!("Failed to build machine '{}'", name))?;
        Ok(machine)
    }
}

fn content_dir(explicit: Option<PathBuf>, config: &CliConfig) -> PathBuf {
    explicit.unwrap_or_else(|| config.content_dir.clone())
}

fn resolve<R: Resource>(catalog: &Catalog<R>, identifier: &str) -> Result<R> {
    catalog
        .handle(identifier)
        .with_context(|| format!("Unknown {} '{}'", R::KIND, identifier))
}
