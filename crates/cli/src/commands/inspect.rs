//! Print the contents of a saved machine record.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use storage_core::{Resource, ResourceStorage};

use super::{Content, RecordFormat, content_dir};
use crate::config::CliConfig;

/// Load a saved record into a machine layout and print it
#[derive(Parser)]
pub struct Inspect {
    /// Saved machine record
    record: PathBuf,

    /// Machine layout the record was saved from
    #[arg(long)]
    machine: String,

    /// Content directory (defaults to STORAGE_CONTENT_DIR)
    #[arg(long)]
    content_dir: Option<PathBuf>,

    /// Encoding of the record file
    #[arg(long, value_enum, default_value = "json")]
    format: RecordFormat,
}

impl Inspect {
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        let bytes = std::fs::read(&self.record)
            .with_context(|| format!("Failed to read record {}", self.record.display()))?;
        let record = self.format.decode(&bytes)?;

        let content = Content::load(&content_dir(self.content_dir, config))?;
        let machine = content.build(&self.machine)?;
        machine
            .from_record(&record)
            .with_context(|| format!("Record does not fit machine '{}'", self.machine))?;

        println!("Machine: {} ({})", self.machine, self.record.display());
        print_storage(machine.items())?;
        print_storage(machine.fluids())?;
        println!(
            "  energy: {}/{}",
            machine.energy().amount(),
            machine.energy().capacity()
        );

        Ok(())
    }
}

fn print_storage<R: Resource>(storage: &ResourceStorage<R>) -> Result<()> {
    if storage.size() == 0 {
        return Ok(());
    }
    println!("  {} storage, digest {}", R::KIND, hex::encode(storage.digest()?));
    for (index, slot) in storage.iter().enumerate() {
        let record = slot.to_record()?;
        match record.resource {
            Some(resource) if record.overlay.is_empty() => {
                println!("    [{}] {} x{}", index, resource, record.amount)
            }
            Some(resource) => println!(
                "    [{}] {} x{} {:?}",
                index, resource, record.amount, record.overlay
            ),
            None => println!("    [{}] empty", index),
        }
    }
    Ok(())
}
