//! Scenario replay with a mirrored receiver.

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use storage_core::{
    Catalog, MachineStorage, Resource, ResourceSelector, ResourceStorage, SyncBatch, Transaction,
};

use super::{Content, RecordFormat, content_dir, resolve};
use crate::config::CliConfig;
use crate::scenario::{Scenario, Step, Target};

/// Run a scenario file against a machine and keep a mirror in sync
#[derive(Parser)]
pub struct Replay {
    /// Scenario file (RON)
    scenario: PathBuf,

    /// Content directory (defaults to STORAGE_CONTENT_DIR)
    #[arg(long)]
    content_dir: Option<PathBuf>,

    /// Print every sync payload as hex
    #[arg(long)]
    hex: bool,

    /// Save the final machine record to this path
    #[arg(long)]
    save: Option<PathBuf>,

    /// Encoding of the saved record
    #[arg(long, value_enum, default_value = "json")]
    format: RecordFormat,
}

impl Replay {
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        let scenario = Scenario::load(&self.scenario)?;
        let content = Content::load(&content_dir(self.content_dir, config))?;

        let mut session = Session::new(content, &scenario.machine, self.hex || config.print_hex)?;
        for step in &scenario.steps {
            session.run(step, None)?;
        }
        session.sync()?;
        session.verify_records()?;

        let stats = &session.stats;
        println!("Scenario: {}", self.scenario.display());
        println!("  machine:         {}", scenario.machine);
        println!("  steps:           {}", stats.steps);
        println!("  aborted scopes:  {}", stats.aborted_scopes);
        println!("  syncs:           {}", stats.syncs);
        println!("  payload bytes:   {}", stats.bytes);
        println!("  notifications:   {}", session.notifications.get());
        println!(
            "  energy:          {}/{}",
            session.machine.energy().amount(),
            session.machine.energy().capacity()
        );
        println!("  mirror:          in sync");

        if let Some(path) = self.save {
            let bytes = self.format.encode(&session.machine.to_record()?)?;
            std::fs::write(&path, bytes)
                .with_context(|| format!("Failed to write record {}", path.display()))?;
            println!("Saved record to {}", path.display());
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
struct Stats {
    steps: usize,
    aborted_scopes: usize,
    syncs: usize,
    bytes: usize,
}

/// A machine, its mirror, and the batches connecting them.
struct Session {
    content: Content,
    machine: MachineStorage,
    mirror: MachineStorage,
    outgoing: SyncBatch,
    incoming: SyncBatch,
    print_hex: bool,
    notifications: Rc<Cell<u64>>,
    stats: Stats,
}

impl Session {
    fn new(content: Content, name: &str, print_hex: bool) -> Result<Self> {
        let machine = content.build(name)?;
        let mirror = content.build(name)?;

        let notifications = Rc::new(Cell::new(0));
        let counter = Rc::clone(&notifications);
        machine.set_listener(move || counter.set(counter.get() + 1));

        let outgoing = machine.sync_batch();
        let incoming = mirror.sync_batch();
        Ok(Self {
            content,
            machine,
            mirror,
            outgoing,
            incoming,
            print_hex,
            notifications,
            stats: Stats::default(),
        })
    }

    fn run(&mut self, step: &Step, tx: Option<&mut Transaction<'_>>) -> Result<()> {
        self.stats.steps += 1;

        if let Some(target) = step.target() {
            let amount = match target {
                Target::Items => {
                    Side::new(self.machine.items(), &*self.content.items).apply(step, tx)?
                }
                Target::Fluids => {
                    Side::new(self.machine.fluids(), &*self.content.fluids).apply(step, tx)?
                }
            };
            tracing::debug!(?target, amount, "applied step");
            return Ok(());
        }

        match step {
            Step::InsertEnergy(amount) => {
                let inserted = self.machine.energy().insert_tx(*amount, tx);
                tracing::debug!(inserted, "inserted energy");
            }
            Step::ExtractEnergy(amount) => {
                let extracted = self.machine.energy().extract_tx(*amount, tx);
                tracing::debug!(extracted, "extracted energy");
            }
            Step::Scope { commit, steps } => {
                let mut scope = Transaction::open_within(tx);
                for child in steps {
                    self.run(child, Some(&mut scope))?;
                }
                if *commit {
                    scope.commit();
                } else {
                    self.stats.aborted_scopes += 1;
                    scope.abort();
                }
            }
            Step::Sync => {
                if tx.is_some() {
                    bail!("Sync cannot run inside a transaction scope");
                }
                self.sync()?;
            }
            other => bail!("Step {:?} is missing its storage target", other),
        }

        Ok(())
    }

    /// Sends pending changes to the mirror and checks both sides agree.
    fn sync(&mut self) -> Result<()> {
        let Some(payload) = self.outgoing.encode()? else {
            tracing::debug!("nothing to sync");
            return Ok(());
        };
        self.stats.syncs += 1;
        self.stats.bytes += payload.len();
        if self.print_hex {
            println!(
                "sync #{} ({} bytes): {}",
                self.stats.syncs,
                payload.len(),
                hex::encode(&payload)
            );
        }

        self.incoming
            .decode(&payload)
            .context("Mirror rejected sync payload")?;
        self.verify_digests()
            .with_context(|| format!("Mirror diverged after sync #{}", self.stats.syncs))
    }

    fn verify_digests(&self) -> Result<()> {
        if self.machine.items().digest()? != self.mirror.items().digest()? {
            bail!("item storages differ");
        }
        if self.machine.fluids().digest()? != self.mirror.fluids().digest()? {
            bail!("fluid storages differ");
        }
        if self.machine.energy().amount() != self.mirror.energy().amount() {
            bail!(
                "energy differs: {} vs {}",
                self.machine.energy().amount(),
                self.mirror.energy().amount()
            );
        }
        Ok(())
    }

    fn verify_records(&self) -> Result<()> {
        if self.machine.to_record()? != self.mirror.to_record()? {
            bail!("Mirror record differs from machine record");
        }
        Ok(())
    }
}

/// One resource storage of the machine with the catalog naming its resources.
struct Side<'a, R: Resource> {
    storage: &'a ResourceStorage<R>,
    catalog: &'a Catalog<R>,
}

impl<'a, R: Resource> Side<'a, R> {
    fn new(storage: &'a ResourceStorage<R>, catalog: &'a Catalog<R>) -> Self {
        Self { storage, catalog }
    }

    /// Returns the amount the step inserted, extracted or moved.
    fn apply(&self, step: &Step, tx: Option<&mut Transaction<'_>>) -> Result<u64> {
        Ok(match step {
            Step::Insert {
                resource,
                amount,
                overlay,
                matching,
                ..
            } => {
                let resource = resolve(self.catalog, resource)?;
                if *matching {
                    self.storage.insert_matching(resource, overlay, *amount, tx)
                } else {
                    self.storage.insert_tx(resource, overlay, *amount, tx)
                }
            }
            Step::Extract {
                resource, amount, ..
            } => match resource {
                Some(identifier) => {
                    let resource = resolve(self.catalog, identifier)?;
                    self.storage
                        .extract_tx(ResourceSelector::of(resource), *amount, tx)
                }
                None => self.storage.extract_tx(ResourceSelector::any(), *amount, tx),
            },
            Step::Consume { slot, amount } => {
                self.check_indices(std::slice::from_ref(slot))?;
                self.storage
                    .slot(*slot)
                    .consume(ResourceSelector::any(), *amount, tx)
            }
            Step::Move {
                from,
                to,
                resource,
                overlay,
                amount,
                ..
            } => {
                self.check_indices(from)?;
                self.check_indices(to)?;
                let resource = resolve(self.catalog, resource)?;
                let source = self.storage.sub_storage_of(from);
                let destination = self.storage.sub_storage_of(to);
                source.move_to(&destination, resource, overlay, *amount, tx)
            }
            other => bail!("Step {:?} does not address a resource storage", other),
        })
    }

    fn check_indices(&self, indices: &[usize]) -> Result<()> {
        if let Some(index) = indices.iter().find(|&&index| index >= self.storage.size()) {
            bail!(
                "Slot {} is out of range for a {} storage of {} slots",
                index,
                R::KIND,
                self.storage.size()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use storage_core::Overlay;
    use tempfile::TempDir;

    use super::*;

    fn content() -> (TempDir, Content) {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("items.ron"),
            r#"(resources: [
                (identifier: "coal"),
                (identifier: "bucket_lava", remainder: Some("bucket")),
                (identifier: "bucket", max_amount: Some(16)),
            ])"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("fluids.ron"),
            r#"(resources: [(identifier: "lava")])"#,
        )
        .unwrap();
        fs::create_dir(dir.path().join("machines")).unwrap();
        fs::write(
            dir.path().join("machines").join("furnace.ron"),
            r#"(
                items: [(transfer: input, count: 2), (transfer: output)],
                fluids: [(transfer: input)],
                energy: Some((capacity: 1000, max_input: 100)),
            )"#,
        )
        .unwrap();
        let content = Content::load(dir.path()).unwrap();
        (dir, content)
    }

    fn session() -> (TempDir, Session) {
        let (dir, content) = content();
        let session = Session::new(content, "furnace", false).unwrap();
        (dir, session)
    }

    fn run_all(session: &mut Session, scenario: &str) {
        let scenario = Scenario::parse(scenario).unwrap();
        for step in &scenario.steps {
            session.run(step, None).unwrap();
        }
        session.sync().unwrap();
        session.verify_records().unwrap();
    }

    #[test]
    fn test_replay_keeps_mirror_in_sync() {
        let (_dir, mut session) = session();
        run_all(
            &mut session,
            r#"(
                machine: "furnace",
                steps: [
                    Insert(target: Items, resource: "coal", amount: 80),
                    Insert(target: Fluids, resource: "lava", amount: 1000),
                    InsertEnergy(250),
                    Sync,
                    Move(target: Items, from: [0], to: [2], resource: "coal", amount: 10),
                    ExtractEnergy(30),
                ],
            )"#,
        );

        assert_eq!(session.mirror.items().slot(0).amount(), 54);
        assert_eq!(session.mirror.items().slot(1).amount(), 16);
        assert_eq!(session.mirror.items().slot(2).amount(), 10);
        assert_eq!(session.mirror.fluids().slot(0).amount(), 1000);
        assert_eq!(session.mirror.energy().amount(), 220);
        assert_eq!(session.stats.syncs, 2);
    }

    #[test]
    fn test_aborted_scope_leaves_nothing_to_sync() {
        let (_dir, mut session) = session();
        run_all(
            &mut session,
            r#"(
                machine: "furnace",
                steps: [
                    Scope(commit: false, steps: [
                        Insert(target: Items, resource: "coal", amount: 5),
                        Scope(commit: true, steps: [InsertEnergy(40)]),
                    ]),
                ],
            )"#,
        );

        assert!(session.machine.items().is_empty());
        assert_eq!(session.machine.energy().amount(), 0);
        assert_eq!(session.stats.aborted_scopes, 1);
        // Only the initial full state went out.
        assert_eq!(session.stats.syncs, 1);
        assert_eq!(session.notifications.get(), 0);
        assert!(!session.outgoing.has_changes());
    }

    #[test]
    fn test_consume_leaves_remainder() {
        let (_dir, mut session) = session();
        run_all(
            &mut session,
            r#"(
                machine: "furnace",
                steps: [
                    Insert(target: Items, resource: "bucket_lava", amount: 1),
                    Consume(slot: 0, amount: 1),
                ],
            )"#,
        );

        let bucket = session.content.items.handle("bucket").unwrap();
        assert_eq!(session.mirror.items().slot(0).resource(), Some(bucket));
    }

    #[test]
    fn test_sync_inside_scope_is_rejected() {
        let (_dir, mut session) = session();
        let step = Step::Scope {
            commit: true,
            steps: vec![Step::InsertEnergy(10), Step::Sync],
        };
        assert!(session.run(&step, None).is_err());
        assert_eq!(session.machine.energy().amount(), 0);
    }

    #[test]
    fn test_unknown_resource_and_slot_are_reported() {
        let (_dir, mut session) = session();
        let unknown = Step::Insert {
            target: Target::Items,
            resource: "diamond".into(),
            amount: 1,
            overlay: Overlay::EMPTY,
            matching: false,
        };
        let error = session.run(&unknown, None).unwrap_err();
        assert!(error.to_string().contains("diamond"));

        let out_of_range = Step::Consume { slot: 7, amount: 1 };
        assert!(session.run(&out_of_range, None).is_err());
    }
}
