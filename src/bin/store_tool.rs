use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use gallerystore::store::maintenance;
use gallerystore::{
    MigrationCoordinator, SchemaModel, SchemaVersion, StoreImage, VersionCatalog, WalManager,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "store-tool")]
#[command(about = "Developer tooling for gallerystore store files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report a store's schema version and pending WAL state
    Status {
        store: PathBuf,
    },
    /// Fold pending WAL entries into the store image
    Checkpoint {
        store: PathBuf,
    },
    /// Migrate a store up to a target schema version (latest by default)
    Migrate {
        store: PathBuf,
        #[arg(long)]
        to: Option<SchemaVersion>,
    },
    /// Create an empty store at a given schema version
    Seed {
        store: PathBuf,
        #[arg(long)]
        version: Option<SchemaVersion>,
    },
    /// Destroy a store and its side files. Irreversible; requires --yes
    Drop {
        store: PathBuf,
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Status { store } => status(&store),
        Command::Checkpoint { store } => {
            maintenance::force_checkpoint(&store)
                .with_context(|| format!("checkpoint failed for {}", store.display()))?;
            println!("Checkpointed {}", store.display());
            Ok(())
        }
        Command::Migrate { store, to } => {
            let target = match to {
                Some(version) => version,
                None => VersionCatalog::current()?,
            };
            let coordinator = MigrationCoordinator::new();
            if !coordinator.requires_migration(&store, target)? {
                println!("{} is already at {}", store.display(), target);
                return Ok(());
            }
            coordinator
                .migrate_store(&store, target)
                .with_context(|| format!("migration failed for {}", store.display()))?;
            println!("Migrated {} to {}", store.display(), target);
            Ok(())
        }
        Command::Seed { store, version } => {
            let version = match version {
                Some(version) => version,
                None => VersionCatalog::current()?,
            };
            if store.exists() {
                return Err(anyhow!("{} already exists", store.display()));
            }
            let model = SchemaModel::for_version(version);
            StoreImage::empty(&model).save(&store)?;
            println!("Created empty {} store at {}", version, store.display());
            Ok(())
        }
        Command::Drop { store, yes } => {
            if !yes {
                return Err(anyhow!(
                    "dropping {} deletes all cached records; pass --yes to confirm",
                    store.display()
                ));
            }
            maintenance::destroy_store(&store)?;
            println!("Dropped {}", store.display());
            Ok(())
        }
    }
}

fn status(store: &Path) -> Result<()> {
    let Some(meta) = maintenance::metadata(store) else {
        println!("{}: no readable store", store.display());
        return Ok(());
    };
    match SchemaModel::resolve_version(&meta.schema_signature) {
        Some(version) => {
            let latest = VersionCatalog::current()?;
            println!("{}: schema {}", store.display(), version);
            if version != latest {
                println!("  migration needed (latest is {})", latest);
            }
        }
        None => println!(
            "{}: schema fingerprint matches no known model",
            store.display()
        ),
    }
    let wal = WalManager::open(store);
    if wal.has_pending_entries() {
        println!("  {} pending WAL entries", wal.read_all()?.len());
    }
    Ok(())
}
