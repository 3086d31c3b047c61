//! Application state: the pool manager and the collaborators wired into it.
//!
//! Backends are chosen from the environment:
//!   - ENGINE_BASE_URL set  -> remote generator/solver, else the built-in seed bank
//!   - BLOB_DIR set         -> images on disk served under /images, else in memory
//!   - PUBLIC_BASE_URL      -> prefix for image URLs (default "/images")
//!
//! No renderer is wired here, so replenish stores records without images and the
//! blob store only sees deletes of image URLs already on records. A deployment that
//! renders boards attaches one with `PoolManager::with_renderer`; only then does
//! BLOB_DIR receive files for `/images` to serve.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::blob::{BlobStore, FsBlobStore, MemoryBlobStore};
use crate::codec::TextRecordEncoder;
use crate::config::{load_config_from_env, PoolConfig};
use crate::engine::{Generator, Solver};
use crate::pool::PoolManager;
use crate::remote::RemoteEngine;
use crate::seeds::SeedBank;
use crate::store::{MemoryStore, RecordStore};

#[derive(Clone)]
pub struct AppState {
    pub pool: PoolManager,
    /// Directory served under `/images` when blobs live on disk.
    pub blob_dir: Option<PathBuf>,
}

impl AppState {
    /// Build state from env: load config, pick engine and blob backends.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let config = load_config_from_env();
        info!(
            target: "tsume_pool",
            stock_level = config.stock_level,
            eviction_fraction = config.eviction_fraction,
            candidate_window = config.candidate_window,
            retention_days = config.retention_days,
            classes = ?config.classes,
            "Pool configuration"
        );

        let (generator, solver): (Arc<dyn Generator>, Arc<dyn Solver>) = match RemoteEngine::from_env() {
            Some(engine) => {
                info!(target: "tsume_pool", base_url = %engine.base_url, "Remote engine enabled.");
                let engine = Arc::new(engine);
                (engine.clone(), engine)
            }
            None => {
                info!(target: "tsume_pool", "ENGINE_BASE_URL not set. Using built-in seed bank.");
                (Arc::new(SeedBank), Arc::new(SeedBank))
            }
        };

        let public_base = std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "/images".into());
        let (blobs, blob_dir): (Arc<dyn BlobStore>, Option<PathBuf>) = match std::env::var("BLOB_DIR") {
            Ok(dir) => {
                info!(target: "tsume_pool", %dir, %public_base, "Images stored on disk.");
                let fs = FsBlobStore::new(&dir, public_base);
                let root = fs.root().clone();
                (Arc::new(fs), Some(root))
            }
            Err(_) => {
                info!(target: "tsume_pool", "BLOB_DIR not set. Images kept in memory.");
                (Arc::new(MemoryBlobStore::new(public_base)), None)
            }
        };

        Self::new(Arc::new(MemoryStore::new()), blobs, generator, solver, config, blob_dir)
    }

    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        generator: Arc<dyn Generator>,
        solver: Arc<dyn Solver>,
        config: PoolConfig,
        blob_dir: Option<PathBuf>,
    ) -> Self {
        let pool = PoolManager::new(store, blobs, generator, solver, Arc::new(TextRecordEncoder), config);
        Self { pool, blob_dir }
    }

    pub fn config(&self) -> &PoolConfig {
        self.pool.config()
    }
}
