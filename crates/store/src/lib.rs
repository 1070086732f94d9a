//! Document store backends for Upkeep: MongoDB for deployments, an
//! in-process store for tests and local runs.

#![cfg_attr(not(test), warn(clippy::unwrap_used))]

pub mod fault;
pub mod memory;
pub mod mongo;

pub use fault::{Fault, FaultyStore};
pub use memory::InMemoryStore;
pub use mongo::MongoStore;

use tracing::{info, warn};
use upkeep_core::config::{StoreBackend, StoreConfig};
use upkeep_core::{ClientStore, UpkeepResult};

/// Open the configured backend. `seed_demo` only applies to the in-memory store.
pub async fn open(config: &StoreConfig, seed_demo: bool) -> UpkeepResult<Box<dyn ClientStore>> {
    match config.backend {
        StoreBackend::Mongo => {
            if seed_demo {
                warn!("Demo seeding is only available for the memory backend; ignoring");
            }
            Ok(Box::new(MongoStore::connect(config).await?))
        }
        StoreBackend::Memory => {
            let store = InMemoryStore::new();
            if seed_demo {
                store.seed_demo_data();
            }
            info!("Using in-memory store");
            Ok(Box::new(store))
        }
    }
}
