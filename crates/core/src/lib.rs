pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::AppConfig;
pub use error::{UpkeepError, UpkeepResult};
pub use store::ClientStore;
