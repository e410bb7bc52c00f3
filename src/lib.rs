pub mod agent;
pub mod broadcast;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod data;
pub mod messaging;
pub mod sim;
pub mod site;
pub mod store;
pub mod util;

pub use agent::{AgentError, Document, PageAgent, PageContext};
pub use broadcast::BroadcastHub;
pub use config::Config;
pub use context::ExtensionContext;
pub use coordinator::{Browser, Coordinator, CoordinatorError};
pub use data::{Database, SqliteStorageArea};
pub use site::{classify_site, Site};
pub use store::{SettingsStore, StorageArea, StoreError};
