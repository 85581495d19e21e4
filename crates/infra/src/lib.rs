//! Infrastructure layer: the in-memory account directory, permission grant
//! lifecycle, guarded admin operations and configuration.

pub mod admin;
pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod store;

pub use admin::AdminService;
pub use config::{ConfigError, DirectoryConfig};
pub use directory::{AccountDirectory, AccountUpdate, LocationFilter};
pub use error::{AuthenticationError, DirectoryError, DirectoryResult};
pub use events::{DirectoryEnvelope, DirectoryEvent};
pub use store::{DirectoryState, DirectoryStore};
