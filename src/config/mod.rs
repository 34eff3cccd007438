//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (process-wide defaults)
//!     → merge.rs (sparse JSON overrides layered on top)
//!     → shared via ArcSwap by the orchestrator
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads + validates
//!     → orchestrator swaps its defaults; in-flight calls keep the
//!       snapshot they started with
//! ```

pub mod loader;
pub mod merge;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use merge::deep_merge;
pub use schema::{BusinessCode, BusinessCodes, ClientConfig, LogFormat, ObservabilityConfig};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
