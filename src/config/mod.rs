//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DashboardConfig (validated, immutable)
//!     → cloned into the workflows and the registry server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - One backend base URL for every workflow

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    BackendConfig, BadgeTemplate, ChainConfig, DashboardConfig, IpfsConfig, MintConfig,
    MintSigner, ObservabilityConfig, RegistryConfig, WalletConfig, WalletProviderKind,
};
