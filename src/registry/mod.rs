//! Backend registry: claim keys, submitted wallets and backend mints.
//!
//! # Data Flow
//! ```text
//! Workflows
//!     → client.rs (RegistryApi over HTTP)
//!     → server.rs (reference service, axum)
//!     → store.rs (keys and rows, DashMap + JSON snapshot)
//! ```

pub mod auth;
pub mod client;
pub mod server;
pub mod store;
pub mod types;

pub use client::{RegistryApi, RegistryClient, RegistryError, RegistryResult};
pub use server::RegistryServer;
pub use store::{ClaimKey, RegistryStore, StoreError};
pub use types::{EventId, KeyValidation, MintStatus, SubmittedAddress};
