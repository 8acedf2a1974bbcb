//! POAP claim-and-mint dashboard library.

// Foundations
pub mod config;
pub mod error;
pub mod observability;

// Collaborators
pub mod blockchain;
pub mod metadata;
pub mod registry;

// Workflows and server runtime
pub mod lifecycle;
pub mod workflow;

pub use config::DashboardConfig;
pub use error::DashboardError;
pub use lifecycle::Shutdown;
pub use registry::RegistryServer;
