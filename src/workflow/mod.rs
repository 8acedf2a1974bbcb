//! The three dashboard workflows.
//!
//! # Data Flow
//! ```text
//! /claim  → claim.rs        (RegistryApi: validate key, submit wallet)
//! /admin  → admin.rs        (RegistryApi + MintExecutor, SubmissionStore)
//! /       → self_service.rs (WalletConnector + ContractGateway)
//! ```
//!
//! Every failure ends as a status line on the workflow; none escapes as a
//! panic and nothing is retried automatically.

pub mod admin;
pub mod claim;
pub mod minter;
pub mod self_service;
pub mod store;

pub use admin::AdminMintWorkflow;
pub use claim::{ClaimState, ClaimWorkflow};
pub use minter::{BackendMinter, MintExecutor, WalletMinter};
pub use self_service::{BadgeForm, MintedBadge, OwnedPoap, SelfServiceWorkflow};
pub use store::{RowView, SubmissionStore};
