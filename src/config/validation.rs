//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check URLs and addresses parse
//! - Validate value ranges (timeouts > 0, expiry bounds)
//! - Check the mint signer has what it needs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DashboardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;
use std::fmt;

use crate::config::schema::{DashboardConfig, MintSigner};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &DashboardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "backend.base_url", &config.backend.base_url);
    if config.backend.timeout_secs == 0 {
        errors.push(ValidationError::new("backend.timeout_secs", "must be greater than 0"));
    }

    check_url(&mut errors, "chain.rpc_url", &config.chain.rpc_url);
    for (i, url) in config.chain.failover_urls.iter().enumerate() {
        check_url(&mut errors, &format!("chain.failover_urls[{}]", i), url);
    }
    if config.chain.contract_address.parse::<Address>().is_err() {
        errors.push(ValidationError::new(
            "chain.contract_address",
            format!("'{}' is not a valid address", config.chain.contract_address),
        ));
    }
    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be greater than 0"));
    }
    if config.chain.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "chain.confirmation_timeout_secs",
            "must be greater than 0",
        ));
    }

    check_url(&mut errors, "wallet.rpc_url", &config.wallet.rpc_url);

    if config.mint.signer == MintSigner::AdminWallet && config.mint.badge.is_none() {
        errors.push(ValidationError::new(
            "mint.badge",
            "required when mint.signer = \"admin_wallet\"",
        ));
    }
    if config.mint.default_expiry_minutes == 0 {
        errors.push(ValidationError::new("mint.default_expiry_minutes", "must be greater than 0"));
    }

    check_url(&mut errors, "registry.claim_base_url", &config.registry.claim_base_url);
    if config.registry.max_expiry_minutes == 0 {
        errors.push(ValidationError::new("registry.max_expiry_minutes", "must be greater than 0"));
    }
    if config.mint.default_expiry_minutes > config.registry.max_expiry_minutes {
        errors.push(ValidationError::new(
            "mint.default_expiry_minutes",
            "exceeds registry.max_expiry_minutes",
        ));
    }
    if config.registry.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "registry.request_timeout_secs",
            "must be greater than 0",
        ));
    }

    check_url(&mut errors, "ipfs.gateway_url", &config.ipfs.gateway_url);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if let Err(e) = value.parse::<url::Url>() {
        errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&DashboardConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = DashboardConfig::default();
        config.backend.base_url = "not a url".to_string();
        config.chain.contract_address = "0x123".to_string();
        config.chain.rpc_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["backend.base_url", "chain.contract_address", "chain.rpc_timeout_secs"]
        );
    }

    #[test]
    fn test_admin_wallet_needs_badge() {
        let mut config = DashboardConfig::default();
        config.mint.signer = MintSigner::AdminWallet;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "mint.badge");
    }
}
