use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static ADDRESS_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^0x[0-9a-f]{40}$").ok());
static TX_HASH_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^0x[0-9a-f]{64}$").ok());

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid transaction hash format: {0}")]
    InvalidTransactionHash(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// `0x` followed by 40 lowercase hex digits
pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_RE.as_ref().is_some_and(|re| re.is_match(address))
}

/// `0x` followed by 64 lowercase hex digits
pub fn is_valid_transaction_hash(hash: &str) -> bool {
    TX_HASH_RE.as_ref().is_some_and(|re| re.is_match(hash))
}

pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    if address.trim().is_empty() {
        return Err(ValidationError::MissingParameter("address".to_string()));
    }
    if !is_valid_address(address) {
        return Err(ValidationError::InvalidAddress(address.to_string()));
    }
    Ok(())
}

pub fn validate_transaction_hash(hash: &str) -> Result<(), ValidationError> {
    if hash.trim().is_empty() {
        return Err(ValidationError::MissingParameter("hash".to_string()));
    }
    if !is_valid_transaction_hash(hash) {
        return Err(ValidationError::InvalidTransactionHash(hash.to_string()));
    }
    Ok(())
}

pub fn validate_limit(limit: usize, max: usize) -> Result<usize, ValidationError> {
    if limit == 0 || limit > max {
        return Err(ValidationError::InvalidParameter(format!(
            "limit must be between 1 and {}",
            max
        )));
    }
    Ok(limit)
}
