use std::path::PathBuf;

use ethers::providers::ProviderError;
use ethers::signers::WalletError;
use thiserror::Error;

/// First schema rule a config document broke.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaViolation {
    #[error("key {key} not exists")]
    Missing { key: String },
    #[error("key {key} type not valid, should be {expected}")]
    WrongType { key: String, expected: &'static str },
    #[error("length of key {key} not valid, should be {expected}")]
    WrongLength { key: String, expected: usize },
    #[error("prefix of key {key} not valid, should be {expected}")]
    WrongPrefix { key: String, expected: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config parameters, {0}")]
    Schema(#[from] SchemaViolation),
    #[error("invalid signing key")]
    Key(#[source] WalletError),
    #[error("invalid {field}: {value}")]
    Field { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum BatchReadError {
    #[error("failed to read file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: expected at least {expected} non-empty fields")]
    MalformedRow { line: usize, expected: usize },
    #[error("line {line}: nonce {value:?} is not a non-negative integer")]
    InvalidNonce { line: usize, value: String },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid address {0}")]
    Address(String),
    #[error("invalid amount {0}")]
    Amount(String),
    #[error("amount {0} does not fit in a 32-byte word")]
    AmountOutOfRange(String),
    #[error("amount {amount} has more than {decimals} fractional digits")]
    TooManyDecimals { amount: String, decimals: u32 },
    #[error("amount {0} is negative")]
    NegativeAmount(String),
    #[error("decimals {0} out of range")]
    Decimals(u32),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("failed to sign transaction")]
    Signing(#[from] WalletError),
    #[error("submission failed after {attempts} attempts")]
    Submission {
        attempts: u32,
        #[source]
        source: ProviderError,
    },
    #[error("cancelled by operator")]
    Cancelled,
}
