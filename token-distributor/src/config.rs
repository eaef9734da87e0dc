use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use serde_yaml::Value;
use tracing::error;

use crate::error::ConfigError;
use crate::schema::{self, Entry, Rule, Schema};
use crate::types::PayoutKind;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub privatekey: SecretString,
    pub chainid: u64,
    pub rpc: String,
    pub gasprice: u64,
    pub explorerprefix: String,
    pub native: Option<NativeConfig>,
    pub erc20: Option<Erc20Config>,
    #[serde(default = "default_retry_times")]
    pub retrytimes: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retrydelayms: u64,
    #[serde(default = "default_sleep_ms")]
    pub sleepms: u64,
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpctimeoutsecs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NativeConfig {
    pub gaslimit: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Erc20Config {
    pub gaslimit: u64,
    pub erc20contractaddress: String,
    pub decimals: u32,
}

fn default_retry_times() -> u32 {
    6
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_sleep_ms() -> u64 {
    3000
}

fn default_rpc_timeout_secs() -> u64 {
    30
}

/// Required shape of the config document.
pub fn config_schema() -> Schema {
    Schema::Record(vec![
        Entry::Field(
            "privatekey",
            Schema::Leaf(Rule::string().length(66).prefix("0x")),
        ),
        Entry::Field("chainid", Schema::Leaf(Rule::number())),
        Entry::Field("rpc", Schema::Leaf(Rule::string().prefix("http"))),
        Entry::Field("gasprice", Schema::Leaf(Rule::number())),
        Entry::Field(
            "explorerprefix",
            Schema::Leaf(Rule::string().prefix("http")),
        ),
        Entry::Choice(vec![
            (
                PayoutKind::Native.key(),
                Schema::Record(vec![Entry::Field(
                    "gaslimit",
                    Schema::Leaf(Rule::number()),
                )]),
            ),
            (
                PayoutKind::Erc20.key(),
                Schema::Record(vec![
                    Entry::Field("gaslimit", Schema::Leaf(Rule::number())),
                    Entry::Field(
                        "erc20contractaddress",
                        Schema::Leaf(Rule::string().length(42).prefix("0x")),
                    ),
                    Entry::Field("decimals", Schema::Leaf(Rule::number())),
                ]),
            ),
        ]),
    ])
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P, kind: PayoutKind) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, kind)
    }

    /// Parses and validates a YAML (or JSON) document for `kind`.
    ///
    /// The section of the other payout kind is dropped unread.
    pub fn parse(contents: &str, kind: PayoutKind) -> Result<Self, ConfigError> {
        let mut value: Value = serde_yaml::from_str(contents)?;
        if let Err(violation) = schema::check(&value, &config_schema(), kind.key()) {
            error!("ERROR, invalid config parameters, {}", violation);
            return Err(violation.into());
        }
        if let Value::Mapping(map) = &mut value {
            map.remove(kind.other().key());
        }
        Ok(serde_yaml::from_value(value)?)
    }

    /// Gas limit of the active kind's section.
    pub fn gas_limit(&self, kind: PayoutKind) -> Option<u64> {
        match kind {
            PayoutKind::Native => self.native.as_ref().map(|n| n.gaslimit),
            PayoutKind::Erc20 => self.erc20.as_ref().map(|e| e.gaslimit),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retrydelayms)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.sleepms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpctimeoutsecs)
    }
}
