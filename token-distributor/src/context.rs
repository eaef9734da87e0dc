use std::time::Duration;

use ethers::signers::{LocalWallet, Signer};
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::ConfigError;
use crate::transaction::TxParams;
use crate::types::{Mode, PayoutKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
}

/// Everything a run needs, fixed at startup and shared by reference.
#[derive(Debug)]
pub struct RunContext {
    pub mode: Mode,
    pub params: TxParams,
    pub wallet: LocalWallet,
    pub explorer_prefix: String,
    pub retry: RetryPolicy,
    /// Pause between two dispatched rows.
    pub pacing: Duration,
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn new(
        config: &Config,
        kind: PayoutKind,
        mode: Mode,
        cancel: CancellationToken,
    ) -> Result<Self, ConfigError> {
        let wallet = config
            .privatekey
            .expose_secret()
            .parse::<LocalWallet>()
            .map_err(ConfigError::Key)?
            .with_chain_id(config.chainid);

        Ok(Self {
            mode,
            params: TxParams::from_config(config, kind)?,
            wallet,
            explorer_prefix: config.explorerprefix.clone(),
            retry: RetryPolicy::new(config.retrytimes, config.retry_delay()),
            pacing: config.pacing(),
            cancel,
        })
    }

    pub fn kind(&self) -> PayoutKind {
        self.params.kind()
    }
}
