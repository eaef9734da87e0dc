use std::time::Duration;

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError};
use ethers::signers::{LocalWallet, Signer, WalletError};
use ethers::types::{Bytes, TxHash, transaction::eip2718::TypedTransaction};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::context::{RetryPolicy, RunContext};
use crate::error::{ConfigError, DispatchError};
use crate::types::Mode;

/// Sends raw signed transactions to the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, raw: Bytes) -> Result<TxHash, ProviderError>;
}

#[async_trait]
impl Broadcaster for Provider<Http> {
    async fn broadcast(&self, raw: Bytes) -> Result<TxHash, ProviderError> {
        let pending = self.send_raw_transaction(raw).await?;
        Ok(pending.tx_hash())
    }
}

/// JSON-RPC provider whose requests give up after `timeout`.
pub fn http_provider(rpc: &str, timeout: Duration) -> Result<Provider<Http>, ConfigError> {
    let url = Url::parse(rpc).map_err(|_| ConfigError::Field {
        field: "rpc",
        value: rpc.to_string(),
    })?;
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigError::Field {
            field: "rpc",
            value: e.to_string(),
        })?;
    Ok(Provider::new(Http::new_with_client(url, client)))
}

#[derive(Debug, Clone)]
pub struct SignedTx {
    pub raw: Bytes,
    pub hash: TxHash,
}

pub fn sign(tx: &TypedTransaction, wallet: &LocalWallet) -> Result<SignedTx, WalletError> {
    let mut tx = tx.clone();
    tx.set_from(wallet.address());

    let signature = wallet.sign_transaction_sync(&tx)?;
    let signed = SignedTx {
        raw: tx.rlp_signed(&signature),
        hash: tx.hash(&signature),
    };

    info!(
        "parsed signed tx is: {} signature: {}",
        serde_json::to_string(&tx).unwrap_or_default(),
        signature
    );
    info!("signed tx: 0x{}", hex::encode(&signed.raw));
    Ok(signed)
}

/// Signs `tx` and, in live mode, broadcasts it. Returns the explorer link.
pub async fn dispatch<B>(
    tx: &TypedTransaction,
    ctx: &RunContext,
    broadcaster: &B,
) -> Result<String, DispatchError>
where
    B: Broadcaster + ?Sized,
{
    let signed = sign(tx, &ctx.wallet)?;
    let reference = format!("{}{:?}", ctx.explorer_prefix, signed.hash);
    info!("tx_hash: {}", reference);

    if ctx.mode == Mode::DryRun {
        return Ok(reference);
    }

    submit(signed.raw, &ctx.retry, &ctx.cancel, broadcaster).await?;
    Ok(reference)
}

/// Broadcasts `raw` until the node accepts it or the policy runs out.
pub async fn submit<B>(
    raw: Bytes,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    broadcaster: &B,
) -> Result<TxHash, DispatchError>
where
    B: Broadcaster + ?Sized,
{
    let mut attempt = 1;
    loop {
        match broadcaster.broadcast(raw.clone()).await {
            Ok(hash) => {
                info!("broadcast acknowledged on attempt {}: {:?}", attempt, hash);
                return Ok(hash);
            }
            Err(e) => {
                warn!("the {}-th try failed with error: {}", attempt, e);
                if attempt >= policy.attempts {
                    return Err(DispatchError::Submission {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
            _ = sleep(policy.delay) => {}
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, tests::SAMPLE};
    use crate::transaction::build;
    use crate::types::{PayoutKind, PayoutRow};
    use ethers::types::H256;
    use ethers::utils::keccak256;

    fn context(mode: Mode) -> RunContext {
        let config = Config::parse(SAMPLE, PayoutKind::Native).unwrap();
        RunContext::new(&config, PayoutKind::Native, mode, CancellationToken::new()).unwrap()
    }

    fn tx(ctx: &RunContext) -> TypedTransaction {
        let row = PayoutRow {
            address: "0x1e58cd7ef5249689bfB37A82EE08345794F005cF".to_string(),
            amount: "0.42".to_string(),
            nonce: 98,
        };
        build(&row, &ctx.params).unwrap()
    }

    fn failure() -> ProviderError {
        ProviderError::CustomError("connection refused".to_string())
    }

    #[test]
    fn hash_covers_signed_encoding() {
        let ctx = context(Mode::DryRun);
        let signed = sign(&tx(&ctx), &ctx.wallet).unwrap();
        assert_eq!(signed.hash, H256::from(keccak256(&signed.raw)));
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn signed_tx_is_logged_at_info() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let ctx = context(Mode::DryRun);
        let signed = tracing::subscriber::with_default(subscriber, || {
            sign(&tx(&ctx), &ctx.wallet).unwrap()
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("parsed signed tx is:"));
        assert!(output.contains(&hex::encode(&signed.raw)));
    }

    #[tokio::test(start_paused = true)]
    async fn dry_run_never_broadcasts() {
        let ctx = context(Mode::DryRun);
        let mut broadcaster = MockBroadcaster::new();
        broadcaster.expect_broadcast().times(0);

        let reference = dispatch(&tx(&ctx), &ctx, &broadcaster).await.unwrap();
        assert!(reference.starts_with("https://bscscan.com/tx/0x"));
        assert_eq!(reference.len(), "https://bscscan.com/tx/".len() + 66);
    }

    #[tokio::test(start_paused = true)]
    async fn dry_run_and_live_share_reference() {
        let dry = context(Mode::DryRun);
        let live = context(Mode::Live);
        let mut broadcaster = MockBroadcaster::new();
        broadcaster
            .expect_broadcast()
            .times(1)
            .returning(|_| Ok(H256::zero()));

        let preview = dispatch(&tx(&dry), &dry, &broadcaster).await.unwrap();
        let sent = dispatch(&tx(&live), &live, &broadcaster).await.unwrap();
        assert_eq!(preview, sent);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_accepted() {
        let ctx = context(Mode::Live);
        let mut calls = 0;
        let mut broadcaster = MockBroadcaster::new();
        broadcaster.expect_broadcast().times(3).returning(move |_| {
            calls += 1;
            if calls < 3 {
                Err(failure())
            } else {
                Ok(H256::zero())
            }
        });

        assert!(dispatch(&tx(&ctx), &ctx, &broadcaster).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_policy_attempts() {
        let ctx = context(Mode::Live);
        let mut broadcaster = MockBroadcaster::new();
        broadcaster
            .expect_broadcast()
            .times(6)
            .returning(|_| Err(failure()));

        let start = tokio::time::Instant::now();
        let err = dispatch(&tx(&ctx), &ctx, &broadcaster).await.unwrap_err();
        assert!(matches!(err, DispatchError::Submission { attempts: 6, .. }));
        // no pause after the last attempt
        assert!(start.elapsed() >= ctx.retry.delay * 5);
        assert!(start.elapsed() < ctx.retry.delay * 6);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_retrying() {
        let ctx = context(Mode::Live);
        ctx.cancel.cancel();
        let mut broadcaster = MockBroadcaster::new();
        broadcaster
            .expect_broadcast()
            .times(1)
            .returning(|_| Err(failure()));

        let err = dispatch(&tx(&ctx), &ctx, &broadcaster).await.unwrap_err();
        assert!(matches!(err, DispatchError::Cancelled));
    }
}
