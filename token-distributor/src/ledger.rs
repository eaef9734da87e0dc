use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{error, info};

use crate::types::DispatchResult;

pub const HEADER: &str = "Address,Value,Nonce,TxHash";

/// `<receivers>_result_<YYYY_MM_DD_HH_mm_ss>.csv`
pub fn ledger_path(receivers: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y_%m_%d_%H_%M_%S");
    let mut name = receivers.as_os_str().to_owned();
    name.push(format!("_result_{stamp}.csv"));
    PathBuf::from(name)
}

pub fn render(results: &[DispatchResult]) -> String {
    let mut out = format!("{HEADER}\n");
    for result in results.iter().filter(|r| r.success) {
        let _ = writeln!(
            out,
            "{},{},{},{}",
            result.address,
            result.amount,
            result.nonce,
            result.reference.as_deref().unwrap_or_default()
        );
    }
    out
}

/// Writes the ledger. Failures are logged, never returned.
pub fn persist(results: &[DispatchResult], path: &Path) -> bool {
    match std::fs::write(path, render(results)) {
        Ok(()) => {
            info!("result written to {}", path.display());
            true
        }
        Err(e) => {
            error!("failed to write file {}, {}", path.display(), e);
            false
        }
    }
}
