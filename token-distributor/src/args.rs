use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use crate::types::{Mode, PayoutKind};

const EXAMPLES: &str = "\
Command examples:

    distribute NATIVE token: token-distributor --native
    distribute NATIVE token: token-distributor --native --send

    distribute ERC20 token:  token-distributor --erc20
    distribute ERC20 token:  token-distributor --erc20 --send

Default is test mode, which means Tx not send to network. If everything ready, \
you can add parameter --send, to send Tx to network.";

#[derive(Parser, Debug)]
#[command(version = "0.1.0")]
#[command(about = "Sequential native / ERC-20 payout utility")]
#[command(
    long_about = "Reads payout rows (address, amount, nonce) from a CSV file, signs one \
    transaction per row and optionally broadcasts them one at a time."
)]
#[command(after_help = EXAMPLES)]
#[command(group(ArgGroup::new("kind").required(true).args(["native", "erc20"])))]
pub struct Args {
    /// Distribute the chain's native asset
    #[clap(long)]
    pub native: bool,

    /// Distribute the configured ERC-20 token
    #[clap(long)]
    pub erc20: bool,

    /// Broadcast transactions instead of only signing them
    #[clap(long)]
    pub send: bool,

    /// Path to the YAML (or JSON) configuration file
    #[clap(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Path to the payout CSV (Address,Value,Nonce)
    #[clap(short, long, default_value = "receivers.csv")]
    pub receivers: PathBuf,
}

impl Args {
    pub fn kind(&self) -> PayoutKind {
        if self.erc20 {
            PayoutKind::Erc20
        } else {
            PayoutKind::Native
        }
    }

    pub fn mode(&self) -> Mode {
        if self.send { Mode::Live } else { Mode::DryRun }
    }
}
