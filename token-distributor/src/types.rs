use std::fmt;

/// Asset being paid out. Chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutKind {
    Native,
    Erc20,
}

impl PayoutKind {
    pub fn other(&self) -> PayoutKind {
        match self {
            PayoutKind::Native => PayoutKind::Erc20,
            PayoutKind::Erc20 => PayoutKind::Native,
        }
    }

    /// Config section holding the settings for this kind.
    pub fn key(&self) -> &'static str {
        match self {
            PayoutKind::Native => "native",
            PayoutKind::Erc20 => "erc20",
        }
    }
}

impl fmt::Display for PayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Build and sign only, nothing leaves the process.
    DryRun,
    Live,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutRow {
    pub address: String,
    pub amount: String,
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub address: String,
    pub amount: String,
    pub nonce: u64,
    pub reference: Option<String>,
    pub success: bool,
}

impl DispatchResult {
    pub fn succeeded(row: &PayoutRow, reference: String) -> Self {
        Self {
            address: row.address.clone(),
            amount: row.amount.clone(),
            nonce: row.nonce,
            reference: Some(reference),
            success: true,
        }
    }

    pub fn failed(row: &PayoutRow) -> Self {
        Self {
            address: row.address.clone(),
            amount: row.amount.clone(),
            nonce: row.nonce,
            reference: None,
            success: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    HaltedOnError,
    Cancelled,
    Completed,
}

#[derive(Debug)]
pub struct DispatchReport {
    pub state: LoopState,
    pub results: Vec<DispatchResult>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &DispatchResult> {
        self.results.iter().filter(|r| r.success)
    }
}
