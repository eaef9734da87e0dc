use std::path::Path;

use crate::error::BatchReadError;
use crate::types::PayoutRow;

/// Address, amount, nonce.
const COLUMNS: usize = 3;

/// Reads the payout batch at `path`. The first line is a header.
pub fn load_batch<P: AsRef<Path>>(path: P) -> Result<Vec<PayoutRow>, BatchReadError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| BatchReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_batch(&contents)
}

/// Parses every row or none: one malformed row fails the whole batch.
pub fn parse_batch(contents: &str) -> Result<Vec<PayoutRow>, BatchReadError> {
    contents
        .lines()
        .enumerate()
        .skip(1)
        .map(|(index, line)| parse_row(line, index + 1))
        .collect()
}

fn parse_row(line: &str, line_no: usize) -> Result<PayoutRow, BatchReadError> {
    let fields: Vec<&str> = line.split(',').take(COLUMNS).map(str::trim).collect();
    if fields.len() < COLUMNS || fields.iter().any(|f| f.is_empty()) {
        return Err(BatchReadError::MalformedRow {
            line: line_no,
            expected: COLUMNS,
        });
    }

    let nonce = fields[2]
        .parse::<u64>()
        .map_err(|_| BatchReadError::InvalidNonce {
            line: line_no,
            value: fields[2].to_string(),
        })?;

    Ok(PayoutRow {
        address: fields[0].to_string(),
        amount: fields[1].to_string(),
        nonce,
    })
}
