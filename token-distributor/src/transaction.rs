use ethers::types::{
    Address, Bytes, TransactionRequest, U256, transaction::eip2718::TypedTransaction,
};
use crate::config::Config;
use crate::error::{BuildError, ConfigError};
use crate::types::{PayoutKind, PayoutRow};

/// `transfer(address,uint256)`
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

const NATIVE_DECIMALS: u32 = 18;
/// Largest power of ten that still fits in a U256.
const MAX_DECIMALS: u32 = 77;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Native,
    Erc20 { contract: Address, decimals: u32 },
}

/// Per-run transaction settings, resolved once from the config.
#[derive(Debug, Clone)]
pub struct TxParams {
    pub asset: Asset,
    pub chain_id: u64,
    pub gas_price: U256,
    pub gas_limit: U256,
}

impl TxParams {
    pub fn from_config(config: &Config, kind: PayoutKind) -> Result<Self, ConfigError> {
        let gas_limit = config.gas_limit(kind).ok_or(ConfigError::Field {
            field: "gaslimit",
            value: format!("missing for {kind}"),
        })?;

        let asset = match kind {
            PayoutKind::Native => Asset::Native,
            PayoutKind::Erc20 => {
                let erc20 = config.erc20.as_ref().ok_or(ConfigError::Field {
                    field: "erc20",
                    value: "missing".to_string(),
                })?;
                let contract = erc20.erc20contractaddress.parse::<Address>().map_err(|_| {
                    ConfigError::Field {
                        field: "erc20contractaddress",
                        value: erc20.erc20contractaddress.clone(),
                    }
                })?;
                if erc20.decimals > MAX_DECIMALS {
                    return Err(ConfigError::Field {
                        field: "decimals",
                        value: erc20.decimals.to_string(),
                    });
                }
                Asset::Erc20 {
                    contract,
                    decimals: erc20.decimals,
                }
            }
        };

        Ok(Self {
            asset,
            chain_id: config.chainid,
            gas_price: config.gasprice.into(),
            gas_limit: gas_limit.into(),
        })
    }

    pub fn kind(&self) -> PayoutKind {
        match self.asset {
            Asset::Native => PayoutKind::Native,
            Asset::Erc20 { .. } => PayoutKind::Erc20,
        }
    }
}

/// Builds the unsigned transaction for one payout row.
pub fn build(row: &PayoutRow, params: &TxParams) -> Result<TypedTransaction, BuildError> {
    let recipient = row
        .address
        .parse::<Address>()
        .map_err(|_| BuildError::Address(row.address.clone()))?;

    let request = TransactionRequest::new()
        .gas_price(params.gas_price)
        .gas(params.gas_limit)
        .chain_id(params.chain_id)
        .nonce(row.nonce);

    let request = match &params.asset {
        Asset::Native => request
            .to(recipient)
            .value(scale_amount(&row.amount, NATIVE_DECIMALS)?),
        Asset::Erc20 { contract, decimals } => {
            let amount = scale_amount(&row.amount, *decimals)?;
            request
                .to(*contract)
                .value(U256::zero())
                .data(transfer_calldata(recipient, amount))
        }
    };

    Ok(request.into())
}

/// Decimal string to integer base units.
///
/// Fails instead of truncating when the fraction is finer than `decimals`, and
/// instead of wrapping when the result does not fit in a U256.
pub fn scale_amount(amount: &str, decimals: u32) -> Result<U256, BuildError> {
    if decimals > MAX_DECIMALS {
        return Err(BuildError::Decimals(decimals));
    }
    if amount.starts_with('-') {
        return Err(BuildError::NegativeAmount(amount.to_string()));
    }

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(BuildError::Amount(amount.to_string()));
    }

    let fraction = fraction.trim_end_matches('0');
    let fraction_len = fraction.len() as u32;
    if fraction_len > decimals {
        return Err(BuildError::TooManyDecimals {
            amount: amount.to_string(),
            decimals,
        });
    }

    let out_of_range = || BuildError::AmountOutOfRange(amount.to_string());
    let ten = U256::from(10u8);
    let parse = |digits: &str| {
        if digits.is_empty() {
            Ok(U256::zero())
        } else {
            U256::from_dec_str(digits).map_err(|_| out_of_range())
        }
    };

    let scale = ten
        .checked_pow(U256::from(decimals))
        .ok_or_else(out_of_range)?;
    let fraction_scale = ten
        .checked_pow(U256::from(decimals - fraction_len))
        .ok_or_else(out_of_range)?;

    let whole = parse(whole)?;
    let fraction = parse(fraction)?;
    whole
        .checked_mul(scale)
        .zip(fraction.checked_mul(fraction_scale))
        .and_then(|(w, f)| w.checked_add(f))
        .ok_or_else(out_of_range)
}

/// Selector followed by the two left-padded 32-byte arguments.
pub fn transfer_calldata(recipient: Address, amount: U256) -> Bytes {
    let mut data = Vec::with_capacity(4 + 32 + 32);
    data.extend_from_slice(&TRANSFER_SELECTOR);

    let mut word = [0u8; 32];
    word[12..].copy_from_slice(recipient.as_bytes());
    data.extend_from_slice(&word);

    amount.to_big_endian(&mut word);
    data.extend_from_slice(&word);

    data.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::utils::format_units;

    const RECIPIENT: &str = "0x1e58cd7ef5249689bfB37A82EE08345794F005cF";
    const CONTRACT: &str = "0x1234567890123456789012345678901234567890";

    fn row() -> PayoutRow {
        PayoutRow {
            address: RECIPIENT.to_string(),
            amount: "0.42".to_string(),
            nonce: 98,
        }
    }

    fn params(asset: Asset) -> TxParams {
        TxParams {
            asset,
            chain_id: 56,
            gas_price: U256::from(5_000_000_000u64),
            gas_limit: U256::from(21_000u64),
        }
    }

    #[test]
    fn native_pays_recipient_in_wei() {
        let tx = build(&row(), &params(Asset::Native)).unwrap();

        let recipient: Address = RECIPIENT.parse().unwrap();
        assert_eq!(tx.to_addr(), Some(&recipient));
        let value = *tx.value().unwrap();
        assert_eq!(value, U256::from(420_000_000_000_000_000u64));
        let decoded = format_units(value, 18).unwrap();
        assert_eq!(decoded.trim_end_matches('0'), "0.42");
        assert!(tx.data().is_none_or(|d| d.is_empty()));
    }

    #[test]
    fn copies_fixed_fields_verbatim() {
        let tx = build(&row(), &params(Asset::Native)).unwrap();
        assert_eq!(tx.nonce(), Some(&U256::from(98u64)));
        assert_eq!(tx.gas(), Some(&U256::from(21_000u64)));
        assert_eq!(tx.gas_price(), Some(U256::from(5_000_000_000u64)));
        assert_eq!(tx.chain_id().map(|id| id.as_u64()), Some(56));
    }

    #[test]
    fn erc20_calls_contract_with_transfer() {
        let contract: Address = CONTRACT.parse().unwrap();
        let tx = build(
            &row(),
            &params(Asset::Erc20 {
                contract,
                decimals: 6,
            }),
        )
        .unwrap();

        assert_eq!(tx.to_addr(), Some(&contract));
        assert_eq!(tx.value(), Some(&U256::zero()));

        let data = hex::encode(tx.data().unwrap());
        assert_eq!(data.len(), (4 + 32 + 32) * 2);
        assert!(data.starts_with("a9059cbb"));
        assert_eq!(
            &data[8..72],
            "0000000000000000000000001e58cd7ef5249689bfb37a82ee08345794f005cf"
        );
        // 0.42 * 10^6 = 420000 = 0x668a0
        assert_eq!(&data[72..], format!("{:0>64}", "668a0"));
    }

    #[test]
    fn rejects_bad_inputs() {
        let mut bad_address = row();
        bad_address.address = "0xnothex".to_string();
        assert!(matches!(
            build(&bad_address, &params(Asset::Native)),
            Err(BuildError::Address(_))
        ));

        let mut bad_amount = row();
        bad_amount.amount = "lots".to_string();
        assert!(matches!(
            build(&bad_amount, &params(Asset::Native)),
            Err(BuildError::Amount(_))
        ));

        let mut negative = row();
        negative.amount = "-1".to_string();
        assert!(matches!(
            build(&negative, &params(Asset::Native)),
            Err(BuildError::NegativeAmount(_))
        ));
    }

    #[test]
    fn amount_word_never_exceeds_32_bytes() {
        let data = transfer_calldata(Address::zero(), U256::MAX);
        assert_eq!(data.len(), 68);
        assert!(data[36..].iter().all(|b| *b == 0xff));
        assert!(matches!(
            scale_amount("1", MAX_DECIMALS + 1),
            Err(BuildError::Decimals(_))
        ));
    }

    #[test]
    fn huge_amount_is_rejected_not_wrapped() {
        let mut huge = row();
        huge.amount = format!("1{}", "0".repeat(60));
        assert!(matches!(
            build(&huge, &params(Asset::Native)),
            Err(BuildError::AmountOutOfRange(_))
        ));

        let contract: Address = CONTRACT.parse().unwrap();
        huge.amount = format!("1{}", "0".repeat(80));
        assert!(matches!(
            build(
                &huge,
                &params(Asset::Erc20 {
                    contract,
                    decimals: 6
                })
            ),
            Err(BuildError::AmountOutOfRange(_))
        ));
    }

    #[test]
    fn finer_fraction_than_decimals_is_rejected() {
        let contract: Address = CONTRACT.parse().unwrap();
        let mut dust = row();
        dust.amount = "0.0000005".to_string();
        assert!(matches!(
            build(
                &dust,
                &params(Asset::Erc20 {
                    contract,
                    decimals: 6
                })
            ),
            Err(BuildError::TooManyDecimals { decimals: 6, .. })
        ));

        dust.amount = format!("0.{}1", "0".repeat(18));
        assert!(matches!(
            build(&dust, &params(Asset::Native)),
            Err(BuildError::TooManyDecimals { decimals: 18, .. })
        ));
    }

    #[test]
    fn scales_edge_forms() {
        assert_eq!(scale_amount("1.500000", 1).unwrap(), U256::from(15u8));
        assert_eq!(scale_amount(".5", 2).unwrap(), U256::from(50u8));
        assert_eq!(scale_amount("7", 0).unwrap(), U256::from(7u8));
        assert_eq!(scale_amount("0.000001", 6).unwrap(), U256::one());
        assert!(matches!(scale_amount(".", 6), Err(BuildError::Amount(_))));
        assert!(matches!(scale_amount("1e3", 6), Err(BuildError::Amount(_))));
    }
}
