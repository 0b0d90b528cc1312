// 7.0 config.rs: construction parameters. floors, fee rate, assets, variant tag.
// 7.1 validated once when a desk is built, read only afterwards.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, AssetId, Bps};

// rust_decimal carries at most 28 fractional digits
const MAX_DECIMALS: u32 = 28;

// Which position family a desk runs. picked at construction, never inspected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    // native collateral, whole-position sale
    SingleFill,
    // token collateral, many buyers per position
    PartialFill,
}

// An asset the desk moves, with the precision the asset layer can settle in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub id: AssetId,
    // Display symbol (e.g. "ETH", "DAI")
    pub symbol: String,
    // Smallest representable fraction; payments are truncated to this scale
    pub decimals: u32,
}

impl AssetConfig {
    pub fn native(symbol: &str, decimals: u32) -> Self {
        Self {
            id: AssetId::Native,
            symbol: symbol.to_string(),
            decimals,
        }
    }

    pub fn token(address: Address, symbol: &str, decimals: u32) -> Self {
        Self {
            id: AssetId::Token(address),
            symbol: symbol.to_string(),
            decimals,
        }
    }
}

/** 7.2: the parameter set. immutable floors plus the fee rate */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotParams {
    pub variant: Variant,
    // What gets locked
    pub collateral: AssetConfig,
    // What ask and strike are paid in
    pub quote: AssetConfig,
    // Minimum collateral per position
    pub min_lock: Amount,
    // Minimum seconds between creation and expire
    pub min_expire: i64,
    // Minimum ask
    pub min_price_in: Amount,
    // Minimum strike
    pub min_price_out: Amount,
    // Protocol cut of every purchase payment
    pub fee_bps: Bps,
    // Proceeds account credited with the protocol cut
    pub fee_recipient: Address,
}

impl PivotParams {
    // single-fill defaults: ETH collateral quoted in DAI
    pub fn single_fill(quote_token: Address, fee_recipient: Address) -> Self {
        Self {
            variant: Variant::SingleFill,
            collateral: AssetConfig::native("ETH", 18),
            quote: AssetConfig::token(quote_token, "DAI", 18),
            min_lock: Amount::new_unchecked(dec!(0.001)),
            min_expire: 1000,
            min_price_in: Amount::from_units(1),
            min_price_out: Amount::from_units(1),
            fee_bps: Bps::new(10),
            fee_recipient,
        }
    }

    // partial-fill defaults: token collateral quoted in DAI
    pub fn partial_fill(collateral_token: Address, quote_token: Address, fee_recipient: Address) -> Self {
        Self {
            variant: Variant::PartialFill,
            collateral: AssetConfig::token(collateral_token, "TKN", 18),
            quote: AssetConfig::token(quote_token, "DAI", 18),
            min_lock: Amount::from_units(1000),
            min_expire: 1000,
            min_price_in: Amount::new_unchecked(dec!(0.000001)),
            min_price_out: Amount::new_unchecked(dec!(0.000001)),
            fee_bps: Bps::new(10),
            fee_recipient,
        }
    }

    // Parse and validate in one go. a desk never sees unvalidated params.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let params: PivotParams =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    // Check every floor and asset reference. order matches what callers see first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.collateral.id.is_valid() || !self.quote.id.is_valid() {
            return Err(ConfigError::InvalidAsset);
        }

        if self.min_lock.value() <= Decimal::ZERO {
            return Err(ConfigError::InvalidMinLock);
        }

        if self.min_expire <= 0 {
            return Err(ConfigError::InvalidMinExpire(self.min_expire));
        }

        if self.min_price_in.value() <= Decimal::ZERO {
            return Err(ConfigError::InvalidMinPriceIn);
        }

        if self.min_price_out.value() <= Decimal::ZERO {
            return Err(ConfigError::InvalidMinPriceOut);
        }

        if self.fee_bps > Bps::MAX {
            return Err(ConfigError::InvalidFee(self.fee_bps.value()));
        }

        if self.fee_recipient.is_zero() {
            return Err(ConfigError::InvalidFeeRecipient);
        }

        if self.collateral.id == self.quote.id {
            return Err(ConfigError::SameAsset);
        }

        let collateral_ok = match self.variant {
            Variant::SingleFill => self.collateral.id.is_native(),
            Variant::PartialFill => !self.collateral.id.is_native(),
        };
        if !collateral_ok {
            return Err(ConfigError::CollateralMismatch {
                variant: self.variant,
                asset: self.collateral.id,
            });
        }

        for asset in [&self.collateral, &self.quote] {
            if asset.decimals > MAX_DECIMALS {
                return Err(ConfigError::InvalidDecimals {
                    symbol: asset.symbol.clone(),
                    decimals: asset.decimals,
                });
            }
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid token")]
    InvalidAsset,

    #[error("Invalid min_lock")]
    InvalidMinLock,

    #[error("Invalid min_expire: {0}")]
    InvalidMinExpire(i64),

    #[error("Invalid min_price_in")]
    InvalidMinPriceIn,

    #[error("Invalid min_price_out")]
    InvalidMinPriceOut,

    #[error("Invalid fee: {0} bps exceeds 10000")]
    InvalidFee(u32),

    #[error("Invalid fee recipient")]
    InvalidFeeRecipient,

    #[error("Collateral and quote must be different assets")]
    SameAsset,

    #[error("{variant:?} cannot use {asset} as collateral")]
    CollateralMismatch { variant: Variant, asset: AssetId },

    #[error("Asset {symbol} has {decimals} decimals, more than supported")]
    InvalidDecimals { symbol: String, decimals: u32 },

    #[error("Desk built for {expected:?} but params are {actual:?}")]
    VariantMismatch { expected: Variant, actual: Variant },

    #[error("Config parse error: {0}")]
    Parse(String),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    // fixed preset addresses so presets are reproducible across runs
    pub fn params(&self, variant: Variant) -> PivotParams {
        let collateral_token = Address::from_low_u64(0x7c01);
        let quote_token = Address::from_low_u64(0xda1);
        let treasury = Address::from_low_u64(0xfee);

        let mut params = match variant {
            Variant::SingleFill => PivotParams::single_fill(quote_token, treasury),
            Variant::PartialFill => PivotParams::partial_fill(collateral_token, quote_token, treasury),
        };

        match self {
            Environment::Development => {}
            Environment::Testnet => {
                params.fee_bps = Bps::new(0); // free on testnet
                params.min_expire = 60;
            }
            Environment::Mainnet => {
                params.fee_bps = Bps::new(25);
                params.min_expire = 3600; // at least an hour to exercise
            }
        }
        params
    }
}
