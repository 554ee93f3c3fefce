//! Presentation currencies and their rounding rules.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::fx_errors::FxError;

/// Currencies a report can be presented in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    Pkr,
    Usd,
    Eur,
    Gbp,
}

impl CurrencyCode {
    pub const ALL: [CurrencyCode; 4] = [
        CurrencyCode::Pkr,
        CurrencyCode::Usd,
        CurrencyCode::Eur,
        CurrencyCode::Gbp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyCode::Pkr => "PKR",
            CurrencyCode::Usd => "USD",
            CurrencyCode::Eur => "EUR",
            CurrencyCode::Gbp => "GBP",
        }
    }

    /// Text placed before the digits when displaying an amount.
    pub fn display_prefix(&self) -> &'static str {
        match self {
            CurrencyCode::Pkr => "PKR ",
            CurrencyCode::Usd => "$",
            CurrencyCode::Eur => "€",
            CurrencyCode::Gbp => "£",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == code)
            .ok_or_else(|| FxError::UnsupportedCurrency(s.to_string()))
    }
}

/// How a converted amount is brought to a presentable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingRule {
    /// Nearest whole unit, halves away from zero.
    WholeUnit,
    /// Up to the next multiple of the granularity.
    UpToGranularity(Decimal),
}

impl RoundingRule {
    /// Rounds `amount`, failing when the result leaves the decimal range.
    pub fn apply(&self, amount: Decimal) -> Result<Decimal, FxError> {
        match self {
            RoundingRule::WholeUnit => {
                Ok(amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            }
            RoundingRule::UpToGranularity(granularity) => amount
                .checked_div(*granularity)
                .and_then(|steps| steps.ceil().checked_mul(*granularity))
                .map(|rounded| rounded.normalize())
                .ok_or_else(|| {
                    FxError::ConversionContractViolation(format!(
                        "amount {} cannot be rounded up to a multiple of {}",
                        amount, granularity
                    ))
                }),
        }
    }
}

/// Rate and rounding policy of one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencySpec {
    pub code: CurrencyCode,
    /// Units of this currency per one US dollar.
    pub units_per_usd: Decimal,
    pub rounding: RoundingRule,
}

/// Static rate table. Every rate is expressed against the dollar so the base
/// currency can be any entry of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyTable {
    base: CurrencyCode,
    specs: Vec<CurrencySpec>,
}

impl CurrencyTable {
    pub fn new(base: CurrencyCode, specs: Vec<CurrencySpec>) -> Result<Self, FxError> {
        for spec in &specs {
            if spec.units_per_usd <= Decimal::ZERO {
                return Err(FxError::InvalidExchangeRate(format!(
                    "{} rate must be positive, got {}",
                    spec.code, spec.units_per_usd
                )));
            }
            if let RoundingRule::UpToGranularity(g) = spec.rounding {
                if g <= Decimal::ZERO {
                    return Err(FxError::InvalidExchangeRate(format!(
                        "{} rounding granularity must be positive, got {}",
                        spec.code, g
                    )));
                }
            }
        }
        if !specs.iter().any(|s| s.code == base) {
            return Err(FxError::UnsupportedCurrency(base.to_string()));
        }
        Ok(Self { base, specs })
    }

    pub fn base(&self) -> CurrencyCode {
        self.base
    }

    pub fn spec(&self, code: CurrencyCode) -> Result<&CurrencySpec, FxError> {
        self.specs
            .iter()
            .find(|s| s.code == code)
            .ok_or_else(|| FxError::UnsupportedCurrency(code.to_string()))
    }

    pub fn currencies(&self) -> impl Iterator<Item = CurrencyCode> + '_ {
        self.specs.iter().map(|s| s.code)
    }
}

impl Default for CurrencyTable {
    /// PKR base, the unit the analysis provider prices in.
    fn default() -> Self {
        Self {
            base: CurrencyCode::Pkr,
            specs: vec![
                CurrencySpec {
                    code: CurrencyCode::Usd,
                    units_per_usd: dec!(1),
                    rounding: RoundingRule::WholeUnit,
                },
                CurrencySpec {
                    code: CurrencyCode::Pkr,
                    units_per_usd: dec!(278.50),
                    rounding: RoundingRule::UpToGranularity(dec!(100)),
                },
                CurrencySpec {
                    code: CurrencyCode::Eur,
                    units_per_usd: dec!(0.92),
                    rounding: RoundingRule::WholeUnit,
                },
                CurrencySpec {
                    code: CurrencyCode::Gbp,
                    units_per_usd: dec!(0.79),
                    rounding: RoundingRule::WholeUnit,
                },
            ],
        }
    }
}
