use log::error;
use rust_decimal::{Decimal, RoundingStrategy};

use super::currency::{CurrencyCode, CurrencyTable};
use super::fx_errors::FxError;
use crate::constants::CONVERSION_DECIMAL_PRECISION;

/// Localizes base-currency amounts for presentation.
///
/// Pure: the same amount and currency always give the same result, and the
/// table is fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct CurrencyConverter {
    table: CurrencyTable,
}

impl CurrencyConverter {
    pub fn new(table: CurrencyTable) -> Self {
        Self { table }
    }

    pub fn base_currency(&self) -> CurrencyCode {
        self.table.base()
    }

    pub fn table(&self) -> &CurrencyTable {
        &self.table
    }

    /// Converts a base-currency amount and applies the target's rounding rule.
    pub fn convert(&self, amount: Decimal, currency: CurrencyCode) -> Result<Decimal, FxError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(contract_violation(format!(
                "amount {} is negative",
                amount
            )));
        }

        let target = self.table.spec(currency)?;
        let base = self.table.spec(self.table.base())?;

        let scaled = if target.code == base.code {
            amount
        } else {
            amount
                .checked_mul(target.units_per_usd)
                .and_then(|v| v.checked_div(base.units_per_usd))
                .ok_or_else(|| {
                    contract_violation(format!(
                        "amount {} overflows when converted to {}",
                        amount, currency
                    ))
                })?
        };

        target
            .rounding
            .apply(scaled.round_dp(CONVERSION_DECIMAL_PRECISION))
            .map_err(|err| {
                error!("{}", err);
                err
            })
    }

    /// Entry point for amounts that arrive as binary floats.
    pub fn convert_f64(&self, amount: f64, currency: CurrencyCode) -> Result<Decimal, FxError> {
        if !amount.is_finite() {
            return Err(contract_violation(format!("amount {} is not finite", amount)));
        }
        let decimal = Decimal::try_from(amount).map_err(|_| {
            contract_violation(format!("amount {} is out of range", amount))
        })?;
        self.convert(decimal, currency)
    }

    /// Converts and formats an amount, e.g. `PKR 12,400` or `$45`.
    pub fn to_display(&self, amount: Decimal, currency: CurrencyCode) -> Result<String, FxError> {
        let converted = self.convert(amount, currency)?;
        Ok(format_amount(converted, currency))
    }
}

fn contract_violation(message: String) -> FxError {
    error!("Currency conversion contract violated: {}", message);
    FxError::ConversionContractViolation(message)
}

/// Formats an already converted amount with grouped thousands and no
/// fraction digits.
pub fn format_amount(amount: Decimal, currency: CurrencyCode) -> String {
    let whole = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = whole.abs().trunc().to_string();
    let sign = if whole.is_sign_negative() && !whole.is_zero() {
        "-"
    } else {
        ""
    };
    format!(
        "{}{}{}",
        sign,
        currency.display_prefix(),
        group_thousands(&digits)
    )
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::{CurrencySpec, RoundingRule};
    use rust_decimal_macros::dec;

    fn converter() -> CurrencyConverter {
        CurrencyConverter::default()
    }

    #[test]
    fn test_base_currency_is_identity_before_rounding() {
        let c = converter();
        assert_eq!(c.convert(dec!(12500), CurrencyCode::Pkr).unwrap(), dec!(12500));
        assert_eq!(c.to_display(dec!(12500), CurrencyCode::Pkr).unwrap(), "PKR 12,500");
    }

    #[test]
    fn test_dominant_currency_rounds_up_to_hundreds() {
        let c = converter();
        assert_eq!(c.convert(dec!(12345), CurrencyCode::Pkr).unwrap(), dec!(12400));
        assert_eq!(c.convert(dec!(12301), CurrencyCode::Pkr).unwrap(), dec!(12400));
        assert_eq!(c.convert(dec!(12400), CurrencyCode::Pkr).unwrap(), dec!(12400));
        assert_eq!(c.convert(dec!(0.5), CurrencyCode::Pkr).unwrap(), dec!(100));
        assert_eq!(c.convert(Decimal::ZERO, CurrencyCode::Pkr).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_other_currencies_round_to_whole_units() {
        let c = converter();
        // 12500 / 278.50 = 44.88
        assert_eq!(c.convert(dec!(12500), CurrencyCode::Usd).unwrap(), dec!(45));
        // 12500 * 0.92 / 278.50 = 41.29
        assert_eq!(c.convert(dec!(12500), CurrencyCode::Eur).unwrap(), dec!(41));
        // 12500 * 0.79 / 278.50 = 35.46
        assert_eq!(c.convert(dec!(12500), CurrencyCode::Gbp).unwrap(), dec!(35));
    }

    #[test]
    fn test_half_rounds_away_from_zero() {
        // 278.50 * 2.5 = 696.25 PKR is exactly 2.5 USD
        let c = converter();
        assert_eq!(c.convert(dec!(696.25), CurrencyCode::Usd).unwrap(), dec!(3));
    }

    #[test]
    fn test_display_formats() {
        let c = converter();
        assert_eq!(c.to_display(dec!(12500), CurrencyCode::Usd).unwrap(), "$45");
        assert_eq!(c.to_display(dec!(12500), CurrencyCode::Eur).unwrap(), "€41");
        assert_eq!(c.to_display(dec!(12500), CurrencyCode::Gbp).unwrap(), "£35");
        assert_eq!(
            c.to_display(dec!(1234567), CurrencyCode::Pkr).unwrap(),
            "PKR 1,234,600"
        );
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("0"), "0");
        assert_eq!(group_thousands("999"), "999");
        assert_eq!(group_thousands("1000"), "1,000");
        assert_eq!(group_thousands("123456"), "123,456");
        assert_eq!(group_thousands("1234567"), "1,234,567");
    }

    #[test]
    fn test_negative_amount_is_contract_violation() {
        let err = converter().convert(dec!(-1), CurrencyCode::Usd).unwrap_err();
        assert!(matches!(err, FxError::ConversionContractViolation(_)));
    }

    #[test]
    fn test_rounding_up_near_decimal_max_is_contract_violation() {
        let c = converter();
        let err = c.convert(Decimal::MAX, CurrencyCode::Pkr).unwrap_err();
        assert!(matches!(err, FxError::ConversionContractViolation(_)));
        assert!(c.to_display(Decimal::MAX, CurrencyCode::Pkr).is_err());
    }

    #[test]
    fn test_non_finite_float_is_contract_violation() {
        let c = converter();
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                c.convert_f64(value, CurrencyCode::Pkr),
                Err(FxError::ConversionContractViolation(_))
            ));
        }
        assert_eq!(c.convert_f64(12345.0, CurrencyCode::Pkr).unwrap(), dec!(12400));
    }

    #[test]
    fn test_conversion_is_pure() {
        let c = converter();
        let first = c.convert(dec!(98765.43), CurrencyCode::Eur).unwrap();
        for _ in 0..10 {
            assert_eq!(c.convert(dec!(98765.43), CurrencyCode::Eur).unwrap(), first);
        }
    }

    #[test]
    fn test_currency_code_parsing() {
        assert_eq!("pkr".parse::<CurrencyCode>().unwrap(), CurrencyCode::Pkr);
        assert_eq!(" USD ".parse::<CurrencyCode>().unwrap(), CurrencyCode::Usd);
        assert!(matches!(
            "JPY".parse::<CurrencyCode>(),
            Err(FxError::UnsupportedCurrency(_))
        ));
        assert_eq!(serde_json::to_string(&CurrencyCode::Gbp).unwrap(), "\"GBP\"");
    }

    #[test]
    fn test_table_rejects_bad_rates() {
        let result = CurrencyTable::new(
            CurrencyCode::Usd,
            vec![CurrencySpec {
                code: CurrencyCode::Usd,
                units_per_usd: Decimal::ZERO,
                rounding: RoundingRule::WholeUnit,
            }],
        );
        assert!(matches!(result, Err(FxError::InvalidExchangeRate(_))));
    }

    #[test]
    fn test_table_requires_base_entry() {
        let result = CurrencyTable::new(
            CurrencyCode::Eur,
            vec![CurrencySpec {
                code: CurrencyCode::Usd,
                units_per_usd: dec!(1),
                rounding: RoundingRule::WholeUnit,
            }],
        );
        assert!(matches!(result, Err(FxError::UnsupportedCurrency(_))));
    }

    #[test]
    fn test_usd_base_table() {
        let table = CurrencyTable::new(
            CurrencyCode::Usd,
            vec![
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
            ],
        )
        .unwrap();
        let c = CurrencyConverter::new(table);
        // 45 * 278.50 = 12532.5
        assert_eq!(c.convert(dec!(45), CurrencyCode::Pkr).unwrap(), dec!(12600));
        assert!(c.convert(dec!(45), CurrencyCode::Gbp).is_err());
    }
}
