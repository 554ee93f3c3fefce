use rust_decimal::Decimal;

/// Upper bound of the normalized coordinate space used by damage locations.
pub const LOCATION_SCALE: f64 = 1000.0;

/// Tolerance for money comparisons: one hundredth of the 0.01 subunit.
pub const MONEY_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Decimal precision kept on converted amounts before a rounding rule applies
pub const CONVERSION_DECIMAL_PRECISION: u32 = 6;

/// Credits granted to a freshly registered account.
pub const DEFAULT_STARTING_CREDITS: i64 = 5;

/// Prefix of exported report files.
pub const REPORT_FILE_PREFIX: &str = "AutoClaim_Report";

/// Branding shown at the top of every exported report.
pub const REPORT_TITLE: &str = "AutoClaim AI";
pub const REPORT_SUBTITLE: &str = "Damage Assessment Report";
