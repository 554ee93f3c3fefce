use autoclaim_core::constants::DEFAULT_STARTING_CREDITS;
use autoclaim_core::fx::CurrencyCode;

pub struct Config {
    pub db_path: String,
    pub export_dir: String,
    pub display_currency: CurrencyCode,
    pub starting_credits: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let db_path =
            std::env::var("AUTOCLAIM_DB_PATH").unwrap_or_else(|_| "./db/autoclaim.db".into());
        let export_dir =
            std::env::var("AUTOCLAIM_EXPORT_DIR").unwrap_or_else(|_| "./exports".into());
        let display_currency = std::env::var("AUTOCLAIM_DISPLAY_CURRENCY")
            .unwrap_or_else(|_| "PKR".into())
            .parse::<CurrencyCode>()
            .map_err(|e| anyhow::anyhow!("Invalid AUTOCLAIM_DISPLAY_CURRENCY: {}", e))?;
        let starting_credits: i64 = std::env::var("AUTOCLAIM_STARTING_CREDITS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|c| *c >= 0)
            .unwrap_or(DEFAULT_STARTING_CREDITS);
        Ok(Self {
            db_path,
            export_dir,
            display_currency,
            starting_credits,
        })
    }
}
