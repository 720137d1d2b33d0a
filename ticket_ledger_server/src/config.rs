use std::{env, fmt::Display, str::FromStr, time::Duration};

#[cfg(feature = "airtable")]
use airtable_tools::AirtableConfig;
use log::*;
use stripe_tools::StripeConfig;
use ticket_ledger_engine::{cache::DEFAULT_CACHE_TTL, db_types::PriceTable, LedgerSettings, DEFAULT_FEE_RATE_BPS};
#[cfg(feature = "airtable")]
use ticket_ledger_engine::traits::Table;
use tlg_common::{parse_boolean_flag, parse_env_value, DEFAULT_CURRENCY_CODE};

const DEFAULT_TLG_HOST: &str = "127.0.0.1";
const DEFAULT_TLG_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/ticket_ledger.db?mode=rwc";

/// Where the ledger keeps its tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecordStoreKind {
    #[default]
    Sqlite,
    Airtable,
}

impl FromStr for RecordStoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "airtable" => Ok(Self::Airtable),
            other => Err(format!("'{other}' is not a record store. Use 'sqlite' or 'airtable'")),
        }
    }
}

impl Display for RecordStoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Airtable => write!(f, "airtable"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Only used by the SQLite record store.
    pub database_url: String,
    pub record_store: RecordStoreKind,
    /// How long record snapshots are cached for. Zero disables the cache.
    pub cache_ttl: Duration,
    /// Processing fee rate, in basis points.
    pub fee_rate_bps: i64,
    /// If false, the built-in list prices are used and the price constants are ignored.
    pub prices_from_constants: bool,
    pub currency: String,
    #[cfg(feature = "airtable")]
    pub airtable: AirtableSettings,
    pub stripe: StripeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TLG_HOST.to_string(),
            port: DEFAULT_TLG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            record_store: RecordStoreKind::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            fee_rate_bps: DEFAULT_FEE_RATE_BPS,
            prices_from_constants: true,
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            #[cfg(feature = "airtable")]
            airtable: AirtableSettings::default(),
            stripe: StripeConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("TLG_HOST").ok().unwrap_or_else(|| DEFAULT_TLG_HOST.into());
        let port = env_or_default("TLG_PORT", DEFAULT_TLG_PORT);
        let record_store = env_or_default("TLG_RECORD_STORE", RecordStoreKind::default());
        let database_url = env::var("TLG_DATABASE_URL").ok().unwrap_or_else(|| {
            if record_store == RecordStoreKind::Sqlite {
                warn!("🪛️ TLG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            }
            DEFAULT_DATABASE_URL.to_string()
        });
        let cache_ttl = Duration::from_secs(env_or_default("TLG_CACHE_TTL_SECS", DEFAULT_CACHE_TTL.as_secs()));
        let fee_rate_bps = env_or_default("TLG_FEE_RATE_BPS", DEFAULT_FEE_RATE_BPS);
        if !(0..=10_000).contains(&fee_rate_bps) {
            warn!("🪛️ TLG_FEE_RATE_BPS is {fee_rate_bps}, which is outside 0-10000. Using it anyway.");
        }
        let prices_from_constants = parse_boolean_flag(env::var("TLG_PRICES_FROM_CONSTANTS").ok(), true);
        let currency = env::var("TLG_CURRENCY")
            .map(|s| s.trim().to_ascii_lowercase())
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());
        #[cfg(feature = "airtable")]
        let airtable = AirtableSettings::from_env_or_default();
        let stripe = StripeConfig::new_from_env_or_default();
        info!("🪛️ Ledger backend: {record_store}. Cache TTL: {}s", cache_ttl.as_secs());
        Self {
            host,
            port,
            database_url,
            record_store,
            cache_ttl,
            fee_rate_bps,
            prices_from_constants,
            currency,
            #[cfg(feature = "airtable")]
            airtable,
            stripe,
        }
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        let fixed_prices = (!self.prices_from_constants).then(PriceTable::default);
        LedgerSettings { fee_rate_bps: self.fee_rate_bps, fixed_prices, currency: self.currency.clone() }
    }
}

fn env_or_default<T: FromStr + Display>(name: &str, default: T) -> T {
    match parse_env_value::<T>(name) {
        Ok(Some(v)) => v,
        Ok(None) => default,
        Err(s) => {
            error!("🪛️ {s} is not a valid value for {name}. Using the default, {default}, instead.");
            default
        },
    }
}

/// Airtable credentials plus the names of the four ledger tables in the base.
#[cfg(feature = "airtable")]
#[derive(Clone, Debug)]
pub struct AirtableSettings {
    pub api: AirtableConfig,
    pub orders_table: String,
    pub aggregations_table: String,
    pub constants_table: String,
    pub purchasers_table: String,
}

#[cfg(feature = "airtable")]
impl Default for AirtableSettings {
    fn default() -> Self {
        Self {
            api: AirtableConfig::default(),
            orders_table: Table::Orders.name().to_string(),
            aggregations_table: Table::Aggregations.name().to_string(),
            constants_table: Table::Constants.name().to_string(),
            purchasers_table: Table::Purchasers.name().to_string(),
        }
    }
}

#[cfg(feature = "airtable")]
impl AirtableSettings {
    pub fn from_env_or_default() -> Self {
        let table = |name: &str, table: Table| {
            env::var(name).ok().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| table.name().to_string())
        };
        Self {
            api: AirtableConfig::new_from_env_or_default(),
            orders_table: table("TLG_AIRTABLE_ORDERS_TABLE", Table::Orders),
            aggregations_table: table("TLG_AIRTABLE_AGGREGATIONS_TABLE", Table::Aggregations),
            constants_table: table("TLG_AIRTABLE_CONSTANTS_TABLE", Table::Constants),
            purchasers_table: table("TLG_AIRTABLE_PURCHASERS_TABLE", Table::Purchasers),
        }
    }

    pub fn table_name(&self, table: Table) -> &str {
        match table {
            Table::Orders => &self.orders_table,
            Table::Aggregations => &self.aggregations_table,
            Table::Constants => &self.constants_table,
            Table::Purchasers => &self.purchasers_table,
        }
    }
}
