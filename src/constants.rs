/// Brand keys used when neither the CLI nor the config file names any
pub const DEFAULT_BRANDS: [&str; 4] = ["chaturbate", "stripchat", "bongacams", "royalcams"];

pub const DEFAULT_MAX: usize = 500;
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Hard stop for a single brand's pagination, regardless of quota
pub const PAGE_SAFETY_CAP: u32 = 250;
pub const INTER_PAGE_DELAY_MS: u64 = 250;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_SORT: &str = "popular";
pub const DEFAULT_URL_TEMPLATE: &str = "https://api.performers.example/v1/performers?token={token}&brands={brands}&page={page}&limit={per_page}&sort={sort}";

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_CATALOG_PATH: &str = "data/catalog.json";
pub const DEFAULT_PERFORMERS_PATH: &str = "data/performers.json";

// Environment variable names
pub const ENV_API_KEY: &str = "PERFORMERS_API_KEY";
pub const ENV_API_TOKEN: &str = "PERFORMERS_API_TOKEN";
pub const ENV_USER_AGENT: &str = "PERFORMERS_USER_AGENT";
pub const ENV_API_URL: &str = "PERFORMERS_API_URL";

pub const API_KEY_HEADER: &str = "x-api-key";

/// Record fields that carry the identifier, in lookup order
pub const ID_FIELDS: [&str; 2] = ["itemId", "id"];
/// Record fields that carry the brand, in lookup order
pub const BRAND_FIELDS: [&str; 3] = ["systemSource", "source", "brand"];

pub fn default_user_agent() -> String {
    format!("performer-sync/{}", env!("CARGO_PKG_VERSION"))
}
