pub const IN_DIR: &str = "data/in";
pub const OUT_DIR: &str = "data/out";

pub const FMP_BASE_URL: &str = "https://financialmodelingprep.com";
pub const DEFAULT_FETCH_DELAY_MS: u64 = 1000;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 20;
