use dotenvy::{dotenv, from_filename, var};
use rust_decimal::Decimal;
use tracing::warn;

pub fn check_for_env_variables() {
    // only fetching needs the API key, local analysis works without it
    match get_env_variable("FMP_API_KEY") {
        Some(_) => println!("FMP API key set ✅"),
        None => println!("FMP_API_KEY not set, fetching holdings will not be possible ⚠️"),
    };
    if let Some(base_url) = get_env_variable("FMP_BASE_URL") {
        println!("Using FMP base URL {} ⚠️", base_url);
    }
}

pub fn get_env_variable(variable_to_get: &str) -> Option<String> {
    let environment = var("RUST_ENV").unwrap_or_else(|_| "development".into());

    match environment.as_str() {
        "development" => from_filename(".env.dev").ok(),
        "production" => from_filename(".env.prod").ok(),
        _ => dotenv().ok(),
    };
    var(variable_to_get).ok()
}

pub fn get_env_u64(variable_to_get: &str, default: u64) -> u64 {
    match get_env_variable(variable_to_get) {
        Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}='{}', using {}", variable_to_get, raw, default);
            default
        }),
        None => default,
    }
}

pub fn get_env_decimal(variable_to_get: &str, default: Decimal) -> Decimal {
    match get_env_variable(variable_to_get) {
        Some(raw) => raw.trim().parse::<Decimal>().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}='{}', using {}", variable_to_get, raw, default);
            default
        }),
        None => default,
    }
}
