use tracing::Level;

use super::env::get_env_variable;

const DEFAULT_LEVEL: Level = Level::INFO;

/// Reads a `VERBOSITY` value such as `debug`, `WARN` or `5`; anything else yields `None`.
fn verbosity_level(raw: &str) -> Option<Level> {
    raw.trim().parse::<Level>().ok()
}

pub fn init_logger() {
    let level = match get_env_variable("VERBOSITY") {
        None => DEFAULT_LEVEL,
        Some(raw) => verbosity_level(&raw).unwrap_or_else(|| {
            eprintln!("Unknown VERBOSITY '{}', logging at {}", raw, DEFAULT_LEVEL);
            DEFAULT_LEVEL
        }),
    };

    // stdout carries the report tables, so diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
