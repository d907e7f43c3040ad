pub mod classifier;
pub mod columns;
pub mod files;
pub mod holdings;
pub mod loader;
pub mod market_data;
pub mod parsers;
pub mod shared;
pub mod workbook;
