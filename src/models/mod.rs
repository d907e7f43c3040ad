pub mod fund;
pub mod holding_record;
pub mod position;
pub mod position_change;
pub mod quarter;
