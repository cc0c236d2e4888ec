pub mod cell;
pub mod price_record;
