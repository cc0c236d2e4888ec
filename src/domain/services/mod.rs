pub mod row_codec;
pub mod symbol_resolver;
pub mod temporal_policy;
