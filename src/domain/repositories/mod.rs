pub mod ledger;
pub mod price_oracle;
