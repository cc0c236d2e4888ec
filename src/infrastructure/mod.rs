pub mod coingecko_client;
pub mod google_sheets_client;
pub mod ledger_client_factory;
pub mod service_account;
