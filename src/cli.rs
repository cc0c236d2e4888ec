use clap::{Parser, Subcommand};

/// Spreadsheet, credentials and CoinGecko settings come from the environment
/// (or `.env`), see `config.rs`.
#[derive(Parser, Debug)]
#[command(name = "trackmycoin", author, version, about = "Fill due coin prices in a tracking spreadsheet")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Read the ledger, fill due prices from CoinGecko and write it back
    Process,
}
