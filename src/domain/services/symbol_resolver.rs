//! Ticker symbol to CoinGecko coin id mapping.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static COIN_IDS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("btc", "bitcoin"),
        ("eth", "ethereum"),
        ("usdt", "tether"),
        ("bnb", "binancecoin"),
        ("sol", "solana"),
        ("xrp", "ripple"),
        ("usdc", "usd-coin"),
        ("ada", "cardano"),
        ("avax", "avalanche-2"),
        ("doge", "dogecoin"),
        ("dot", "polkadot"),
        ("matic", "matic-network"),
        ("link", "chainlink"),
        ("uni", "uniswap"),
        ("ltc", "litecoin"),
        ("atom", "cosmos"),
        ("etc", "ethereum-classic"),
        ("xlm", "stellar"),
        ("bch", "bitcoin-cash"),
        ("near", "near"),
        ("algo", "algorand"),
        ("vet", "vechain"),
        ("icp", "internet-computer"),
        ("fil", "filecoin"),
        ("apt", "aptos"),
        ("hbar", "hedera-hashgraph"),
        ("arb", "arbitrum"),
        ("op", "optimism"),
        ("ldo", "lido-dao"),
        ("imx", "immutable-x"),
        ("stx", "blockstack"),
        ("inj", "injective-protocol"),
        ("sui", "sui"),
        ("sei", "sei-network"),
        ("tia", "celestia"),
        ("xvg", "verge"),
        ("trx", "tron"),
        ("shib", "shiba-inu"),
        ("dai", "dai"),
        ("wbtc", "wrapped-bitcoin"),
        ("leo", "leo-token"),
        ("ton", "the-open-network"),
        ("okb", "okb"),
    ])
});

/// Normalize a user-facing symbol (trim + lowercase).
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_lowercase()
}

/// Resolve a symbol such as "BTC" to the oracle's coin id ("bitcoin").
///
/// Unknown symbols pass through normalized, which is already the right id
/// for a number of coins.
pub fn resolve_coin_id(symbol: &str) -> String {
    let normalized = normalize_symbol(symbol);
    match COIN_IDS.get(normalized.as_str()) {
        Some(coin_id) => coin_id.to_string(),
        None => normalized,
    }
}

pub fn is_known_symbol(symbol: &str) -> bool {
    COIN_IDS.contains_key(normalize_symbol(symbol).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_symbols() {
        let cases = [
            ("BTC", "bitcoin"),
            ("btc", "bitcoin"),
            ("ETH", "ethereum"),
            ("USDT", "tether"),
            ("SOL", "solana"),
            ("xrp", "ripple"),
            ("BNB", "binancecoin"),
            ("DOGE", "dogecoin"),
            ("AVAX", "avalanche-2"),
            ("TON", "the-open-network"),
        ];

        for (symbol, expected) in cases {
            assert_eq!(resolve_coin_id(symbol), expected, "symbol {}", symbol);
        }
    }

    #[test]
    fn test_resolve_trims_and_lowercases() {
        assert_eq!(resolve_coin_id("  Btc "), "bitcoin");
        assert_eq!(resolve_coin_id("\tMatic\n"), "matic-network");
    }

    #[test]
    fn test_unknown_symbol_passes_through() {
        assert_eq!(resolve_coin_id("WIF"), "wif");
        assert_eq!(resolve_coin_id("UNKNOWN"), "unknown");
        assert_eq!(resolve_coin_id(""), "");
        assert!(!is_known_symbol("WIF"));
    }

    #[test]
    fn test_resolution_ignores_case_and_padding() {
        for symbol in ["BTC", " eth ", "Xvg", "WIF", "pepe ", "  "] {
            assert_eq!(resolve_coin_id(symbol), resolve_coin_id(&normalize_symbol(symbol)));
        }
    }

    #[test]
    fn test_table_has_every_listed_symbol() {
        assert_eq!(COIN_IDS.len(), 43);
        assert!(is_known_symbol("okb"));
        assert!(is_known_symbol("WBTC"));
    }
}
