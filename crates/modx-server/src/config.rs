use alloy_primitives::Address;
use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use modx_core::TokenInfo;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub chain: ChainConfig,
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
    pub refresh: RefreshConfig,
    pub history: HistoryConfig,
    pub price_feed: PriceFeedConfig,
    pub swap: SwapConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub confirm_timeout_secs: u64,
    pub receipt_poll_ms: u64,
}

/// Contract addresses as written in config; see [`ContractsConfig::parse`].
#[derive(Debug, Deserialize, Clone)]
pub struct ContractsConfig {
    pub token: String,
    pub staking: String,
    pub router: String,
    pub factory: String,
    pub wrapped_native: String,
    #[serde(default)]
    pub nft: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contracts {
    /// The staking token (modX)
    pub token: Address,
    pub staking: Address,
    pub router: Address,
    pub factory: Address,
    pub wrapped_native: Address,
    pub nft: Option<Address>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    pub symbol: String,
    pub name: String,
    pub address: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    18
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    pub positions_secs: u64,
    pub balances_secs: u64,
    pub coalesce_window_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    pub chunk_size: u64,
    #[serde(default)]
    pub deployment_block: Option<u64>,
    pub lookback_blocks: u64,
    pub chain_limit: usize,
    pub swap_limit: usize,
    pub liquidity_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PriceFeedConfig {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SwapConfig {
    pub slippage_percent: Decimal,
    pub deadline_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub path: Option<String>,
}

/// Tokens offered when the config does not list any (BSC testnet deployment).
const BUILTIN_TOKENS: [(&str, &str, &str); 8] = [
    ("modX", "modX Token", "0xB6322eD8561604Ca2A1b9c17e4d02B957EB242fe"),
    ("BNB", "Binance Coin", "0x0000000000000000000000000000000000000000"),
    ("USDC", "USD Coin", "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d"),
    ("CAKE", "PancakeSwap Token", "0x0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82"),
    ("WETH", "Wrapped Ethereum", "0x2170Ed0880ac9A755fd29B2688956BD959F933F8"),
    ("ADA", "Cardano", "0x3EE2200Efb3400fAbB9AacF31297cBdD1d435D47"),
    ("DOT", "Polkadot", "0x7083609fCE4d1d8Dc0C979AAb8c869Ea2C873402"),
    ("LINK", "Chainlink", "0xF8A0BF9cF54Bb92F17374d9e9A321E6a111a51bD"),
];

fn parse_address(field: &str, value: &str) -> AppResult<Address> {
    Address::from_str(value.trim())
        .map_err(|e| AppError::Config(format!("{} is not a valid address ({}): {}", field, value, e)))
}

impl ContractsConfig {
    pub fn parse(&self) -> AppResult<Contracts> {
        Ok(Contracts {
            token: parse_address("contracts.token", &self.token)?,
            staking: parse_address("contracts.staking", &self.staking)?,
            router: parse_address("contracts.router", &self.router)?,
            factory: parse_address("contracts.factory", &self.factory)?,
            wrapped_native: parse_address("contracts.wrapped_native", &self.wrapped_native)?,
            nft: match self.nft.as_deref().map(str::trim) {
                Some(nft) if !nft.is_empty() => Some(parse_address("contracts.nft", nft)?),
                _ => None,
            },
        })
    }
}

impl AppConfig {
    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("chain.rpc_url", "https://data-seed-prebsc-1-s1.binance.org:8545/")?
            .set_default("chain.chain_id", 97)?
            .set_default("chain.confirm_timeout_secs", 180)?
            .set_default("chain.receipt_poll_ms", 1500)?
            .set_default("contracts.token", "0xB6322eD8561604Ca2A1b9c17e4d02B957EB242fe")?
            .set_default("contracts.staking", "0xab3544A6f2aF70064c5B5D3f0E74323DB9a81945")?
            .set_default("contracts.router", "0x9ac64cc6e4415144c455bd8e4837fea55603e5c3")?
            .set_default("contracts.factory", "0x6725F303b657a9451d8BA641348b6761A6CC7a17")?
            .set_default("contracts.wrapped_native", "0xae13d989daC2f0dEbFf460aC112a837C89BAa7cd")?
            .set_default("refresh.positions_secs", 60)?
            .set_default("refresh.balances_secs", 30)?
            .set_default("refresh.coalesce_window_ms", 2000)?
            .set_default("history.chunk_size", 5000)?
            .set_default("history.lookback_blocks", 50000)?
            .set_default("history.chain_limit", 10)?
            .set_default("history.swap_limit", 10)?
            .set_default("history.liquidity_limit", 20)?
            .set_default("price_feed.url", "https://api.binance.com/api/v3/ticker/24hr")?
            .set_default("price_feed.timeout_secs", 10)?
            .set_default("swap.slippage_percent", "0.5")?
            .set_default("swap.deadline_secs", 600)
    }

    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::builder()?
            // Load from config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (MODX__CHAIN__RPC_URL, etc.)
            .add_source(
                Environment::with_prefix("MODX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Built-in defaults only, ignoring files and environment.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Configured token list, or the built-in one when none is configured.
    pub fn token_registry(&self) -> AppResult<Vec<TokenInfo>> {
        if self.tokens.is_empty() {
            return BUILTIN_TOKENS
                .iter()
                .map(|(symbol, name, address)| {
                    Ok(TokenInfo {
                        symbol: symbol.to_string(),
                        name: name.to_string(),
                        address: parse_address(symbol, address)?,
                        decimals: 18,
                    })
                })
                .collect();
        }

        self.tokens
            .iter()
            .map(|t| {
                Ok(TokenInfo {
                    symbol: t.symbol.clone(),
                    name: t.name.clone(),
                    address: parse_address(&format!("tokens.{}", t.symbol), &t.address)?,
                    decimals: t.decimals,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_deserialize() {
        let config = AppConfig::defaults().unwrap();
        assert_eq!(config.chain.chain_id, 97);
        assert_eq!(config.history.chunk_size, 5000);
        assert_eq!(config.history.swap_limit, 10);
        assert_eq!(config.history.liquidity_limit, 20);
        assert_eq!(config.swap.slippage_percent, dec!(0.5));
        assert!(config.history.deployment_block.is_none());
        assert!(config.store.path.is_none());
    }

    #[test]
    fn test_contract_addresses_parse() {
        let contracts = AppConfig::defaults().unwrap().contracts.parse().unwrap();
        assert!(contracts.nft.is_none());
        assert_ne!(contracts.router, Address::ZERO);
    }

    #[test]
    fn test_bad_address_is_config_error() {
        let mut config = AppConfig::defaults().unwrap();
        config.contracts.router = "0x1234".to_string();
        assert!(matches!(config.contracts.parse(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_builtin_token_registry() {
        let tokens = AppConfig::defaults().unwrap().token_registry().unwrap();
        assert_eq!(tokens.len(), 8);
        assert!(tokens.iter().find(|t| t.symbol == "BNB").unwrap().is_native());
        assert!(tokens.iter().all(|t| t.decimals == 18));
    }
}
