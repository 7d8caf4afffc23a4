pub mod history;
pub mod liquidity;
pub mod nft;
pub mod staking;
pub mod swap;
pub mod token;
