use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;

use super::{read, transaction};
use crate::chain::{ChainClient, ChainResult, TxRequest};

sol! {
    interface IPancakeRouter {
        function getAmountsOut(uint256 amountIn, address[] path) external view returns (uint256[] amounts);
        function swapExactTokensForETHSupportingFeeOnTransferTokens(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) external;
        function swapExactETHForTokensSupportingFeeOnTransferTokens(uint256 amountOutMin, address[] path, address to, uint256 deadline) external payable;
        function swapExactTokensForTokensSupportingFeeOnTransferTokens(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) external;
        function addLiquidityETH(address token, uint256 amountTokenDesired, uint256 amountTokenMin, uint256 amountETHMin, address to, uint256 deadline) external payable returns (uint256 amountToken, uint256 amountETH, uint256 liquidity);
        function removeLiquidityETH(address token, uint256 liquidity, uint256 amountTokenMin, uint256 amountETHMin, address to, uint256 deadline) external returns (uint256 amountToken, uint256 amountETH);
    }

    interface IPancakeFactory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    interface IPancakePair {
        // uint112 reserves widened so they decode straight into U256
        function getReserves() external view returns (uint256 reserve0, uint256 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address token);
        function totalSupply() external view returns (uint256 supply);
        function balanceOf(address owner) external view returns (uint256 balance);
    }
}

/// Which side of a swap is the chain's native currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapLeg {
    NativeIn,
    NativeOut,
    TokenToToken,
}

#[derive(Clone)]
pub struct RouterContract {
    chain: Arc<dyn ChainClient>,
    address: Address,
}

impl RouterContract {
    pub fn new(chain: Arc<dyn ChainClient>, address: Address) -> Self {
        Self { chain, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Router quote; fails with the router's revert for unusable paths.
    pub async fn get_amounts_out(&self, amount_in: U256, path: &[Address]) -> ChainResult<Vec<U256>> {
        read(
            self.chain.as_ref(),
            self.address,
            IPancakeRouter::getAmountsOutCall {
                amountIn: amount_in,
                path: path.to_vec(),
            },
        )
        .await
    }

    pub fn swap_tx(
        &self,
        from: Address,
        leg: SwapLeg,
        amount_in: U256,
        amount_out_min: U256,
        path: Vec<Address>,
        deadline: u64,
    ) -> TxRequest {
        let deadline = U256::from(deadline);
        match leg {
            SwapLeg::NativeIn => transaction(
                from,
                self.address,
                IPancakeRouter::swapExactETHForTokensSupportingFeeOnTransferTokensCall {
                    amountOutMin: amount_out_min,
                    path,
                    to: from,
                    deadline,
                },
            )
            .with_value(amount_in),
            SwapLeg::NativeOut => transaction(
                from,
                self.address,
                IPancakeRouter::swapExactTokensForETHSupportingFeeOnTransferTokensCall {
                    amountIn: amount_in,
                    amountOutMin: amount_out_min,
                    path,
                    to: from,
                    deadline,
                },
            ),
            SwapLeg::TokenToToken => transaction(
                from,
                self.address,
                IPancakeRouter::swapExactTokensForTokensSupportingFeeOnTransferTokensCall {
                    amountIn: amount_in,
                    amountOutMin: amount_out_min,
                    path,
                    to: from,
                    deadline,
                },
            ),
        }
    }

    /// Add `token_amount` of `token` paired with `native_amount`, zero minimums.
    pub fn add_liquidity_native_tx(
        &self,
        from: Address,
        token: Address,
        token_amount: U256,
        native_amount: U256,
        deadline: u64,
    ) -> TxRequest {
        transaction(
            from,
            self.address,
            IPancakeRouter::addLiquidityETHCall {
                token,
                amountTokenDesired: token_amount,
                amountTokenMin: U256::ZERO,
                amountETHMin: U256::ZERO,
                to: from,
                deadline: U256::from(deadline),
            },
        )
        .with_value(native_amount)
    }

    pub fn remove_liquidity_native_tx(
        &self,
        from: Address,
        token: Address,
        liquidity: U256,
        deadline: u64,
    ) -> TxRequest {
        transaction(
            from,
            self.address,
            IPancakeRouter::removeLiquidityETHCall {
                token,
                liquidity,
                amountTokenMin: U256::ZERO,
                amountETHMin: U256::ZERO,
                to: from,
                deadline: U256::from(deadline),
            },
        )
    }
}

#[derive(Clone)]
pub struct FactoryContract {
    chain: Arc<dyn ChainClient>,
    address: Address,
}

impl FactoryContract {
    pub fn new(chain: Arc<dyn ChainClient>, address: Address) -> Self {
        Self { chain, address }
    }

    /// Pair address, or the zero address when no pair exists.
    pub async fn get_pair(&self, token_a: Address, token_b: Address) -> ChainResult<Address> {
        read(
            self.chain.as_ref(),
            self.address,
            IPancakeFactory::getPairCall {
                tokenA: token_a,
                tokenB: token_b,
            },
        )
        .await
    }
}

#[derive(Clone)]
pub struct PairContract {
    chain: Arc<dyn ChainClient>,
    address: Address,
}

impl PairContract {
    pub fn new(chain: Arc<dyn ChainClient>, address: Address) -> Self {
        Self { chain, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn reserves(&self) -> ChainResult<(U256, U256)> {
        let raw = read(self.chain.as_ref(), self.address, IPancakePair::getReservesCall).await?;
        Ok((raw.reserve0, raw.reserve1))
    }

    pub async fn token0(&self) -> ChainResult<Address> {
        read(self.chain.as_ref(), self.address, IPancakePair::token0Call).await
    }

    pub async fn total_supply(&self) -> ChainResult<U256> {
        read(self.chain.as_ref(), self.address, IPancakePair::totalSupplyCall).await
    }

    pub async fn balance_of(&self, owner: Address) -> ChainResult<U256> {
        read(self.chain.as_ref(), self.address, IPancakePair::balanceOfCall { owner }).await
    }
}
