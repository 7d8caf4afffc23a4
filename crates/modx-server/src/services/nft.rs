use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use modx_core::CoreError;
use serde::Serialize;

use crate::chain::ChainClient;
use crate::contracts::nft::{LicenseEntry, LicensedNftContract};
use crate::error::{AppError, AppResult};
use crate::pending::{ActionKey, TxTracker};

#[derive(Debug, Clone, Serialize)]
pub struct NftDetails {
    pub token_id: U256,
    pub owner: Address,
    pub current_license: String,
    pub license_history: Vec<LicenseEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MintedNft {
    pub token_id: Option<U256>,
    pub hash: B256,
}

/// License-tagged NFTs; every call fails with `Config` when no contract is set.
#[derive(Clone)]
pub struct NftService {
    contract: Option<LicensedNftContract>,
    tracker: TxTracker,
}

impl NftService {
    pub fn new(chain: Arc<dyn ChainClient>, tracker: TxTracker, address: Option<Address>) -> Self {
        Self {
            contract: address.map(|a| LicensedNftContract::new(chain, a)),
            tracker,
        }
    }

    fn contract(&self) -> AppResult<&LicensedNftContract> {
        self.contract
            .as_ref()
            .ok_or_else(|| AppError::Config("No licensed NFT contract configured (contracts.nft)".to_string()))
    }

    pub async fn mint(&self, user: Address, uri: &str, license: &str) -> AppResult<MintedNft> {
        let contract = self.contract()?;
        if uri.trim().is_empty() {
            return Err(CoreError::MissingField("uri".to_string()).into());
        }
        let guard = self.tracker.begin(ActionKey::Nft)?;
        tracing::info!(account = %user, license = %license, "Minting licensed NFT");
        let receipt = self
            .tracker
            .submit(&guard, "mint", contract.mint_tx(user, uri.to_string(), license.to_string()))
            .await?;

        let token_id = contract.minted_token_id(&receipt);
        if token_id.is_none() {
            tracing::warn!(hash = %receipt.hash, "Mint receipt carried no Transfer event");
        }
        Ok(MintedNft {
            token_id,
            hash: receipt.hash,
        })
    }

    pub async fn burn(&self, user: Address, token_id: U256) -> AppResult<B256> {
        let contract = self.contract()?;
        let guard = self.tracker.begin(ActionKey::Nft)?;
        tracing::info!(account = %user, token_id = %token_id, "Burning NFT");
        let receipt = self.tracker.submit(&guard, "burn", contract.burn_tx(user, token_id)).await?;
        Ok(receipt.hash)
    }

    pub async fn transfer(&self, user: Address, token_id: U256, to: Address) -> AppResult<B256> {
        let contract = self.contract()?;
        let guard = self.tracker.begin(ActionKey::Nft)?;
        tracing::info!(account = %user, token_id = %token_id, to = %to, "Transferring NFT");
        let receipt = self
            .tracker
            .submit(&guard, "transfer", contract.transfer_tx(user, to, token_id))
            .await?;
        Ok(receipt.hash)
    }

    pub async fn details(&self, token_id: U256) -> AppResult<NftDetails> {
        let contract = self.contract()?;
        let (owner, current_license, license_history) = tokio::try_join!(
            contract.owner_of(token_id),
            contract.current_license(token_id),
            contract.license_history(token_id)
        )?;
        Ok(NftDetails {
            token_id,
            owner,
            current_license,
            license_history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChain;
    use crate::chain::Log;
    use crate::contracts::nft::IModxLicensedNFT;
    use alloy_primitives::Bytes;
    use alloy_sol_types::{SolCall, SolEvent, SolValue};

    const NFT: Address = Address::repeat_byte(0x77);

    #[tokio::test]
    async fn test_unconfigured_contract() {
        let chain = Arc::new(MockChain::new());
        let nft = NftService::new(chain.clone(), TxTracker::new(chain), None);
        assert!(matches!(nft.details(U256::from(1u64)).await, Err(AppError::Config(_))));
        assert!(matches!(nft.burn(Address::ZERO, U256::from(1u64)).await, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_mint_returns_token_id() {
        let chain = Arc::new(MockChain::new());
        let user = Address::repeat_byte(1);
        chain.receipt_logs_for::<IModxLicensedNFT::mintNFTCall>(vec![Log {
            address: NFT,
            topics: vec![
                IModxLicensedNFT::Transfer::SIGNATURE_HASH,
                B256::ZERO,
                user.into_word(),
                B256::from(U256::from(7u64).to_be_bytes::<32>()),
            ],
            data: Bytes::new(),
            block_number: 0,
            tx_hash: B256::ZERO,
            log_index: 0,
        }]);
        let nft = NftService::new(chain.clone(), TxTracker::new(chain.clone()), Some(NFT));

        let minted = nft.mint(user, "ipfs://meta.json", "CC-BY-4.0").await.unwrap();
        assert_eq!(minted.token_id, Some(U256::from(7u64)));
        let call = IModxLicensedNFT::mintNFTCall::abi_decode(&chain.sent()[0].data).unwrap();
        assert_eq!(call.license, "CC-BY-4.0");
    }

    #[tokio::test]
    async fn test_details_reads_owner_and_licenses() {
        let chain = Arc::new(MockChain::new());
        let owner = Address::repeat_byte(3);
        chain.on::<IModxLicensedNFT::ownerOfCall>(NFT, move |_| Ok(owner.abi_encode()));
        chain.on::<IModxLicensedNFT::currentLicenseCall>(NFT, |_| Ok(("MIT".to_string(),).abi_encode_params()));
        chain.on::<IModxLicensedNFT::getLicenseHistoryCall>(NFT, |_| {
            let history: Vec<IModxLicensedNFT::LicenseRecord> = vec![IModxLicensedNFT::LicenseRecord {
                license: "MIT".to_string(),
                timestamp: U256::from(1_700_000_000u64),
            }];
            Ok((history,).abi_encode_params())
        });
        let nft = NftService::new(chain.clone(), TxTracker::new(chain), Some(NFT));

        let details = nft.details(U256::from(5u64)).await.unwrap();
        assert_eq!(details.owner, owner);
        assert_eq!(details.current_license, "MIT");
        assert_eq!(details.license_history.len(), 1);
    }
}
