use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolEvent};
use serde::Serialize;

use super::{read, saturating_u64, transaction};
use crate::chain::{ChainClient, ChainResult, Receipt, TxRequest};

sol! {
    interface IModxLicensedNFT {
        struct LicenseRecord {
            string license;
            uint256 timestamp;
        }

        function mintNFT(string uri, string license) external returns (uint256 tokenId);
        function burn(uint256 tokenId) external;
        function safeTransferFrom(address from, address to, uint256 tokenId) external;
        function currentLicense(uint256 tokenId) external view returns (string license);
        function getLicenseHistory(uint256 tokenId) external view returns (LicenseRecord[] history);
        function ownerOf(uint256 tokenId) external view returns (address owner);

        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseEntry {
    pub license: String,
    pub timestamp: u64,
}

#[derive(Clone)]
pub struct LicensedNftContract {
    chain: Arc<dyn ChainClient>,
    address: Address,
}

impl LicensedNftContract {
    pub fn new(chain: Arc<dyn ChainClient>, address: Address) -> Self {
        Self { chain, address }
    }

    pub fn mint_tx(&self, from: Address, uri: String, license: String) -> TxRequest {
        transaction(from, self.address, IModxLicensedNFT::mintNFTCall { uri, license })
    }

    pub fn burn_tx(&self, from: Address, token_id: U256) -> TxRequest {
        transaction(from, self.address, IModxLicensedNFT::burnCall { tokenId: token_id })
    }

    pub fn transfer_tx(&self, from: Address, to: Address, token_id: U256) -> TxRequest {
        transaction(
            from,
            self.address,
            IModxLicensedNFT::safeTransferFromCall {
                from,
                to,
                tokenId: token_id,
            },
        )
    }

    pub async fn current_license(&self, token_id: U256) -> ChainResult<String> {
        read(
            self.chain.as_ref(),
            self.address,
            IModxLicensedNFT::currentLicenseCall { tokenId: token_id },
        )
        .await
    }

    pub async fn license_history(&self, token_id: U256) -> ChainResult<Vec<LicenseEntry>> {
        let records = read(
            self.chain.as_ref(),
            self.address,
            IModxLicensedNFT::getLicenseHistoryCall { tokenId: token_id },
        )
        .await?;
        Ok(records
            .into_iter()
            .map(|r| LicenseEntry {
                license: r.license,
                timestamp: saturating_u64(r.timestamp),
            })
            .collect())
    }

    pub async fn owner_of(&self, token_id: U256) -> ChainResult<Address> {
        read(
            self.chain.as_ref(),
            self.address,
            IModxLicensedNFT::ownerOfCall { tokenId: token_id },
        )
        .await
    }

    /// Token id of the first ERC-721 `Transfer` this contract emitted in `receipt`.
    pub fn minted_token_id(&self, receipt: &Receipt) -> Option<U256> {
        receipt
            .logs
            .iter()
            .filter(|log| log.address == self.address)
            .filter(|log| log.topics.first() == Some(&IModxLicensedNFT::Transfer::SIGNATURE_HASH))
            .find_map(|log| log.topics.get(3).map(|t| U256::from_be_bytes(t.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChain;
    use crate::chain::Log;
    use alloy_primitives::{Bytes, B256};
    use alloy_sol_types::SolValue;

    fn contract(chain: Arc<MockChain>) -> LicensedNftContract {
        LicensedNftContract::new(chain, Address::repeat_byte(0x77))
    }

    #[test]
    fn test_minted_token_id_from_receipt() {
        let nft = contract(Arc::new(MockChain::new()));
        let transfer = Log {
            address: Address::repeat_byte(0x77),
            topics: vec![
                IModxLicensedNFT::Transfer::SIGNATURE_HASH,
                B256::ZERO,
                Address::repeat_byte(1).into_word(),
                B256::from(U256::from(42u64).to_be_bytes::<32>()),
            ],
            data: Bytes::new(),
            block_number: 10,
            tx_hash: B256::ZERO,
            log_index: 0,
        };
        let foreign = Log {
            address: Address::repeat_byte(0x99),
            ..transfer.clone()
        };
        let receipt = Receipt {
            hash: B256::ZERO,
            block_number: 10,
            logs: vec![foreign, transfer],
        };
        assert_eq!(nft.minted_token_id(&receipt), Some(U256::from(42u64)));
    }

    #[tokio::test]
    async fn test_license_history_decoding() {
        let chain = Arc::new(MockChain::new());
        chain.on::<IModxLicensedNFT::getLicenseHistoryCall>(Address::repeat_byte(0x77), |_| {
            let history = vec![
                IModxLicensedNFT::LicenseRecord {
                    license: "CC-BY".to_string(),
                    timestamp: U256::from(1_700_000_000u64),
                },
                IModxLicensedNFT::LicenseRecord {
                    license: "MIT".to_string(),
                    timestamp: U256::from(1_700_086_400u64),
                },
            ];
            Ok((history,).abi_encode_params())
        });

        let entries = contract(chain).license_history(U256::from(1u64)).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].license, "MIT");
        assert_eq!(entries[0].timestamp, 1_700_000_000);
    }
}
