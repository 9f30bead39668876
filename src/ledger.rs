//! On-chain raffle contract client
//!
//! Submits raffle transactions through alloy, waits for confirmation, and
//! decodes the receipt logs into the typed [`LedgerReceipt`] model.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, U256};
use alloy::providers::ProviderBuilder;
use alloy::rpc::types::{Log, TransactionReceipt};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info};

use crate::domain::{EventKind, EventValue, LedgerEvent, LedgerReceipt, RaffleId};
use crate::infra::{LedgerClient, RaffleError, Result};

// Generate contract bindings
sol! {
    #[sol(rpc)]
    interface IRaffleManager {
        event RaffleCreated(
            uint256 indexed raffleId,
            address indexed owner,
            uint256 numWinners,
            uint256 prizeAmount,
            uint256 endTime
        );

        event RaffleEntered(uint256 indexed raffleId, address indexed participant);

        event WinnersRevealed(uint256 indexed raffleId, address[] winners);

        event NFTDeployed(uint256 indexed raffleId, address nftContract);

        event LosersMinted(uint256 indexed raffleId, uint256 count);

        function createRaffle(uint256 numWinners, uint256 prizeAmount, uint256 endTime)
            external
            payable
            returns (uint256);

        function enterRaffle(uint256 raffleId) external;

        function revealWinners(uint256 raffleId) external;

        function getParticipants(uint256 raffleId) external view returns (address[] memory);

        function getWinners(uint256 raffleId) external view returns (address[] memory);

        function deployNFTForRaffle(
            uint256 raffleId,
            string name,
            string symbol,
            string baseURI
        ) external;

        function mintNFTToLosers(uint256 raffleId) external;
    }
}

/// Ledger client configuration
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Raffle contract address
    pub contract_address: Address,
    /// Owner key used for create/reveal/NFT transactions
    pub owner_private_key: String,
    /// Chain ID
    pub chain_id: u64,
}

impl LedgerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Option<Self> {
        let rpc_url = std::env::var("RAFFLE_RPC_URL").ok()?;
        let contract_address = std::env::var("RAFFLE_CONTRACT_ADDRESS")
            .ok()
            .and_then(|s| s.parse().ok())?;
        let owner_private_key = std::env::var("RAFFLE_OWNER_PRIVATE_KEY").ok()?;
        let chain_id = std::env::var("RAFFLE_CHAIN_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(31337);

        Some(Self {
            rpc_url,
            contract_address,
            owner_private_key,
            chain_id,
        })
    }
}

/// Alloy-backed client for the raffle contract
pub struct AlloyLedgerClient {
    config: LedgerConfig,
}

impl AlloyLedgerClient {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    fn rpc_url(&self) -> Result<Url> {
        self.config
            .rpc_url
            .parse()
            .map_err(|e| RaffleError::Internal(format!("Invalid RPC URL: {}", e)))
    }

    fn owner_signer(&self) -> Result<PrivateKeySigner> {
        self.config
            .owner_private_key
            .parse()
            .map_err(|e| RaffleError::Internal(format!("Invalid owner private key: {}", e)))
    }

    fn participant_signer(key: &str) -> Result<PrivateKeySigner> {
        key.trim()
            .parse()
            .map_err(|_| RaffleError::Validation("Invalid participant credential".to_string()))
    }

    /// Decode one raw log into a typed event, if it belongs to the contract ABI.
    fn decode_log(log: &Log) -> Option<LedgerEvent> {
        if let Ok(decoded) = log.log_decode::<IRaffleManager::RaffleCreated>() {
            let e = decoded.inner.data;
            return Some(
                LedgerEvent::new(EventKind::RaffleCreated)
                    .with_named("raffleId", EventValue::Uint(e.raffleId))
                    .with_named("owner", EventValue::Address(e.owner.to_string()))
                    .with_named("numWinners", EventValue::Uint(e.numWinners))
                    .with_named("prizeAmount", EventValue::Uint(e.prizeAmount))
                    .with_named("endTime", EventValue::Uint(e.endTime)),
            );
        }
        if let Ok(decoded) = log.log_decode::<IRaffleManager::RaffleEntered>() {
            let e = decoded.inner.data;
            return Some(
                LedgerEvent::new(EventKind::RaffleEntered)
                    .with_named("raffleId", EventValue::Uint(e.raffleId))
                    .with_named("participant", EventValue::Address(e.participant.to_string())),
            );
        }
        if let Ok(decoded) = log.log_decode::<IRaffleManager::WinnersRevealed>() {
            let e = decoded.inner.data;
            let winners = e.winners.iter().map(|w| w.to_string()).collect();
            return Some(
                LedgerEvent::new(EventKind::WinnersRevealed)
                    .with_named("raffleId", EventValue::Uint(e.raffleId))
                    .with_named("winners", EventValue::AddressList(winners)),
            );
        }
        if let Ok(decoded) = log.log_decode::<IRaffleManager::NFTDeployed>() {
            let e = decoded.inner.data;
            return Some(
                LedgerEvent::new(EventKind::NftDeployed)
                    .with_named("raffleId", EventValue::Uint(e.raffleId))
                    .with_named("nftContract", EventValue::Address(e.nftContract.to_string())),
            );
        }
        if let Ok(decoded) = log.log_decode::<IRaffleManager::LosersMinted>() {
            let e = decoded.inner.data;
            return Some(
                LedgerEvent::new(EventKind::LosersMinted)
                    .with_named("raffleId", EventValue::Uint(e.raffleId))
                    .with_named("count", EventValue::Uint(e.count)),
            );
        }
        None
    }

    fn to_ledger_receipt(receipt: &TransactionReceipt) -> Result<LedgerReceipt> {
        let tx_hash = receipt.transaction_hash.to_string();
        if !receipt.status() {
            return Err(RaffleError::Ledger(format!("Transaction {} reverted", tx_hash)));
        }

        let mut out = LedgerReceipt::new(tx_hash).with_from(receipt.from.to_string());
        out.block_number = receipt.block_number;

        for log in receipt.inner.logs() {
            match Self::decode_log(log) {
                Some(event) => out.events.push(event),
                None => debug!(address = %log.inner.address, "Skipping undecodable log"),
            }
        }

        Ok(out)
    }
}

#[async_trait]
impl LedgerClient for AlloyLedgerClient {
    async fn create_raffle(
        &self,
        num_winners: u32,
        prize_per_winner: U256,
        end_time: u64,
        value: U256,
    ) -> Result<LedgerReceipt> {
        info!(num_winners, end_time, %value, "Submitting createRaffle");

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(self.owner_signer()?))
            .on_http(self.rpc_url()?);

        let contract = IRaffleManager::new(self.config.contract_address, &provider);

        let call = contract
            .createRaffle(
                U256::from(num_winners),
                prize_per_winner,
                U256::from(end_time),
            )
            .value(value);

        let pending = call
            .send()
            .await
            .map_err(|e| RaffleError::Ledger(format!("Failed to send transaction: {}", e)))?;

        let tx_hash = pending.tx_hash().to_string();
        info!(%tx_hash, "Transaction sent");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| RaffleError::Unconfirmed {
                tx_hash,
                reason: e.to_string(),
            })?;

        Self::to_ledger_receipt(&receipt)
    }

    async fn enter_raffle(
        &self,
        raffle_id: RaffleId,
        participant_key: &str,
    ) -> Result<LedgerReceipt> {
        let signer = Self::participant_signer(participant_key)?;
        info!(raffle_id, participant = %signer.address(), "Submitting enterRaffle");

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(self.rpc_url()?);

        let contract = IRaffleManager::new(self.config.contract_address, &provider);

        let call = contract.enterRaffle(U256::from(raffle_id));

        let pending = call
            .send()
            .await
            .map_err(|e| RaffleError::Ledger(format!("Failed to send transaction: {}", e)))?;

        let tx_hash = pending.tx_hash().to_string();
        info!(%tx_hash, "Transaction sent");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| RaffleError::Unconfirmed {
                tx_hash,
                reason: e.to_string(),
            })?;

        Self::to_ledger_receipt(&receipt)
    }

    async fn reveal_winners(&self, raffle_id: RaffleId) -> Result<LedgerReceipt> {
        info!(raffle_id, "Submitting revealWinners");

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(self.owner_signer()?))
            .on_http(self.rpc_url()?);

        let contract = IRaffleManager::new(self.config.contract_address, &provider);

        let call = contract.revealWinners(U256::from(raffle_id));

        let pending = call
            .send()
            .await
            .map_err(|e| RaffleError::Ledger(format!("Failed to send transaction: {}", e)))?;

        let tx_hash = pending.tx_hash().to_string();
        info!(%tx_hash, "Transaction sent");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| RaffleError::Unconfirmed {
                tx_hash,
                reason: e.to_string(),
            })?;

        Self::to_ledger_receipt(&receipt)
    }

    async fn participants(&self, raffle_id: RaffleId) -> Result<Vec<String>> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url()?);
        let contract = IRaffleManager::new(self.config.contract_address, &provider);

        let result = contract
            .getParticipants(U256::from(raffle_id))
            .call()
            .await
            .map_err(|e| RaffleError::Ledger(format!("Contract call failed: {}", e)))?;

        Ok(result._0.iter().map(|a| a.to_string()).collect())
    }

    async fn winners(&self, raffle_id: RaffleId) -> Result<Vec<String>> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url()?);
        let contract = IRaffleManager::new(self.config.contract_address, &provider);

        let result = contract
            .getWinners(U256::from(raffle_id))
            .call()
            .await
            .map_err(|e| RaffleError::Ledger(format!("Contract call failed: {}", e)))?;

        Ok(result._0.iter().map(|a| a.to_string()).collect())
    }

    async fn deploy_nft(
        &self,
        raffle_id: RaffleId,
        name: &str,
        symbol: &str,
        base_uri: &str,
    ) -> Result<LedgerReceipt> {
        info!(raffle_id, name, symbol, "Submitting deployNFTForRaffle");

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(self.owner_signer()?))
            .on_http(self.rpc_url()?);

        let contract = IRaffleManager::new(self.config.contract_address, &provider);

        let call = contract
            .deployNFTForRaffle(
                U256::from(raffle_id),
                name.to_string(),
                symbol.to_string(),
                base_uri.to_string(),
            );

        let pending = call
            .send()
            .await
            .map_err(|e| RaffleError::Ledger(format!("Failed to send transaction: {}", e)))?;

        let tx_hash = pending.tx_hash().to_string();
        info!(%tx_hash, "Transaction sent");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| RaffleError::Unconfirmed {
                tx_hash,
                reason: e.to_string(),
            })?;

        Self::to_ledger_receipt(&receipt)
    }

    async fn mint_to_losers(&self, raffle_id: RaffleId) -> Result<LedgerReceipt> {
        info!(raffle_id, "Submitting mintNFTToLosers");

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(self.owner_signer()?))
            .on_http(self.rpc_url()?);

        let contract = IRaffleManager::new(self.config.contract_address, &provider);

        let call = contract.mintNFTToLosers(U256::from(raffle_id));

        let pending = call
            .send()
            .await
            .map_err(|e| RaffleError::Ledger(format!("Failed to send transaction: {}", e)))?;

        let tx_hash = pending.tx_hash().to_string();
        info!(%tx_hash, "Transaction sent");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| RaffleError::Unconfirmed {
                tx_hash,
                reason: e.to_string(),
            })?;

        Self::to_ledger_receipt(&receipt)
    }
}
