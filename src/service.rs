//! Raffle reconciliation service
//!
//! For each user-facing action: call the ledger, pull the canonical outcome
//! out of the confirmed receipt, then apply the matching store mutation.
//! The ledger is authoritative for custody and winner selection; the store
//! is made to agree with it.

use std::sync::Arc;

use alloy::primitives::utils::parse_ether;
use alloy::primitives::U256;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::domain::{
    EventKind, Participant, Raffle, RaffleId, TicketClaim, TicketId, User, MAX_STORED_RAFFLE_ID,
};
use crate::infra::{ContentStore, LedgerClient, RaffleError, RaffleStore, Result};
use crate::ticketing::{issue_tickets, IssuedTicket, TicketEncoder};

/// Default upper bound on tickets generated by one request.
pub const DEFAULT_MAX_TICKETS_PER_REQUEST: u64 = 1000;

/// Service tunables
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// When set, raffles are created on-chain ending this many seconds from now.
    pub end_time_override_secs: Option<u64>,
    pub max_tickets_per_request: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            end_time_override_secs: None,
            max_tickets_per_request: DEFAULT_MAX_TICKETS_PER_REQUEST,
        }
    }
}

/// Input for [`RaffleService::create_raffle`].
#[derive(Debug, Clone)]
pub struct NewRaffle {
    pub num_winners: u32,
    /// Prize per winner, decimal ether.
    pub prize_amount: String,
    pub end_time: u64,
    pub owner_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRaffle {
    pub raffle_id: RaffleId,
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaffleEntry {
    pub tx_hash: String,
    pub participant: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedWinners {
    pub tx_hash: String,
    pub raffle_id: RaffleId,
    pub winners: Vec<String>,
}

/// Tickets minted by one generation request.
#[derive(Debug, Clone)]
pub struct TicketBatch {
    pub tickets_issued: u64,
    pub entries_redeemed: u64,
    pub tickets: Vec<IssuedTicket>,
}

/// Image asset for an NFT collection.
#[derive(Debug, Clone)]
pub struct NftImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NftDeployment {
    pub tx_hash: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
}

/// Orchestrates ledger calls and store mutations.
pub struct RaffleService {
    ledger: Arc<dyn LedgerClient>,
    store: Arc<dyn RaffleStore>,
    encoder: Arc<dyn TicketEncoder>,
    content: Option<Arc<dyn ContentStore>>,
    config: ServiceConfig,
}

impl RaffleService {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        store: Arc<dyn RaffleStore>,
        encoder: Arc<dyn TicketEncoder>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            ledger,
            store,
            encoder,
            content: None,
            config,
        }
    }

    /// Attach the content store used for NFT images.
    pub fn with_content_store(mut self, content: Arc<dyn ContentStore>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn store(&self) -> &Arc<dyn RaffleStore> {
        &self.store
    }

    /// Create a raffle on-chain, funded with `prize × winners`, then persist it.
    #[instrument(skip(self, input), fields(num_winners = input.num_winners))]
    pub async fn create_raffle(&self, input: NewRaffle) -> Result<CreatedRaffle> {
        if input.num_winners == 0 {
            return Err(RaffleError::Validation(
                "numWinners must be at least 1".into(),
            ));
        }
        let owner = input.owner_address.trim();
        if owner.is_empty() {
            return Err(RaffleError::Validation("ownerAddress is required".into()));
        }
        let prize_amount = input.prize_amount.trim();
        let prize_per_winner = parse_prize(prize_amount)?;
        let value = prize_per_winner
            .checked_mul(U256::from(input.num_winners))
            .ok_or_else(|| RaffleError::Validation("prizeAmount too large".into()))?;

        let chain_end_time = match self.config.end_time_override_secs {
            Some(secs) => unix_now().saturating_add(secs),
            None => input.end_time,
        };

        let receipt = self
            .ledger
            .create_raffle(input.num_winners, prize_per_winner, chain_end_time, value)
            .await?;

        let raffle_id = receipt
            .created_raffle_id()
            .ok_or_else(|| RaffleError::event_not_found(&EventKind::RaffleCreated))?;
        if raffle_id > MAX_STORED_RAFFLE_ID {
            warn!(
                raffle_id,
                tx_hash = %receipt.tx_hash,
                "Raffle confirmed on-chain with an id the store cannot key on"
            );
            return Err(RaffleError::Ledger(format!(
                "Raffle id {raffle_id} is out of the supported range"
            )));
        }

        let raffle = Raffle::new(
            raffle_id,
            owner,
            prize_amount,
            input.num_winners,
            input.end_time,
        );
        if let Err(e) = self.store.insert_raffle(&raffle).await {
            warn!(
                raffle_id,
                tx_hash = %receipt.tx_hash,
                error = %e,
                "Raffle confirmed on-chain but not persisted"
            );
            return Err(e);
        }

        info!(raffle_id, tx_hash = %receipt.tx_hash, "Raffle created");
        Ok(CreatedRaffle {
            raffle_id,
            tx_hash: receipt.tx_hash,
        })
    }

    /// Redeem a ticket into an on-chain raffle entry.
    ///
    /// The ticket is claimed before the ledger is touched, so a used or
    /// unknown ticket never reaches the chain. A ledger call that failed
    /// before broadcast releases the claim; an unconfirmed broadcast keeps it.
    #[instrument(skip(self, ticket_id, participant_key), fields(ticket_id = %ticket_id))]
    pub async fn enter_raffle(
        &self,
        raffle_id: RaffleId,
        ticket_id: &TicketId,
        participant_key: &str,
    ) -> Result<RaffleEntry> {
        if participant_key.trim().is_empty() {
            return Err(RaffleError::Validation(
                "participantCredential is required".into(),
            ));
        }

        let ticket = match self
            .store
            .claim_ticket(ticket_id, raffle_id, Utc::now())
            .await?
        {
            TicketClaim::Claimed(ticket) => ticket,
            TicketClaim::AlreadyUsed => return Err(RaffleError::TicketAlreadyUsed),
            TicketClaim::NotFound => return Err(RaffleError::TicketNotFound),
        };

        let receipt = match self.ledger.enter_raffle(raffle_id, participant_key).await {
            Ok(receipt) => receipt,
            Err(e) if e.may_have_landed() => {
                warn!(
                    raffle_id,
                    error = %e,
                    "Entry submitted but unconfirmed; ticket stays claimed"
                );
                return Err(e);
            }
            Err(e) => {
                if let Err(release_err) = self.store.release_ticket(ticket_id, raffle_id).await {
                    warn!(error = %release_err, "Failed to release ticket claim");
                }
                return Err(e);
            }
        };

        // Receipt sender first, then the wallet the ticket was issued to.
        let Some(address) = receipt.from.clone().or(ticket.user_address) else {
            warn!(
                raffle_id,
                tx_hash = %receipt.tx_hash,
                "Entry confirmed on-chain without a resolvable participant address"
            );
            return Err(RaffleError::Ledger(
                "participant address unavailable in receipt".into(),
            ));
        };

        let participant = Participant::new(
            raffle_id,
            ticket_id.clone(),
            address.clone(),
            receipt.tx_hash.clone(),
        );
        if let Err(e) = self.store.complete_entry(&participant).await {
            warn!(
                raffle_id,
                tx_hash = %receipt.tx_hash,
                error = %e,
                "Entry confirmed on-chain but not recorded"
            );
            return Err(e);
        }

        info!(raffle_id, participant = %address, tx_hash = %receipt.tx_hash, "Raffle entered");
        Ok(RaffleEntry {
            tx_hash: receipt.tx_hash,
            participant: address,
        })
    }

    /// Reveal winners on-chain and flag the matching participants.
    #[instrument(skip(self))]
    pub async fn reveal_winners(&self, raffle_id: RaffleId) -> Result<RevealedWinners> {
        let receipt = self.ledger.reveal_winners(raffle_id).await?;

        let winners = receipt
            .revealed_winners()
            .filter(|w| !w.is_empty())
            .ok_or_else(RaffleError::no_winners)?;

        let matched = self.store.mark_winners(raffle_id, &winners).await?;
        if self
            .store
            .mark_raffle_revealed(raffle_id, &receipt.tx_hash)
            .await?
            .is_none()
        {
            warn!(
                raffle_id,
                tx_hash = %receipt.tx_hash,
                "Winners revealed on-chain for a raffle missing from the store"
            );
            return Err(RaffleError::RaffleNotFound(raffle_id));
        }

        info!(
            raffle_id,
            winners = winners.len(),
            matched,
            tx_hash = %receipt.tx_hash,
            "Winners revealed"
        );
        Ok(RevealedWinners {
            tx_hash: receipt.tx_hash,
            raffle_id,
            winners,
        })
    }

    /// On-chain participant list.
    pub async fn participants(&self, raffle_id: RaffleId) -> Result<Vec<String>> {
        self.ledger.participants(raffle_id).await
    }

    /// On-chain winner list.
    pub async fn winners(&self, raffle_id: RaffleId) -> Result<Vec<String>> {
        self.ledger.winners(raffle_id).await
    }

    /// Mint `count` tickets for an existing raffle. A missing count is
    /// rejected only after the raffle is known to exist.
    #[instrument(skip(self))]
    pub async fn generate_tickets(
        &self,
        raffle_id: RaffleId,
        count: Option<i64>,
    ) -> Result<TicketBatch> {
        if self.store.get_raffle(raffle_id).await?.is_none() {
            return Err(RaffleError::RaffleNotFound(raffle_id));
        }
        let count = count
            .and_then(|c| u64::try_from(c).ok())
            .filter(|c| (1..=self.config.max_tickets_per_request).contains(c))
            .ok_or(RaffleError::InvalidCount)?;

        let encoder = self.encoder.clone();
        let issued = tokio::task::spawn_blocking(move || {
            issue_tickets(encoder.as_ref(), raffle_id, count as usize)
        })
        .await
        .map_err(|e| RaffleError::Internal(format!("ticket generation task failed: {}", e)))??;

        let tickets: Vec<_> = issued.iter().map(|t| t.ticket.clone()).collect();
        self.store.insert_tickets(&tickets).await?;

        let raffle = self
            .store
            .add_tickets_issued(raffle_id, count)
            .await?
            .ok_or(RaffleError::RaffleNotFound(raffle_id))?;

        info!(
            raffle_id,
            count,
            tickets_issued = raffle.tickets_issued,
            "Tickets generated"
        );
        Ok(TicketBatch {
            tickets_issued: raffle.tickets_issued,
            entries_redeemed: raffle.entries_redeemed,
            tickets: issued,
        })
    }

    /// Upload the collection image and deploy the raffle's NFT contract.
    #[instrument(skip(self, image), fields(size = image.bytes.len()))]
    pub async fn deploy_nft(
        &self,
        raffle_id: RaffleId,
        name: &str,
        symbol: &str,
        image: NftImage,
    ) -> Result<NftDeployment> {
        if name.trim().is_empty() || symbol.trim().is_empty() {
            return Err(RaffleError::Validation("name and symbol are required".into()));
        }
        if image.bytes.is_empty() {
            return Err(RaffleError::Validation("image is required".into()));
        }
        let content = self
            .content
            .as_ref()
            .ok_or(RaffleError::NotConfigured("content store"))?;

        let image_url = content
            .upload(&image.file_name, &image.content_type, image.bytes)
            .await?;

        let receipt = self
            .ledger
            .deploy_nft(raffle_id, name.trim(), symbol.trim(), &image_url)
            .await?;

        info!(raffle_id, tx_hash = %receipt.tx_hash, %image_url, "NFT collection deployed");
        Ok(NftDeployment {
            tx_hash: receipt.tx_hash,
            image_url,
        })
    }

    /// Mint consolation NFTs to every non-winner.
    #[instrument(skip(self))]
    pub async fn mint_to_losers(&self, raffle_id: RaffleId) -> Result<String> {
        let receipt = self.ledger.mint_to_losers(raffle_id).await?;
        info!(raffle_id, tx_hash = %receipt.tx_hash, "NFTs minted to losers");
        Ok(receipt.tx_hash)
    }

    pub async fn get_raffle(&self, raffle_id: RaffleId) -> Result<Raffle> {
        self.store
            .get_raffle(raffle_id)
            .await?
            .ok_or(RaffleError::RaffleNotFound(raffle_id))
    }

    pub async fn create_user(&self, wallet: &str, username: &str, email: &str) -> Result<User> {
        let (wallet, username, email) = (wallet.trim(), username.trim(), email.trim());
        if wallet.is_empty() || username.is_empty() || email.is_empty() {
            return Err(RaffleError::Validation(
                "wallet, username and email are required".into(),
            ));
        }
        if !email.contains('@') {
            return Err(RaffleError::Validation("Invalid email".into()));
        }
        let user = User::new(wallet, username, email);
        self.store.insert_user(&user).await?;
        info!(wallet, "User created");
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.store.list_users().await
    }
}

/// Parse a positive decimal ether amount into wei.
fn parse_prize(amount: &str) -> Result<U256> {
    let wei = parse_ether(amount)
        .map_err(|_| RaffleError::Validation(format!("Invalid prizeAmount: {amount}")))?;
    if wei.is_zero() {
        return Err(RaffleError::Validation(
            "prizeAmount must be positive".into(),
        ));
    }
    Ok(wei)
}

fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}
