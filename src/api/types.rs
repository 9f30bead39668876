//! Shared request and response types for REST API handlers.

use axum::extract::{FromRequest, FromRequestParts};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::domain::RaffleId;
use crate::ticketing::IssuedTicket;

/// JSON body extractor whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections use the API error shape.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Decimal amount accepted either as a JSON string or a JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DecimalAmount {
    Text(String),
    Number(serde_json::Number),
}

impl DecimalAmount {
    pub fn into_string(self) -> String {
        match self {
            DecimalAmount::Text(s) => s,
            DecimalAmount::Number(n) => n.to_string(),
        }
    }
}

// ============================================================================
// Raffle types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRaffleRequest {
    pub num_winners: u32,
    /// Prize per winner in ether.
    pub prize_amount: DecimalAmount,
    /// Epoch seconds.
    pub end_time: u64,
    pub owner_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRaffleResponse {
    pub message: &'static str,
    pub raffle_id: RaffleId,
    pub tx_hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterRaffleRequest {
    #[serde(alias = "qrId")]
    pub ticket_id: String,
    /// Private key the entry transaction is signed with.
    #[serde(alias = "userPrivateKey")]
    pub participant_credential: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterRaffleResponse {
    pub message: &'static str,
    pub tx_hash: String,
    pub participant: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealWinnersResponse {
    pub message: &'static str,
    pub tx_hash: String,
    pub raffle_id: RaffleId,
    pub winners: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
    pub participants: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct WinnersResponse {
    pub winners: Vec<String>,
}

// ============================================================================
// Ticket types
// ============================================================================

/// Count is loosely typed so that a bad value on an unknown raffle still
/// reports the missing raffle.
#[derive(Debug, Deserialize)]
pub struct GenerateTicketsRequest {
    #[serde(default, alias = "numQRCodes")]
    pub count: Option<serde_json::Value>,
}

impl GenerateTicketsRequest {
    /// Integer count, accepting numeric strings. `None` if absent or unusable.
    pub fn count(&self) -> Option<i64> {
        match self.count.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub ticket_id: String,
    pub raffle_id: RaffleId,
    /// PNG data URL of the QR code.
    pub image: String,
}

impl From<IssuedTicket> for TicketResponse {
    fn from(issued: IssuedTicket) -> Self {
        Self {
            ticket_id: issued.ticket.ticket_id.0,
            raffle_id: issued.ticket.raffle_id,
            image: issued.image,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTicketsResponse {
    pub message: String,
    /// Tickets issued for the raffle so far.
    pub total_entries: u64,
    /// Tickets redeemed into entries so far.
    pub redeemed_entries: u64,
    pub tickets: Vec<TicketResponse>,
}

// ============================================================================
// NFT types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintToLosersResponse {
    pub tx_hash: String,
}

// ============================================================================
// User types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub wallet: String,
    pub username: String,
    pub email: String,
}
