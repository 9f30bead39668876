//! Raffle lifecycle handlers.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{
    ApiJson, ApiPath, CreateRaffleRequest, CreateRaffleResponse, EnterRaffleRequest,
    EnterRaffleResponse, ParticipantsResponse, RevealWinnersResponse, WinnersResponse,
};
use crate::domain::{Raffle, RaffleId, TicketId};
use crate::server::AppState;
use crate::service::NewRaffle;

/// POST /api/raffle/create - Create and fund a raffle on-chain.
pub async fn create_raffle(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateRaffleRequest>,
) -> Result<Json<CreateRaffleResponse>, ApiError> {
    let created = state
        .service
        .create_raffle(NewRaffle {
            num_winners: request.num_winners,
            prize_amount: request.prize_amount.into_string(),
            end_time: request.end_time,
            owner_address: request.owner_address,
        })
        .await?;

    Ok(Json(CreateRaffleResponse {
        message: "Raffle created successfully",
        raffle_id: created.raffle_id,
        tx_hash: created.tx_hash,
    }))
}

/// GET /api/raffle/:id - Stored raffle record.
pub async fn get_raffle(
    State(state): State<AppState>,
    ApiPath(raffle_id): ApiPath<RaffleId>,
) -> Result<Json<Raffle>, ApiError> {
    Ok(Json(state.service.get_raffle(raffle_id).await?))
}

/// POST /api/raffle/:id/enter - Redeem a ticket into a raffle entry.
pub async fn enter_raffle(
    State(state): State<AppState>,
    ApiPath(raffle_id): ApiPath<RaffleId>,
    ApiJson(request): ApiJson<EnterRaffleRequest>,
) -> Result<Json<EnterRaffleResponse>, ApiError> {
    let ticket_id = request.ticket_id.trim();
    if ticket_id.is_empty() {
        return Err(ApiError::invalid_field("ticketId is required"));
    }

    let entry = state
        .service
        .enter_raffle(
            raffle_id,
            &TicketId::from(ticket_id),
            &request.participant_credential,
        )
        .await?;

    Ok(Json(EnterRaffleResponse {
        message: "Entered raffle successfully",
        tx_hash: entry.tx_hash,
        participant: entry.participant,
    }))
}

/// POST /api/raffle/:id/reveal - Reveal winners and flag them locally.
pub async fn reveal_winners(
    State(state): State<AppState>,
    ApiPath(raffle_id): ApiPath<RaffleId>,
) -> Result<Json<RevealWinnersResponse>, ApiError> {
    let revealed = state.service.reveal_winners(raffle_id).await?;
    Ok(Json(RevealWinnersResponse {
        message: "Winners revealed successfully",
        tx_hash: revealed.tx_hash,
        raffle_id: revealed.raffle_id,
        winners: revealed.winners,
    }))
}

/// GET /api/raffle/:id/participants - On-chain participant list.
pub async fn get_participants(
    State(state): State<AppState>,
    ApiPath(raffle_id): ApiPath<RaffleId>,
) -> Result<Json<ParticipantsResponse>, ApiError> {
    let participants = state.service.participants(raffle_id).await?;
    Ok(Json(ParticipantsResponse { participants }))
}

/// GET /api/raffle/:id/winners - On-chain winner list.
pub async fn get_winners(
    State(state): State<AppState>,
    ApiPath(raffle_id): ApiPath<RaffleId>,
) -> Result<Json<WinnersResponse>, ApiError> {
    let winners = state.service.winners(raffle_id).await?;
    Ok(Json(WinnersResponse { winners }))
}
