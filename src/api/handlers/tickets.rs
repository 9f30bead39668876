//! QR ticket handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiJson, ApiPath, GenerateTicketsRequest, GenerateTicketsResponse};
use crate::domain::RaffleId;
use crate::server::AppState;

/// POST /api/raffle/:id/generateQRCodes - Mint a batch of tickets.
pub async fn generate_tickets(
    State(state): State<AppState>,
    ApiPath(raffle_id): ApiPath<RaffleId>,
    ApiJson(request): ApiJson<GenerateTicketsRequest>,
) -> Result<(StatusCode, Json<GenerateTicketsResponse>), ApiError> {
    let batch = state
        .service
        .generate_tickets(raffle_id, request.count())
        .await?;

    let response = GenerateTicketsResponse {
        message: format!("{} QR codes generated", batch.tickets.len()),
        total_entries: batch.tickets_issued,
        redeemed_entries: batch.entries_redeemed,
        tickets: batch.tickets.into_iter().map(Into::into).collect(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}
