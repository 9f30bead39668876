//! NFT collection handlers.

use axum::extract::{Multipart, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiPath, MintToLosersResponse};
use crate::domain::RaffleId;
use crate::server::AppState;
use crate::service::{NftDeployment, NftImage};

/// POST /api/raffle/deployNFT - Upload the collection image and deploy.
///
/// Multipart fields: `image` (file), `raffleId`, `name`, `symbol`.
pub async fn deploy_nft(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<NftDeployment>, ApiError> {
    let mut raffle_id = None;
    let mut name = None;
    let mut symbol = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                image = Some(NftImage {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "raffleId" => {
                let text = field.text().await?;
                let id = text
                    .trim()
                    .parse::<RaffleId>()
                    .map_err(|_| ApiError::invalid_field("Invalid raffleId"))?;
                raffle_id = Some(id);
            }
            "name" => name = Some(field.text().await?),
            "symbol" => symbol = Some(field.text().await?),
            _ => {}
        }
    }

    let raffle_id = raffle_id.ok_or_else(|| ApiError::bad_request("raffleId is required"))?;
    let name = name.ok_or_else(|| ApiError::bad_request("name is required"))?;
    let symbol = symbol.ok_or_else(|| ApiError::bad_request("symbol is required"))?;
    let image = image.ok_or_else(|| ApiError::bad_request("image is required"))?;

    let deployment = state
        .service
        .deploy_nft(raffle_id, &name, &symbol, image)
        .await?;
    Ok(Json(deployment))
}

/// POST /api/raffle/:id/mintNFTLosers - Mint consolation NFTs to non-winners.
pub async fn mint_to_losers(
    State(state): State<AppState>,
    ApiPath(raffle_id): ApiPath<RaffleId>,
) -> Result<Json<MintToLosersResponse>, ApiError> {
    let tx_hash = state.service.mint_to_losers(raffle_id).await?;
    Ok(Json(MintToLosersResponse { tx_hash }))
}
