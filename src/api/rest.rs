//! REST API routes.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use super::handlers::{
    create_raffle, create_user, deploy_nft, enter_raffle, generate_tickets, get_participants,
    get_raffle, get_winners, list_users, mint_to_losers, reveal_winners,
};
use crate::server::AppState;

/// Upper bound on an uploaded NFT image.
pub const MAX_IMAGE_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/raffle/create", post(create_raffle))
        .route(
            "/raffle/deployNFT",
            post(deploy_nft).layer(DefaultBodyLimit::max(MAX_IMAGE_UPLOAD_BYTES)),
        )
        .route("/raffle/:id", get(get_raffle))
        .route("/raffle/:id/enter", post(enter_raffle))
        .route("/raffle/:id/reveal", post(reveal_winners))
        .route("/raffle/:id/participants", get(get_participants))
        .route("/raffle/:id/winners", get(get_winners))
        .route("/raffle/:id/generateQRCodes", post(generate_tickets))
        .route("/raffle/:id/mintNFTLosers", post(mint_to_losers))
        .route("/users", post(create_user).get(list_users))
}
