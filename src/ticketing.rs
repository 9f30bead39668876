//! QR ticket generation
//!
//! Mints fresh ticket identifiers and renders each one as a PNG data URL
//! whose QR payload is `{"ticketId": ..., "raffleId": ...}`. Stateless.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use serde::{Deserialize, Serialize};

use crate::domain::{QrTicket, RaffleId, TicketId};
use crate::infra::{RaffleError, Result};

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Data embedded in a ticket's QR image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    pub ticket_id: TicketId,
    pub raffle_id: RaffleId,
}

/// Turns a ticket payload into a displayable image.
pub trait TicketEncoder: Send + Sync {
    /// Returns the image as a data URL.
    fn encode(&self, payload: &TicketPayload) -> Result<String>;
}

/// PNG QR code encoder
#[derive(Debug, Clone)]
pub struct QrTicketEncoder {
    min_dimension: u32,
}

impl QrTicketEncoder {
    pub fn new(min_dimension: u32) -> Self {
        Self { min_dimension }
    }
}

impl Default for QrTicketEncoder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl TicketEncoder for QrTicketEncoder {
    fn encode(&self, payload: &TicketPayload) -> Result<String> {
        let data = serde_json::to_vec(payload)
            .map_err(|e| RaffleError::Internal(format!("Ticket payload encoding failed: {}", e)))?;

        let code = QrCode::new(&data)
            .map_err(|e| RaffleError::Internal(format!("QR encoding failed: {}", e)))?;
        let image = code
            .render::<Luma<u8>>()
            .min_dimensions(self.min_dimension, self.min_dimension)
            .build();

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(image)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| RaffleError::Internal(format!("PNG encoding failed: {}", e)))?;

        Ok(format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(png)))
    }
}

/// Extract the PNG bytes from a data URL produced by [`QrTicketEncoder`].
pub fn png_from_data_url(data_url: &str) -> Result<Vec<u8>> {
    let encoded = data_url
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or_else(|| RaffleError::Validation("Not a PNG data URL".to_string()))?;
    STANDARD
        .decode(encoded)
        .map_err(|e| RaffleError::Validation(format!("Invalid base64 image: {}", e)))
}

/// A staged ticket together with its rendered image.
#[derive(Debug, Clone)]
pub struct IssuedTicket {
    pub ticket: QrTicket,
    pub image: String,
}

/// Generate `count` fresh tickets for a raffle. Nothing is persisted here.
pub fn issue_tickets(
    encoder: &dyn TicketEncoder,
    raffle_id: RaffleId,
    count: usize,
) -> Result<Vec<IssuedTicket>> {
    (0..count)
        .map(|_| {
            let ticket = QrTicket::new(TicketId::generate(), raffle_id);
            let image = encoder.encode(&TicketPayload {
                ticket_id: ticket.ticket_id.clone(),
                raffle_id,
            })?;
            Ok(IssuedTicket { ticket, image })
        })
        .collect()
}
