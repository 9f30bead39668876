//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::U256;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use raffle_reconciler::domain::{EventKind, EventValue, LedgerEvent, LedgerReceipt, RaffleId};
use raffle_reconciler::infra::{
    ContentStore, InMemoryRaffleStore, LedgerClient, RaffleError, Result, ShutdownCoordinator,
};
use raffle_reconciler::server::{build_router, AppState};
use raffle_reconciler::service::{RaffleService, ServiceConfig};
use raffle_reconciler::ticketing::{QrTicketEncoder, TicketEncoder, TicketPayload};

/// Scripted stand-in for the raffle contract.
///
/// Raffle ids are assigned from 1. Participant addresses are derived from the
/// credential as `0x` + the key without its prefix.
pub struct FakeLedger {
    next_raffle_id: AtomicU64,
    next_tx: AtomicU64,
    emit_raffle_created: AtomicBool,
    fail_entries: AtomicBool,
    lose_entry_receipts: AtomicBool,
    pub create_calls: AtomicUsize,
    pub enter_calls: AtomicUsize,
    pub reveal_calls: AtomicUsize,
    participants: Mutex<HashMap<RaffleId, Vec<String>>>,
    winners: Mutex<HashMap<RaffleId, Vec<String>>>,
    pub deployed_base_uris: Mutex<Vec<String>>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            next_raffle_id: AtomicU64::new(1),
            next_tx: AtomicU64::new(1),
            emit_raffle_created: AtomicBool::new(true),
            fail_entries: AtomicBool::new(false),
            lose_entry_receipts: AtomicBool::new(false),
            create_calls: AtomicUsize::new(0),
            enter_calls: AtomicUsize::new(0),
            reveal_calls: AtomicUsize::new(0),
            participants: Mutex::new(HashMap::new()),
            winners: Mutex::new(HashMap::new()),
            deployed_base_uris: Mutex::new(Vec::new()),
        }
    }

    /// Receipts for `createRaffle` will carry no `RaffleCreated` event.
    pub fn without_raffle_created_event(self) -> Self {
        self.emit_raffle_created.store(false, Ordering::SeqCst);
        self
    }

    pub fn fail_entries(&self, fail: bool) {
        self.fail_entries.store(fail, Ordering::SeqCst);
    }

    /// Entries are mined, but the receipt wait fails.
    pub fn lose_entry_receipts(&self, lose: bool) {
        self.lose_entry_receipts.store(lose, Ordering::SeqCst);
    }

    /// Fix the winner set the next reveal of `raffle_id` will emit.
    pub fn set_winners(&self, raffle_id: RaffleId, winners: Vec<String>) {
        self.winners.lock().unwrap().insert(raffle_id, winners);
    }

    pub fn address_for(key: &str) -> String {
        format!("0x{}", key.trim_start_matches("0x"))
    }

    fn tx_hash(&self) -> String {
        format!("0x{:064x}", self.next_tx.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn create_raffle(
        &self,
        _num_winners: u32,
        _prize_per_winner: U256,
        _end_time: u64,
        _value: U256,
    ) -> Result<LedgerReceipt> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let receipt = LedgerReceipt::new(self.tx_hash());
        if !self.emit_raffle_created.load(Ordering::SeqCst) {
            return Ok(receipt);
        }
        let raffle_id = self.next_raffle_id.fetch_add(1, Ordering::SeqCst);
        Ok(receipt.with_event(
            LedgerEvent::new(EventKind::RaffleCreated)
                .with_named("raffleId", EventValue::Uint(U256::from(raffle_id))),
        ))
    }

    async fn enter_raffle(&self, raffle_id: RaffleId, participant_key: &str) -> Result<LedgerReceipt> {
        self.enter_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_entries.load(Ordering::SeqCst) {
            return Err(RaffleError::Ledger("execution reverted".into()));
        }
        let address = Self::address_for(participant_key);
        self.participants
            .lock()
            .unwrap()
            .entry(raffle_id)
            .or_default()
            .push(address.clone());
        let tx_hash = self.tx_hash();
        if self.lose_entry_receipts.load(Ordering::SeqCst) {
            return Err(RaffleError::Unconfirmed {
                tx_hash,
                reason: "receipt wait timed out".into(),
            });
        }
        Ok(LedgerReceipt::new(tx_hash)
            .with_from(address.clone())
            .with_event(
                LedgerEvent::new(EventKind::RaffleEntered)
                    .with_named("raffleId", EventValue::Uint(U256::from(raffle_id)))
                    .with_named("participant", EventValue::Address(address)),
            ))
    }

    async fn reveal_winners(&self, raffle_id: RaffleId) -> Result<LedgerReceipt> {
        self.reveal_calls.fetch_add(1, Ordering::SeqCst);
        let winners = match self.winners.lock().unwrap().get(&raffle_id) {
            Some(winners) => winners.clone(),
            None => self
                .participants
                .lock()
                .unwrap()
                .get(&raffle_id)
                .and_then(|p| p.first().cloned())
                .into_iter()
                .collect(),
        };
        self.winners
            .lock()
            .unwrap()
            .insert(raffle_id, winners.clone());
        Ok(LedgerReceipt::new(self.tx_hash()).with_event(
            LedgerEvent::new(EventKind::WinnersRevealed)
                .with_named("raffleId", EventValue::Uint(U256::from(raffle_id)))
                .with_named("winners", EventValue::AddressList(winners)),
        ))
    }

    async fn participants(&self, raffle_id: RaffleId) -> Result<Vec<String>> {
        Ok(self
            .participants
            .lock()
            .unwrap()
            .get(&raffle_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn winners(&self, raffle_id: RaffleId) -> Result<Vec<String>> {
        Ok(self
            .winners
            .lock()
            .unwrap()
            .get(&raffle_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn deploy_nft(
        &self,
        _raffle_id: RaffleId,
        _name: &str,
        _symbol: &str,
        base_uri: &str,
    ) -> Result<LedgerReceipt> {
        self.deployed_base_uris
            .lock()
            .unwrap()
            .push(base_uri.to_string());
        Ok(LedgerReceipt::new(self.tx_hash()))
    }

    async fn mint_to_losers(&self, _raffle_id: RaffleId) -> Result<LedgerReceipt> {
        Ok(LedgerReceipt::new(self.tx_hash()))
    }
}

/// Content store that "pins" by size.
pub struct FakeContentStore;

#[async_trait]
impl ContentStore for FakeContentStore {
    async fn upload(&self, file_name: &str, _content_type: &str, bytes: Vec<u8>) -> Result<String> {
        Ok(format!(
            "https://gateway.test/ipfs/Qm{}-{}",
            bytes.len(),
            file_name
        ))
    }
}

/// Encoder that skips image rendering.
pub struct PlainEncoder;

impl TicketEncoder for PlainEncoder {
    fn encode(&self, payload: &TicketPayload) -> Result<String> {
        Ok(format!("ticket:{}:{}", payload.raffle_id, payload.ticket_id))
    }
}

/// Everything a test needs to drive the HTTP surface and inspect state.
pub struct TestApp {
    pub router: axum::Router,
    pub ledger: Arc<FakeLedger>,
    pub store: Arc<InMemoryRaffleStore>,
    pub shutdown: Arc<ShutdownCoordinator>,
}

pub struct TestAppBuilder {
    ledger: FakeLedger,
    with_content_store: bool,
    real_qr: bool,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            ledger: FakeLedger::new(),
            with_content_store: true,
            real_qr: false,
        }
    }

    pub fn ledger(mut self, ledger: FakeLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn without_content_store(mut self) -> Self {
        self.with_content_store = false;
        self
    }

    pub fn with_qr_images(mut self) -> Self {
        self.real_qr = true;
        self
    }

    pub fn build(self) -> TestApp {
        let ledger = Arc::new(self.ledger);
        let store = Arc::new(InMemoryRaffleStore::new());
        let encoder: Arc<dyn TicketEncoder> = if self.real_qr {
            Arc::new(QrTicketEncoder::default())
        } else {
            Arc::new(PlainEncoder)
        };

        let mut service = RaffleService::new(
            ledger.clone(),
            store.clone(),
            encoder,
            ServiceConfig::default(),
        );
        if self.with_content_store {
            service = service.with_content_store(Arc::new(FakeContentStore));
        }

        let shutdown = Arc::new(ShutdownCoordinator::new());
        let router = build_router(
            AppState {
                service: Arc::new(service),
                shutdown: shutdown.clone(),
            },
            None,
        );

        TestApp {
            router,
            ledger,
            store,
            shutdown,
        }
    }
}

pub fn test_app() -> TestApp {
    TestAppBuilder::new().build()
}

/// Send a request to the test router.
pub async fn send_request(
    app: &axum::Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }

    let body = body
        .map(|v| Body::from(serde_json::to_vec(&v).unwrap()))
        .unwrap_or_else(|| Body::from(Vec::new()));

    send(app, builder.body(body).unwrap()).await
}

/// Send a prepared request and decode the JSON response.
pub async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec();

    let json = if bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes) }))
    };

    (status, json)
}

pub const MULTIPART_BOUNDARY: &str = "raffle-test-boundary";

/// Text fields plus an optional file part, encoded as multipart/form-data.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
