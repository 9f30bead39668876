//! Typed view of a confirmed ledger transaction.
//!
//! The ledger client decodes raw logs into [`LedgerEvent`]s. Callers look
//! events up by [`EventKind`] and read fields with [`LedgerEvent::field`],
//! which tries the named argument first and falls back to the positional one.

use std::fmt;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use super::RaffleId;

/// Events emitted by the raffle contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    RaffleCreated,
    RaffleEntered,
    WinnersRevealed,
    NftDeployed,
    LosersMinted,
    Unknown(String),
}

impl EventKind {
    /// Event name as declared in the contract ABI.
    pub fn name(&self) -> &str {
        match self {
            EventKind::RaffleCreated => "RaffleCreated",
            EventKind::RaffleEntered => "RaffleEntered",
            EventKind::WinnersRevealed => "WinnersRevealed",
            EventKind::NftDeployed => "NFTDeployed",
            EventKind::LosersMinted => "LosersMinted",
            EventKind::Unknown(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "RaffleCreated" => EventKind::RaffleCreated,
            "RaffleEntered" => EventKind::RaffleEntered,
            "WinnersRevealed" => EventKind::WinnersRevealed,
            "NFTDeployed" => EventKind::NftDeployed,
            "LosersMinted" => EventKind::LosersMinted,
            other => EventKind::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded event argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventValue {
    Uint(U256),
    Address(String),
    AddressList(Vec<String>),
    Text(String),
}

impl EventValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            EventValue::Uint(v) if v.bit_len() <= 64 => Some(v.to::<u64>()),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&str> {
        match self {
            EventValue::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_address_list(&self) -> Option<&[String]> {
        match self {
            EventValue::AddressList(list) => Some(list),
            _ => None,
        }
    }
}

/// One argument of a decoded event; `name` is absent for positional-only data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventArg {
    pub name: Option<String>,
    pub value: EventValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEvent {
    pub kind: EventKind,
    pub args: Vec<EventArg>,
}

impl LedgerEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            args: Vec::new(),
        }
    }

    pub fn with_named(mut self, name: impl Into<String>, value: EventValue) -> Self {
        self.args.push(EventArg {
            name: Some(name.into()),
            value,
        });
        self
    }

    pub fn with_positional(mut self, value: EventValue) -> Self {
        self.args.push(EventArg { name: None, value });
        self
    }

    /// Read a field by name, falling back to the argument at `position`.
    pub fn field(&self, name: &str, position: usize) -> Option<&EventValue> {
        self.args
            .iter()
            .find(|arg| arg.name.as_deref() == Some(name))
            .or_else(|| self.args.get(position))
            .map(|arg| &arg.value)
    }
}

/// Confirmed transaction outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReceipt {
    pub tx_hash: String,
    /// Transaction sender, when the node reported one.
    pub from: Option<String>,
    pub block_number: Option<u64>,
    #[serde(skip)]
    pub events: Vec<LedgerEvent>,
}

impl LedgerReceipt {
    pub fn new(tx_hash: impl Into<String>) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            from: None,
            block_number: None,
            events: Vec::new(),
        }
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_event(mut self, event: LedgerEvent) -> Self {
        self.events.push(event);
        self
    }

    /// First event of the given kind.
    pub fn find(&self, kind: &EventKind) -> Option<&LedgerEvent> {
        self.events.iter().find(|e| &e.kind == kind)
    }

    /// Raffle id from `RaffleCreated(raffleId, ...)`.
    pub fn created_raffle_id(&self) -> Option<RaffleId> {
        self.find(&EventKind::RaffleCreated)?
            .field("raffleId", 0)?
            .as_u64()
    }

    /// Winner list from `WinnersRevealed(raffleId, winners)`.
    pub fn revealed_winners(&self) -> Option<Vec<String>> {
        self.find(&EventKind::WinnersRevealed)?
            .field("winners", 1)?
            .as_address_list()
            .map(<[String]>::to_vec)
    }
}
