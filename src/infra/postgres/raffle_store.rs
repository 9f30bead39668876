//! PostgreSQL raffle store
//!
//! Each trait operation is one statement (or one transaction for entry
//! recording), so concurrent writers on a record are serialized by Postgres.
//!
//! # Ticket redemption
//!
//! The `used` flag is flipped with a conditional update:
//! ```sql
//! UPDATE qr_tickets SET used = TRUE, scanned_at = $3
//!     WHERE ticket_id = $1 AND raffle_id = $2 AND used = FALSE
//!     RETURNING ...;
//! ```
//! Only one of any number of concurrent callers gets a row back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{Postgres, QueryBuilder};
use tracing::instrument;

use crate::domain::{
    normalize_address, Participant, QrTicket, Raffle, RaffleId, TicketClaim, TicketId, User,
};
use crate::infra::{RaffleError, RaffleStore, Result};

/// Database row for raffles
#[derive(sqlx::FromRow)]
struct RaffleRow {
    raffle_id: i64,
    owner_address: String,
    prize_amount: String,
    num_winners: i32,
    end_time: i64,
    tickets_issued: i64,
    entries_redeemed: i64,
    revealed: bool,
    reveal_tx_hash: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<RaffleRow> for Raffle {
    fn from(row: RaffleRow) -> Self {
        Self {
            raffle_id: row.raffle_id as u64,
            owner_address: row.owner_address,
            prize_amount: row.prize_amount,
            num_winners: row.num_winners as u32,
            end_time: row.end_time as u64,
            tickets_issued: row.tickets_issued as u64,
            entries_redeemed: row.entries_redeemed as u64,
            revealed: row.revealed,
            reveal_tx_hash: row.reveal_tx_hash,
            created_at: row.created_at,
        }
    }
}

/// Database row for QR tickets
#[derive(sqlx::FromRow)]
struct TicketRow {
    ticket_id: String,
    raffle_id: i64,
    used: bool,
    user_address: Option<String>,
    created_at: DateTime<Utc>,
    scanned_at: Option<DateTime<Utc>>,
}

impl From<TicketRow> for QrTicket {
    fn from(row: TicketRow) -> Self {
        Self {
            ticket_id: TicketId(row.ticket_id),
            raffle_id: row.raffle_id as u64,
            used: row.used,
            user_address: row.user_address,
            created_at: row.created_at,
            scanned_at: row.scanned_at,
        }
    }
}

/// Database row for participants
#[derive(sqlx::FromRow)]
struct ParticipantRow {
    raffle_id: i64,
    ticket_id: String,
    user_address: String,
    tx_hash: String,
    entered_at: DateTime<Utc>,
    winner: bool,
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        Self {
            raffle_id: row.raffle_id as u64,
            ticket_id: TicketId(row.ticket_id),
            user_address: row.user_address,
            tx_hash: row.tx_hash,
            entered_at: row.entered_at,
            winner: row.winner,
        }
    }
}

/// Database row for users
#[derive(sqlx::FromRow)]
struct UserRow {
    wallet: String,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            wallet: row.wallet,
            username: row.username,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

const RAFFLE_COLUMNS: &str = "raffle_id, owner_address, prize_amount, num_winners, end_time, \
     tickets_issued, entries_redeemed, revealed, reveal_tx_hash, created_at";

const TICKET_COLUMNS: &str = "ticket_id, raffle_id, used, user_address, created_at, scanned_at";

/// Unsigned value as a BIGINT bind. Values above `i64::MAX` are rejected
/// rather than wrapped.
fn db_int(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| RaffleError::Validation(format!("{value} exceeds the supported range")))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// PostgreSQL-backed raffle store
pub struct PgRaffleStore {
    pool: PgPool,
}

impl PgRaffleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RaffleStore for PgRaffleStore {
    #[instrument(skip(self, raffle), fields(raffle_id = raffle.raffle_id))]
    async fn insert_raffle(&self, raffle: &Raffle) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO raffles (
                raffle_id, owner_address, prize_amount, num_winners, end_time,
                tickets_issued, entries_redeemed, revealed, reveal_tx_hash, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(db_int(raffle.raffle_id)?)
        .bind(&raffle.owner_address)
        .bind(&raffle.prize_amount)
        .bind(raffle.num_winners as i32)
        .bind(db_int(raffle.end_time)?)
        .bind(db_int(raffle.tickets_issued)?)
        .bind(db_int(raffle.entries_redeemed)?)
        .bind(raffle.revealed)
        .bind(&raffle.reveal_tx_hash)
        .bind(raffle.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RaffleError::DuplicateRaffle(raffle.raffle_id)
            } else {
                RaffleError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn get_raffle(&self, raffle_id: RaffleId) -> Result<Option<Raffle>> {
        let row: Option<RaffleRow> = sqlx::query_as(&format!(
            "SELECT {RAFFLE_COLUMNS} FROM raffles WHERE raffle_id = $1"
        ))
        .bind(db_int(raffle_id)?)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Raffle::from))
    }

    #[instrument(skip(self))]
    async fn mark_raffle_revealed(
        &self,
        raffle_id: RaffleId,
        tx_hash: &str,
    ) -> Result<Option<Raffle>> {
        let row: Option<RaffleRow> = sqlx::query_as(&format!(
            r#"
            UPDATE raffles
            SET revealed = TRUE,
                reveal_tx_hash = $2
            WHERE raffle_id = $1
            RETURNING {RAFFLE_COLUMNS}
            "#
        ))
        .bind(db_int(raffle_id)?)
        .bind(tx_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Raffle::from))
    }

    #[instrument(skip(self))]
    async fn add_tickets_issued(&self, raffle_id: RaffleId, count: u64) -> Result<Option<Raffle>> {
        let row: Option<RaffleRow> = sqlx::query_as(&format!(
            r#"
            UPDATE raffles
            SET tickets_issued = tickets_issued + $2
            WHERE raffle_id = $1
            RETURNING {RAFFLE_COLUMNS}
            "#
        ))
        .bind(db_int(raffle_id)?)
        .bind(db_int(count)?)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Raffle::from))
    }

    #[instrument(skip(self, tickets), fields(count = tickets.len()))]
    async fn insert_tickets(&self, tickets: &[QrTicket]) -> Result<()> {
        if tickets.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO qr_tickets (ticket_id, raffle_id, used, user_address, created_at, scanned_at) ",
        );
        let raffle_ids = tickets
            .iter()
            .map(|t| db_int(t.raffle_id))
            .collect::<Result<Vec<_>>>()?;

        builder.push_values(tickets.iter().zip(raffle_ids), |mut row, (ticket, raffle_id)| {
            row.push_bind(ticket.ticket_id.0.clone())
                .push_bind(raffle_id)
                .push_bind(ticket.used)
                .push_bind(ticket.user_address.clone())
                .push_bind(ticket.created_at)
                .push_bind(ticket.scanned_at);
        });
        builder.build().execute(&self.pool).await?;

        Ok(())
    }

    async fn get_ticket(
        &self,
        ticket_id: &TicketId,
        raffle_id: RaffleId,
    ) -> Result<Option<QrTicket>> {
        let row: Option<TicketRow> = sqlx::query_as(&format!(
            "SELECT {TICKET_COLUMNS} FROM qr_tickets WHERE ticket_id = $1 AND raffle_id = $2"
        ))
        .bind(ticket_id.as_str())
        .bind(db_int(raffle_id)?)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(QrTicket::from))
    }

    #[instrument(skip(self, scanned_at))]
    async fn claim_ticket(
        &self,
        ticket_id: &TicketId,
        raffle_id: RaffleId,
        scanned_at: DateTime<Utc>,
    ) -> Result<TicketClaim> {
        let claimed: Option<TicketRow> = sqlx::query_as(&format!(
            r#"
            UPDATE qr_tickets
            SET used = TRUE,
                scanned_at = $3
            WHERE ticket_id = $1 AND raffle_id = $2 AND used = FALSE
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(ticket_id.as_str())
        .bind(db_int(raffle_id)?)
        .bind(scanned_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = claimed {
            return Ok(TicketClaim::Claimed(row.into()));
        }

        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM qr_tickets WHERE ticket_id = $1 AND raffle_id = $2)",
        )
        .bind(ticket_id.as_str())
        .bind(db_int(raffle_id)?)
        .fetch_one(&self.pool)
        .await?;

        Ok(if exists.0 {
            TicketClaim::AlreadyUsed
        } else {
            TicketClaim::NotFound
        })
    }

    #[instrument(skip(self))]
    async fn release_ticket(&self, ticket_id: &TicketId, raffle_id: RaffleId) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE qr_tickets
            SET used = FALSE,
                scanned_at = NULL
            WHERE ticket_id = $1
              AND raffle_id = $2
              AND NOT EXISTS (
                  SELECT 1 FROM participants p
                  WHERE p.ticket_id = $1 AND p.raffle_id = $2
              )
            "#,
        )
        .bind(ticket_id.as_str())
        .bind(db_int(raffle_id)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, participant), fields(raffle_id = participant.raffle_id, ticket_id = %participant.ticket_id))]
    async fn complete_entry(&self, participant: &Participant) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO participants (raffle_id, ticket_id, user_address, tx_hash, entered_at, winner)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(db_int(participant.raffle_id)?)
        .bind(participant.ticket_id.as_str())
        .bind(&participant.user_address)
        .bind(&participant.tx_hash)
        .bind(participant.entered_at)
        .bind(participant.winner)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RaffleError::TicketAlreadyUsed
            } else {
                RaffleError::Database(e)
            }
        })?;

        sqlx::query(
            "UPDATE qr_tickets SET user_address = $3 WHERE ticket_id = $1 AND raffle_id = $2",
        )
        .bind(participant.ticket_id.as_str())
        .bind(db_int(participant.raffle_id)?)
        .bind(&participant.user_address)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE raffles SET entries_redeemed = entries_redeemed + 1 WHERE raffle_id = $1",
        )
        .bind(db_int(participant.raffle_id)?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, winners), fields(winner_count = winners.len()))]
    async fn mark_winners(&self, raffle_id: RaffleId, winners: &[String]) -> Result<u64> {
        let winners: Vec<String> = winners.iter().map(|w| normalize_address(w)).collect();

        let result = sqlx::query(
            r#"
            UPDATE participants
            SET winner = TRUE
            WHERE raffle_id = $1 AND lower(user_address) = ANY($2)
            "#,
        )
        .bind(db_int(raffle_id)?)
        .bind(&winners)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn list_participants(&self, raffle_id: RaffleId) -> Result<Vec<Participant>> {
        let rows: Vec<ParticipantRow> = sqlx::query_as(
            r#"
            SELECT raffle_id, ticket_id, user_address, tx_hash, entered_at, winner
            FROM participants
            WHERE raffle_id = $1
            ORDER BY id
            "#,
        )
        .bind(db_int(raffle_id)?)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Participant::from).collect())
    }

    #[instrument(skip(self, user), fields(wallet = %user.wallet))]
    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (wallet, username, email, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&user.wallet)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RaffleError::DuplicateUser(user.wallet.clone())
            } else {
                RaffleError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT wallet, username, email, created_at FROM users ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
