//! Order outbox repository.
//!
//! Each order commits one outbox row per side effect in the same
//! transaction as the order itself. Rows stay pending until the dispatcher
//! marks them processed; failures bump `attempts` and record the error.
//!
//! A row is owned by whoever holds its lease (`claimed_until`). New rows are
//! leased to the post-commit dispatch from the moment they are inserted, and
//! the sweep only claims rows whose lease is gone, so the two never apply
//! the same event concurrently.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use oncemore_core::{OrderId, OutboxEventId};

use super::RepositoryError;

/// Kind of side effect an outbox row stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "outbox_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutboxKind {
    /// Take ordered quantities off catalog stock.
    DecrementStock,
    /// Email every admin about the order.
    NotifyAdminsEmail,
    /// Push the order to connected admin dashboards.
    BroadcastNewOrder,
}

impl OutboxKind {
    /// Every kind, in the order they are enqueued.
    pub const ALL: [Self; 3] = [
        Self::DecrementStock,
        Self::NotifyAdminsEmail,
        Self::BroadcastNewOrder,
    ];

    /// Whether a failure should be retried by the sweep. Broadcasts only
    /// matter to dashboards that are connected right now.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::BroadcastNewOrder)
    }
}

/// A pending or processed outbox row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutboxEvent {
    pub id: OutboxEventId,
    pub order_id: OrderId,
    pub kind: OutboxKind,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub claimed_until: Option<DateTime<Utc>>,
}

impl OutboxEvent {
    /// Whether the lease taken with this row is still valid at `now`.
    #[must_use]
    pub fn lease_held_at(&self, now: DateTime<Utc>) -> bool {
        self.claimed_until.is_some_and(|until| until > now)
    }
}

/// How long a dispatcher owns an event before the sweep may take it over.
pub const DISPATCH_LEASE: Duration = Duration::from_secs(300);

const EVENT_COLUMNS: &str =
    "id, order_id, kind, attempts, last_error, created_at, processed_at, claimed_until";

/// Insert one outbox row per kind inside an open transaction, leased to the
/// caller for [`DISPATCH_LEASE`].
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn enqueue_all(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Vec<OutboxEvent>, RepositoryError> {
    let mut events = Vec::with_capacity(OutboxKind::ALL.len());
    for kind in OutboxKind::ALL {
        let event = sqlx::query_as::<_, OutboxEvent>(&format!(
            r"
            INSERT INTO accounts.order_outbox (order_id, kind, claimed_until)
            VALUES ($1, $2, NOW() + make_interval(secs => $3))
            RETURNING {EVENT_COLUMNS}
            "
        ))
        .bind(order_id)
        .bind(kind)
        .bind(DISPATCH_LEASE.as_secs_f64())
        .fetch_one(&mut *conn)
        .await?;
        events.push(event);
    }
    Ok(events)
}

/// Repository for outbox rows.
pub struct OutboxRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OutboxRepository<'a> {
    /// Create a new outbox repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Lease pending retryable events with attempts left, oldest first.
    ///
    /// Rows still leased to another dispatcher are skipped, as are rows
    /// locked by a concurrent sweep.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn claim_pending(
        &self,
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, RepositoryError> {
        let mut events = sqlx::query_as::<_, OutboxEvent>(&format!(
            r"
            UPDATE accounts.order_outbox
            SET claimed_until = NOW() + make_interval(secs => $3)
            WHERE id IN (
                SELECT id
                FROM accounts.order_outbox
                WHERE processed_at IS NULL
                  AND attempts < $1
                  AND kind <> 'broadcast_new_order'
                  AND (claimed_until IS NULL OR claimed_until < NOW())
                ORDER BY created_at, id
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {EVENT_COLUMNS}
            "
        ))
        .bind(max_attempts)
        .bind(limit)
        .bind(DISPATCH_LEASE.as_secs_f64())
        .fetch_all(self.pool)
        .await?;

        events.sort_by_key(|e| (e.created_at, e.id));
        Ok(events)
    }

    /// Mark an event done.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_processed(&self, id: OutboxEventId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE accounts.order_outbox
            SET processed_at = NOW(), attempts = attempts + 1, last_error = NULL
            WHERE id = $1 AND processed_at IS NULL
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Record a failed attempt and release the lease, leaving the event
    /// pending for the next sweep.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_failed(&self, id: OutboxEventId, error: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE accounts.order_outbox
            SET attempts = attempts + 1, last_error = $2, claimed_until = NULL
            WHERE id = $1 AND processed_at IS NULL
            ",
        )
        .bind(id)
        .bind(error)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_broadcast_is_not_retried() {
        assert!(OutboxKind::DecrementStock.is_retryable());
        assert!(OutboxKind::NotifyAdminsEmail.is_retryable());
        assert!(!OutboxKind::BroadcastNewOrder.is_retryable());
    }

    fn event(claimed_until: Option<DateTime<Utc>>) -> OutboxEvent {
        OutboxEvent {
            id: OutboxEventId::new(1),
            order_id: OrderId::new(1),
            kind: OutboxKind::NotifyAdminsEmail,
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            processed_at: None,
            claimed_until,
        }
    }

    #[test]
    fn test_lease_held_until_expiry() {
        let now = Utc::now();
        let lease = chrono::Duration::seconds(30);

        assert!(event(Some(now + lease)).lease_held_at(now));
        assert!(!event(Some(now - lease)).lease_held_at(now));
        assert!(!event(Some(now)).lease_held_at(now));
        assert!(!event(None).lease_held_at(now));
    }
}
