//! Order repository.
//!
//! Orders are written once, together with the cart clear and their outbox
//! rows, then only ever touched through the status and assignment updates.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use oncemore_core::{
    Email, NewOrder, OrderId, OrderItem, OrderStatus, PaymentMethod, Price, ShippingAddress,
    StatusPolicy, UserId,
};

use super::RepositoryError;
use super::outbox::{self, OutboxEvent};
use crate::models::{Order, OrderNotification};

const ORDER_COLUMNS: &str = r"
    id, user_id, user_email, items, total_price, coupon_code, coupon_discount,
    shipping_cost, total_amount, shipping_address, payment_method, upi_id, status,
    assigned_to, assigned_at, assigned_by, created_at
";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    user_email: String,
    items: Json<Vec<OrderItem>>,
    total_price: Price,
    coupon_code: Option<String>,
    coupon_discount: Price,
    shipping_cost: Price,
    total_amount: Price,
    shipping_address: Json<ShippingAddress>,
    payment_method: PaymentMethod,
    upi_id: Option<String>,
    status: OrderStatus,
    assigned_to: Option<i32>,
    assigned_at: Option<DateTime<Utc>>,
    assigned_by: Option<i32>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let user_email = Email::parse(&row.user_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email on order {}: {e}", row.id))
        })?;

        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            user_email,
            items: row.items.0,
            total_price: row.total_price,
            coupon_code: row.coupon_code,
            coupon_discount: row.coupon_discount,
            shipping_cost: row.shipping_cost,
            total_amount: row.total_amount,
            shipping_address: row.shipping_address.0,
            payment_method: row.payment_method,
            upi_id: row.upi_id,
            status: row.status,
            assigned_to: row.assigned_to.map(UserId::new),
            assigned_at: row.assigned_at,
            assigned_by: row.assigned_by.map(UserId::new),
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: i32,
    user_email: String,
    total_amount: Price,
    created_at: DateTime<Utc>,
}

/// Which orders an admin listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderFilter {
    All,
    AssignedTo(UserId),
    Unassigned,
}

impl OrderFilter {
    /// The `WHERE` clause for this filter. `AssignedTo` expects the admin id
    /// bound as `$1`.
    const fn where_clause(self) -> &'static str {
        match self {
            Self::All => "",
            Self::AssignedTo(_) => "WHERE assigned_to = $1",
            Self::Unassigned => "WHERE assigned_to IS NULL",
        }
    }
}

fn list_sql(filter: OrderFilter) -> String {
    format!(
        "SELECT {ORDER_COLUMNS} FROM accounts.order {} ORDER BY created_at DESC, id DESC",
        filter.where_clause()
    )
}

/// A freshly committed order and the side effects queued with it.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order: Order,
    pub events: Vec<OutboxEvent>,
}

/// Result of a status update.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub previous: OrderStatus,
    pub order: Order,
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order, clear the buyer's cart and queue the order's side
    /// effects, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is
    /// written in that case.
    pub async fn create(&self, new_order: &NewOrder) -> Result<CreatedOrder, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO accounts.order (
                user_id, user_email, items, total_price, coupon_code, coupon_discount,
                shipping_cost, total_amount, shipping_address, payment_method, upi_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(new_order.user_id)
        .bind(new_order.user_email.as_str())
        .bind(Json(&new_order.items))
        .bind(new_order.summary.total_price)
        .bind(new_order.summary.coupon_code.as_deref())
        .bind(new_order.summary.coupon_discount)
        .bind(new_order.summary.shipping_cost)
        .bind(new_order.summary.total_amount)
        .bind(Json(&new_order.shipping_address))
        .bind(new_order.payment_method)
        .bind(new_order.upi_id.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM accounts.cart_item WHERE user_id = $1")
            .bind(new_order.user_id)
            .execute(&mut *tx)
            .await?;

        let order = Order::try_from(row)?;
        let events = outbox::enqueue_all(&mut tx, order.id).await?;

        tx.commit().await?;

        Ok(CreatedOrder { order, events })
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM accounts.order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM accounts.order WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Orders for the admin listing, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let sql = list_sql(filter);
        let mut query = sqlx::query_as::<_, OrderRow>(&sql);
        if let OrderFilter::AssignedTo(admin_id) = filter {
            query = query.bind(admin_id);
        }

        let rows = query.fetch_all(self.pool).await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    /// Set an order's status under `policy`.
    ///
    /// The current status is read with a row lock so the policy check and the
    /// write see the same value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Conflict` if `policy` refuses the transition.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
        policy: StatusPolicy,
    ) -> Result<StatusChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_scalar::<_, OrderStatus>(
            "SELECT status FROM accounts.order WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        policy
            .check(previous, next)
            .map_err(|e| RepositoryError::Conflict(e.to_string()))?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE accounts.order SET status = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(StatusChange {
            previous,
            order: Order::try_from(row)?,
        })
    }

    /// Assign an order to an admin. Last write wins.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn assign(
        &self,
        id: OrderId,
        admin_id: UserId,
        assigned_by: UserId,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE accounts.order
            SET assigned_to = $2, assigned_at = NOW(), assigned_by = $3
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(admin_id)
        .bind(assigned_by)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Order::try_from(row)
    }

    /// The most recent orders as admin notifications.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_notifications(
        &self,
        limit: i64,
    ) -> Result<Vec<OrderNotification>, RepositoryError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r"
            SELECT id, user_email, total_amount, created_at
            FROM accounts.order
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let user_email = Email::parse(&row.user_email).map_err(|e| {
                    RepositoryError::DataCorruption(format!(
                        "invalid email on order {}: {e}",
                        row.id
                    ))
                })?;
                Ok(OrderNotification {
                    order_id: OrderId::new(row.id),
                    user_email,
                    total_amount: row.total_amount,
                    created_at: row.created_at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_sql_per_filter() {
        let all = list_sql(OrderFilter::All);
        assert!(!all.contains("WHERE"));
        assert!(all.ends_with("ORDER BY created_at DESC, id DESC"));

        let assigned = list_sql(OrderFilter::AssignedTo(UserId::new(3)));
        assert!(assigned.contains("WHERE assigned_to = $1 ORDER BY"));

        let unassigned = list_sql(OrderFilter::Unassigned);
        assert!(unassigned.contains("WHERE assigned_to IS NULL ORDER BY"));
        assert!(!unassigned.contains('$'));
    }
}
