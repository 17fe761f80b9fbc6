//! Cart line repository.
//!
//! Lines are keyed by `(user_id, product_id)`. Every mutation is a single
//! upsert or delete so that two tabs adding to the same cart both land.

use sqlx::PgPool;

use oncemore_core::{Cart, CartItem, Price, ProductId, UserId};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct CartItemRow {
    product_id: i32,
    name: String,
    price: Price,
    image: String,
    quantity: i32,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "cart line for product {} has quantity {}",
                row.product_id, row.quantity
            ))
        })?;

        Ok(Self {
            product_id: ProductId::new(row.product_id),
            name: row.name,
            price: row.price,
            image: row.image,
            quantity,
        })
    }
}

fn db_quantity(quantity: u32) -> i32 {
    i32::try_from(quantity).unwrap_or(i32::MAX)
}

const UPSERT_LINE: &str = r"
    INSERT INTO accounts.cart_item (user_id, product_id, name, price, image, quantity)
    VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT (user_id, product_id)
    DO UPDATE SET quantity = LEAST(accounts.cart_item.quantity::BIGINT + EXCLUDED.quantity, 2147483647)::INTEGER
";

/// Repository for cart lines.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load a user's cart in the order lines were first added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT product_id, name, price, image, quantity
            FROM accounts.cart_item
            WHERE user_id = $1
            ORDER BY added_at, product_id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(CartItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Cart::from_items(items))
    }

    /// Add a line, summing quantities with an existing line for the product.
    /// The existing line keeps its price snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add(&self, user_id: UserId, item: &CartItem) -> Result<(), RepositoryError> {
        sqlx::query(UPSERT_LINE)
            .bind(user_id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.price)
            .bind(&item.image)
            .bind(db_quantity(item.quantity))
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Set a line's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in the cart.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let result = if quantity == 0 {
            sqlx::query("DELETE FROM accounts.cart_item WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(self.pool)
                .await?
        } else {
            sqlx::query(
                "UPDATE accounts.cart_item SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
            )
            .bind(user_id)
            .bind(product_id)
            .bind(db_quantity(quantity))
            .execute(self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove a product's line. Removing an absent line is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM accounts.cart_item WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Replace the whole cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is
    /// changed in that case.
    pub async fn replace(&self, user_id: UserId, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM accounts.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for item in cart.items() {
            sqlx::query(UPSERT_LINE)
                .bind(user_id)
                .bind(item.product_id)
                .bind(&item.name)
                .bind(item.price)
                .bind(&item.image)
                .bind(db_quantity(item.quantity))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Merge lines into the stored cart, summing quantities per product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is
    /// changed in that case.
    pub async fn merge(&self, user_id: UserId, items: &[CartItem]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for item in items.iter().filter(|item| item.quantity > 0) {
            sqlx::query(UPSERT_LINE)
                .bind(user_id)
                .bind(item.product_id)
                .bind(&item.name)
                .bind(item.price)
                .bind(&item.image)
                .bind(db_quantity(item.quantity))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM accounts.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
