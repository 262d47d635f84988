use super::StoreResult;
use crate::error::StoreError;
use crate::types::Side;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

/// A simulated limit order that has not been reported filled yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperOrder {
    pub id: i64,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Working paper orders, kept in the position database so they survive a
/// restart together with the rows that reference them.
#[derive(Clone)]
pub struct PaperLedger {
    pool: Pool<Sqlite>,
}

impl PaperLedger {
    pub(super) async fn attach(pool: Pool<Sqlite>) -> StoreResult<Self> {
        // AUTOINCREMENT: ids of removed orders are never handed out again.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS paper_orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                price TEXT NOT NULL,
                quantity TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Records a new working order and returns its id.
    pub async fn insert(
        &self,
        symbol: &str,
        side: Side,
        price: Decimal,
        quantity: Decimal,
    ) -> StoreResult<i64> {
        let result = sqlx::query(
            "INSERT INTO paper_orders (symbol, side, price, quantity, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(symbol)
        .bind(side.as_str())
        .bind(price.to_string())
        .bind(quantity.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get(&self, id: i64) -> StoreResult<Option<PaperOrder>> {
        let row = sqlx::query("SELECT * FROM paper_orders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    /// Returns false if the order was already gone.
    pub async fn remove(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM paper_orders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn open_for(&self, symbol: &str) -> StoreResult<Vec<PaperOrder>> {
        let rows = sqlx::query("SELECT * FROM paper_orders WHERE symbol = ? ORDER BY id")
            .bind(symbol)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_order).collect()
    }
}

fn row_to_order(row: &SqliteRow) -> StoreResult<PaperOrder> {
    let symbol: String = row.try_get("symbol")?;
    let corrupt = |reason: String| StoreError::Corrupt {
        symbol: symbol.clone(),
        reason,
    };

    let side = match row.try_get::<&str, _>("side")? {
        "BUY" => Side::Buy,
        "SELL" => Side::Sell,
        other => return Err(corrupt(format!("paper order side '{}'", other))),
    };
    let price = Decimal::from_str(row.try_get::<&str, _>("price")?)
        .map_err(|e| corrupt(format!("paper order price: {}", e)))?;
    let quantity = Decimal::from_str(row.try_get::<&str, _>("quantity")?)
        .map_err(|e| corrupt(format!("paper order quantity: {}", e)))?;

    Ok(PaperOrder {
        id: row.try_get("id")?,
        symbol,
        side,
        price,
        quantity,
    })
}
