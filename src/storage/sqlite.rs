use super::{PaperLedger, PositionStore, StoreResult};
use crate::error::StoreError;
use crate::types::{Position, PositionState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct SqlitePositionStore {
    pool: Pool<Sqlite>,
}

impl SqlitePositionStore {
    /// Opens (creating if needed) the database at `url`, e.g. `sqlite:trades.db`.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.initialize_schema().await?;

        info!(database_url = %url, "Position store ready");
        Ok(store)
    }

    /// Single-connection in-memory database, used by tests.
    pub async fn in_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Paper orders live in the same database as the positions.
    pub async fn paper_ledger(&self) -> StoreResult<PaperLedger> {
        PaperLedger::attach(self.pool.clone()).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn initialize_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS positions (
                symbol TEXT PRIMARY KEY,
                entry_price TEXT NOT NULL,
                order_id TEXT,
                quantity TEXT NOT NULL,
                state TEXT NOT NULL,
                opened_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_position(row: &SqliteRow) -> StoreResult<Position> {
        let symbol: String = row.try_get("symbol")?;
        let corrupt = |reason: String| StoreError::Corrupt {
            symbol: symbol.clone(),
            reason,
        };

        let entry_price = Decimal::from_str(row.try_get::<&str, _>("entry_price")?)
            .map_err(|e| corrupt(format!("entry_price: {}", e)))?;
        let quantity = Decimal::from_str(row.try_get::<&str, _>("quantity")?)
            .map_err(|e| corrupt(format!("quantity: {}", e)))?;
        let state = PositionState::from_str(row.try_get::<&str, _>("state")?).map_err(corrupt)?;
        let opened_at = parse_timestamp(row.try_get::<&str, _>("opened_at")?).map_err(corrupt)?;
        let updated_at = parse_timestamp(row.try_get::<&str, _>("updated_at")?).map_err(corrupt)?;

        Ok(Position {
            order_id: row.try_get("order_id")?,
            symbol,
            entry_price,
            quantity,
            state,
            opened_at,
            updated_at,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("timestamp '{}': {}", raw, e))
}

#[async_trait]
impl PositionStore for SqlitePositionStore {
    async fn get(&self, symbol: &str) -> StoreResult<Option<Position>> {
        let row = sqlx::query("SELECT * FROM positions WHERE symbol = ?")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_position).transpose()
    }

    async fn upsert(&self, position: &Position) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO positions (symbol, entry_price, order_id, quantity, state, opened_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(symbol) DO UPDATE SET
                entry_price = excluded.entry_price,
                order_id = excluded.order_id,
                quantity = excluded.quantity,
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&position.symbol)
        .bind(position.entry_price.to_string())
        .bind(position.order_id.as_deref())
        .bind(position.quantity.to_string())
        .bind(position.state.as_str())
        .bind(position.opened_at.to_rfc3339())
        .bind(position.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_order_id(
        &self,
        symbol: &str,
        order_id: Option<&str>,
        state: PositionState,
    ) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE positions SET order_id = ?, state = ?, updated_at = ? WHERE symbol = ?")
                .bind(order_id)
                .bind(state.as_str())
                .bind(Utc::now().to_rfc3339())
                .bind(symbol)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_state(&self, symbol: &str, state: PositionState) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE positions SET state = ?, updated_at = ? WHERE symbol = ?")
            .bind(state.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(symbol)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, symbol: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM positions WHERE symbol = ?")
            .bind(symbol)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> StoreResult<Vec<Position>> {
        let rows = sqlx::query("SELECT * FROM positions ORDER BY symbol")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_position).collect()
    }
}
