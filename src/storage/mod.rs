//! Durable record of open positions, one row per symbol.

mod paper_ledger;
mod sqlite;

pub use paper_ledger::{PaperLedger, PaperOrder};
pub use sqlite::SqlitePositionStore;

use crate::error::StoreError;
use crate::types::{Position, PositionState};
use async_trait::async_trait;

pub type StoreResult<T> = Result<T, StoreError>;

/// Every method is a single atomic statement keyed by symbol, so the buy and
/// sell loops can share one store without further locking.
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn get(&self, symbol: &str) -> StoreResult<Option<Position>>;

    /// Inserts the position or replaces the existing row for its symbol.
    async fn upsert(&self, position: &Position) -> StoreResult<()>;

    /// Points the row at a new outstanding order (or none) and moves it to
    /// `state`. Returns false if no row exists.
    async fn set_order_id(
        &self,
        symbol: &str,
        order_id: Option<&str>,
        state: PositionState,
    ) -> StoreResult<bool>;

    /// Returns false if no row exists.
    async fn set_state(&self, symbol: &str, state: PositionState) -> StoreResult<bool>;

    /// Returns false if no row existed.
    async fn delete(&self, symbol: &str) -> StoreResult<bool>;

    /// All rows, ordered by symbol.
    async fn list_all(&self) -> StoreResult<Vec<Position>>;
}
