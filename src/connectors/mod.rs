pub mod binance;
pub mod messages;
pub mod paper;
pub mod traits;

#[cfg(test)]
pub(crate) mod mock;
