//! Peer to peer token swaps between a maker who signs an order off chain and a
//! taker who settles it.

pub mod abi;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod market;
mod metrics;
pub mod replay;
pub mod storage;
pub mod token;

pub use {
    config::{Config, Deployment},
    dispatch::Revert,
    error::{ErrorCategory, MarketError},
    market::SecondaryMarket,
};
