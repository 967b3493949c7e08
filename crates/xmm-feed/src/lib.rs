//! Streaming market-data state for the engine.
//!
//! Owns the shared source book (with sequence gating), the volume-weighted
//! depth pricing used for layer references, the best-price heartbeats that
//! guard against a stalled feed, and the simple price solver the margin gate
//! uses to value balances in quote currency.

pub mod depth;
pub mod error;
pub mod heartbeat;
pub mod price_solver;
pub mod sequence;
pub mod shared_book;

pub use depth::aggregate_price;
pub use error::{FeedError, Result};
pub use heartbeat::{PriceHeartbeat, PRICE_UPDATE_TIMEOUT};
pub use price_solver::SimplePriceSolver;
pub use sequence::{MessageKind, SequenceCursor};
pub use shared_book::SharedBook;
