//! Shared streaming order book.
//!
//! One writer (the market-data pump task) applies snapshots and updates;
//! readers (the quoting and hedging loops) take bounded-depth copies. All
//! access goes through a single lock held only for the copy or the patch.

use crate::sequence::{MessageKind, SequenceCursor};
use parking_lot::RwLock;
use std::time::Instant;
use tracing::debug;
use xmm_core::{OrderBookSnapshot, PriceVolume};

/// Shared book state for one symbol.
pub struct SharedBook {
    symbol: String,
    inner: RwLock<BookState>,
    cursor: SequenceCursor,
}

struct BookState {
    book: OrderBookSnapshot,
    last_update: Instant,
}

impl SharedBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self {
            inner: RwLock::new(BookState {
                book: OrderBookSnapshot::new(symbol.clone()),
                last_update: Instant::now(),
            }),
            symbol,
            cursor: SequenceCursor::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Replace the book with a snapshot. Resets sequence state: a snapshot
    /// re-seeds the stream after reconnects.
    pub fn load_snapshot(&self, snapshot: OrderBookSnapshot) {
        if snapshot.symbol != self.symbol {
            return;
        }
        self.cursor.clear();
        self.cursor
            .accept(MessageKind::BookSnapshot, &self.symbol, snapshot.sequence);

        let mut state = self.inner.write();
        state.book = snapshot;
        state.last_update = Instant::now();
    }

    /// Apply an incremental update. Levels with zero volume are removals.
    /// Out-of-sequence updates are dropped.
    pub fn apply_update(
        &self,
        symbol: &str,
        bids: &[PriceVolume],
        asks: &[PriceVolume],
        sequence: Option<u64>,
    ) {
        if symbol != self.symbol {
            return;
        }
        if !self.cursor.accept(MessageKind::BookUpdate, symbol, sequence) {
            debug!(symbol, ?sequence, "dropping out-of-sequence book update");
            return;
        }

        let mut state = self.inner.write();
        for level in bids {
            patch_side(&mut state.book.bids, *level, true);
        }
        for level in asks {
            patch_side(&mut state.book.asks, *level, false);
        }
        state.book.sequence = sequence.or(state.book.sequence);
        state.last_update = Instant::now();
    }

    /// Sequence state must not survive a transport drop.
    pub fn on_disconnect(&self) {
        self.cursor.clear();
    }

    /// Copy of the top `depth` levels per side.
    pub fn copy_depth(&self, depth: usize) -> OrderBookSnapshot {
        self.inner.read().book.copy_depth(depth)
    }

    pub fn best_bid_and_ask(&self) -> Option<(PriceVolume, PriceVolume)> {
        self.inner.read().book.best_bid_and_ask()
    }

    pub fn last_update(&self) -> Instant {
        self.inner.read().last_update
    }
}

/// Insert, replace, or remove one level, keeping the side sorted
/// (bids descending, asks ascending).
fn patch_side(side: &mut Vec<PriceVolume>, level: PriceVolume, descending: bool) {
    let pos = side.iter().position(|pv| pv.price == level.price);

    if level.volume.is_zero() {
        if let Some(i) = pos {
            side.remove(i);
        }
        return;
    }

    match pos {
        Some(i) => side[i] = level,
        None => {
            let insert_at = side
                .iter()
                .position(|pv| {
                    if descending {
                        pv.price < level.price
                    } else {
                        pv.price > level.price
                    }
                })
                .unwrap_or(side.len());
            side.insert(insert_at, level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use xmm_core::{Price, Size};

    fn pv(price: rust_decimal::Decimal, volume: rust_decimal::Decimal) -> PriceVolume {
        PriceVolume::new(Price::new(price), Size::new(volume))
    }

    fn seed(book: &SharedBook) {
        book.load_snapshot(OrderBookSnapshot {
            symbol: "BTCUSDT".to_string(),
            bids: vec![pv(dec!(100), dec!(1)), pv(dec!(99), dec!(2))],
            asks: vec![pv(dec!(101), dec!(1)), pv(dec!(102), dec!(2))],
            sequence: Some(10),
        });
    }

    #[test]
    fn test_snapshot_and_copy_depth() {
        let book = SharedBook::new("BTCUSDT");
        seed(&book);

        let copy = book.copy_depth(1);
        assert_eq!(copy.bids.len(), 1);
        assert_eq!(copy.best_bid().unwrap().price.inner(), dec!(100));
    }

    #[test]
    fn test_update_inserts_sorted() {
        let book = SharedBook::new("BTCUSDT");
        seed(&book);

        book.apply_update("BTCUSDT", &[pv(dec!(99.5), dec!(3))], &[], Some(11));
        let copy = book.copy_depth(10);
        let prices: Vec<_> = copy.bids.iter().map(|b| b.price.inner()).collect();
        assert_eq!(prices, vec![dec!(100), dec!(99.5), dec!(99)]);
    }

    #[test]
    fn test_zero_volume_removes_level() {
        let book = SharedBook::new("BTCUSDT");
        seed(&book);

        book.apply_update("BTCUSDT", &[pv(dec!(100), dec!(0))], &[], Some(11));
        let copy = book.copy_depth(10);
        assert_eq!(copy.best_bid().unwrap().price.inner(), dec!(99));
    }

    #[test]
    fn test_out_of_sequence_update_is_dropped() {
        let book = SharedBook::new("BTCUSDT");
        seed(&book);

        book.apply_update("BTCUSDT", &[pv(dec!(100), dec!(0))], &[], Some(11));
        // Replay of the same sequence must not touch the book.
        book.apply_update("BTCUSDT", &[pv(dec!(99), dec!(0))], &[], Some(11));

        let copy = book.copy_depth(10);
        assert_eq!(copy.best_bid().unwrap().price.inner(), dec!(99));
    }

    #[test]
    fn test_snapshot_reseeds_sequence() {
        let book = SharedBook::new("BTCUSDT");
        seed(&book);
        book.apply_update("BTCUSDT", &[], &[], Some(20));

        // New snapshot after reconnect restarts numbering.
        seed(&book);
        book.apply_update("BTCUSDT", &[pv(dec!(100.5), dec!(1))], &[], Some(11));
        assert_eq!(
            book.copy_depth(1).best_bid().unwrap().price.inner(),
            dec!(100.5)
        );
    }
}
