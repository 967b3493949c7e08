//! Stream sequence gating.
//!
//! Venues that provide sequence numbers let us drop replayed or re-ordered
//! messages. The cursor keeps the largest sequence seen per
//! `(message kind, symbol)` and accepts only strictly increasing values.
//! State is discarded on disconnect; the next snapshot re-seeds it.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Message category a sequence stream is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    BookSnapshot,
    BookUpdate,
    Kline,
}

#[derive(Debug, Default)]
pub struct SequenceCursor {
    last_seen: Mutex<HashMap<(MessageKind, String), u64>>,
}

impl SequenceCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a message's sequence number.
    ///
    /// Returns false (drop the message) when the sequence is lower than or
    /// equal to the last accepted one for this key. Messages without a
    /// sequence are always accepted.
    pub fn accept(&self, kind: MessageKind, symbol: &str, sequence: Option<u64>) -> bool {
        let Some(sequence) = sequence else {
            return true;
        };

        let mut last_seen = self.last_seen.lock();
        match last_seen.get(&(kind, symbol.to_string())) {
            Some(&last) if sequence <= last => false,
            _ => {
                last_seen.insert((kind, symbol.to_string()), sequence);
                true
            }
        }
    }

    /// Drop all cursor state (called on disconnect).
    pub fn clear(&self) {
        self.last_seen.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strictly_increasing() {
        let cursor = SequenceCursor::new();
        assert!(cursor.accept(MessageKind::BookUpdate, "BTCUSDT", Some(1)));
        assert!(cursor.accept(MessageKind::BookUpdate, "BTCUSDT", Some(2)));
        assert!(!cursor.accept(MessageKind::BookUpdate, "BTCUSDT", Some(2)));
        assert!(!cursor.accept(MessageKind::BookUpdate, "BTCUSDT", Some(1)));
        assert!(cursor.accept(MessageKind::BookUpdate, "BTCUSDT", Some(5)));
    }

    #[test]
    fn test_kinds_and_symbols_are_independent() {
        let cursor = SequenceCursor::new();
        assert!(cursor.accept(MessageKind::BookUpdate, "BTCUSDT", Some(10)));
        assert!(cursor.accept(MessageKind::BookSnapshot, "BTCUSDT", Some(3)));
        assert!(cursor.accept(MessageKind::BookUpdate, "ETHUSDT", Some(3)));
    }

    #[test]
    fn test_missing_sequence_is_accepted() {
        let cursor = SequenceCursor::new();
        assert!(cursor.accept(MessageKind::Kline, "BTCUSDT", None));
        assert!(cursor.accept(MessageKind::Kline, "BTCUSDT", None));
    }

    #[test]
    fn test_clear_resets_cursor() {
        let cursor = SequenceCursor::new();
        assert!(cursor.accept(MessageKind::BookUpdate, "BTCUSDT", Some(10)));
        cursor.clear();
        assert!(cursor.accept(MessageKind::BookUpdate, "BTCUSDT", Some(1)));
    }
}
