//! Block receipt returned by `Dex::advance_block`.
//!
//! The receipt summarizes the good-til expirations of one block together
//! with the state root of the store after processing.

use ssz_rs::prelude::*;

/// Current block context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockInfo {
    pub height: u64,
    /// Unix seconds.
    pub time: u64,
}

impl BlockInfo {
    pub fn new(height: u64, time: u64) -> Self {
        Self { height, time }
    }
}

/// Block processing summary.
///
/// ## State Root
///
/// The 32-byte state root is a SHA-256 hash over every key/value pair of
/// the exchange store in key order. Two replicas that processed the same
/// placements produce the same root.
///
/// ## Example
///
/// ```
/// use spot_dex::types::BlockReceipt;
///
/// let receipt = BlockReceipt::new(343, 1_700_000_000, 1, [0u8; 32]);
/// assert_eq!(receipt.state_root_hex().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct BlockReceipt {
    pub height: u64,

    /// Block time in unix seconds
    pub time: u64,

    /// Good-til cancellations executed in this block
    pub orders_expired: u64,

    /// State root after processing (SHA-256, 32 bytes)
    pub state_root: [u8; 32],
}

impl BlockReceipt {
    pub fn new(height: u64, time: u64, orders_expired: u64, state_root: [u8; 32]) -> Self {
        Self {
            height,
            time,
            orders_expired,
            state_root,
        }
    }

    /// Get the state root as a hex string
    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_new() {
        let receipt = BlockReceipt::new(343, 1_700_000_000, 2, [1u8; 32]);
        assert_eq!(receipt.height, 343);
        assert_eq!(receipt.time, 1_700_000_000);
        assert_eq!(receipt.orders_expired, 2);
        assert_eq!(receipt.state_root, [1u8; 32]);
    }

    #[test]
    fn test_receipt_state_root_hex() {
        let receipt = BlockReceipt::new(1, 0, 0, [0xAB; 32]);
        let hex = receipt.state_root_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_receipt_ssz_roundtrip() {
        let receipt = BlockReceipt::new(10, 20, 3, [0xAB; 32]);
        let serialized = ssz_rs::serialize(&receipt).expect("Failed to serialize");
        let deserialized: BlockReceipt =
            ssz_rs::deserialize(&serialized).expect("Failed to deserialize");
        assert_eq!(receipt, deserialized);
        // 8 + 8 + 8 + 32
        assert_eq!(serialized.len(), 56);
    }
}
