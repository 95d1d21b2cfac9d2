use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use super::crypto::sha256_hex;
use super::transaction::Transaction;

/// Represents a block in the blockchain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Timestamp when the block was created
    pub timestamp: DateTime<Utc>,

    /// List of transactions included in this block
    pub transactions: Vec<Transaction>,

    /// Hash of the previous block
    pub previous_hash: String,

    /// Nonce varied during mining
    pub nonce: u64,

    /// Hash of the current block (derived from the other fields)
    pub hash: String,
}

impl Block {
    /// Creates a new block
    ///
    /// # Arguments
    ///
    /// * `timestamp` - The creation time of the block
    /// * `transactions` - The list of transactions to include in the block
    /// * `previous_hash` - The hash of the previous block
    ///
    /// # Returns
    ///
    /// A new Block instance with `nonce = 0` and its initial hash computed
    pub fn new(
        timestamp: DateTime<Utc>,
        transactions: Vec<Transaction>,
        previous_hash: String,
    ) -> Self {
        let mut block = Block {
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            hash: String::new(),
        };

        block.hash = block.compute_hash();
        block
    }

    /// Calculates the hash of the block
    ///
    /// The preimage is a structured encoding of `(previous_hash,
    /// timestamp, transactions, nonce)` and nothing else; variable
    /// length fields stay unambiguous in the encoding.
    pub fn compute_hash(&self) -> String {
        let block_data = serde_json::json!({
            "previous_hash": self.previous_hash,
            "timestamp": self.timestamp,
            "transactions": self.transactions,
            "nonce": self.nonce,
        });

        sha256_hex(block_data.to_string().as_bytes())
    }

    /// Performs the proof-of-work search for this block
    ///
    /// Increments the nonce and rehashes until the hash starts with
    /// `difficulty` zero characters. Runs until a qualifying nonce is
    /// found, however long that takes; the caller is occupied for the
    /// whole search.
    pub fn mine(&mut self, difficulty: usize) {
        let target = "0".repeat(difficulty);

        while !self.hash.starts_with(&target) {
            self.nonce += 1;
            self.hash = self.compute_hash();
        }

        info!("Block mined: {}", self.hash);
    }

    /// Checks that every transaction in the block is valid
    ///
    /// Stops at the first invalid transaction. Validation failures are
    /// reported as `false`, never as an error.
    pub fn has_valid_transactions(&self) -> bool {
        self.transactions
            .iter()
            .all(|tx| tx.is_valid().unwrap_or(false))
    }
}
