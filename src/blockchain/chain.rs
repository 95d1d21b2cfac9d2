use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use thiserror::Error;

use super::block::Block;
use super::crypto::Address;
use super::transaction::Transaction;

/// Errors that can occur when submitting transactions to the chain
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid transaction signature")]
    InvalidSignature,
}

/// Represents the blockchain
///
/// An owned, single-threaded value: callers pass it by reference to the
/// operations below, and `mine_pending_transactions` is the only
/// operation that grows the chain.
#[derive(Debug, Serialize)]
pub struct Blockchain {
    /// The chain of blocks, starting with the genesis block
    blocks: Vec<Block>,

    /// Mining difficulty (number of leading zeros required in a hash)
    difficulty: usize,

    /// Pending transactions to be included in the next block
    pending_transactions: Vec<Transaction>,

    /// Reward paid to the miner of each block
    mining_reward: u64,
}

impl Blockchain {
    /// Creates a new blockchain with a genesis block
    pub fn new() -> Self {
        let mut blockchain = Blockchain {
            blocks: Vec::new(),
            difficulty: 2,
            pending_transactions: Vec::new(),
            mining_reward: 100,
        };

        blockchain.blocks.push(Self::create_genesis_block());
        blockchain
    }

    /// Creates the genesis block (first block in the chain)
    ///
    /// The genesis block carries no transactions, so it never
    /// contributes to balance replay; it exists only as the anchor the
    /// first mined block links to. The fixed timestamp keeps its hash
    /// deterministic.
    fn create_genesis_block() -> Block {
        Block::new(DateTime::<Utc>::UNIX_EPOCH, Vec::new(), "0".to_string())
    }

    /// Gets the last block in the chain
    pub fn latest_block(&self) -> &Block {
        self.blocks
            .last()
            .expect("chain always contains the genesis block")
    }

    /// Adds a new transaction to the pending pool
    ///
    /// The transaction must name both parties and carry a valid
    /// signature. Mining rewards are minted by the chain during
    /// `mine_pending_transactions` and cannot be submitted here. A
    /// rejected transaction never reaches the pool.
    ///
    /// # Arguments
    ///
    /// * `transaction` - The signed transaction to add
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<(), BlockchainError> {
        let sender = transaction.sender.as_ref().ok_or_else(|| {
            BlockchainError::InvalidAddress("Transaction must include a sender address".to_string())
        })?;

        if sender.is_empty() {
            return Err(BlockchainError::InvalidAddress(
                "Sender address must not be empty".to_string(),
            ));
        }

        if transaction.recipient.is_empty() {
            return Err(BlockchainError::InvalidAddress(
                "Recipient address must not be empty".to_string(),
            ));
        }

        // A missing signature and a failing signature are both rejected
        if !transaction.is_valid().unwrap_or(false) {
            return Err(BlockchainError::InvalidSignature);
        }

        self.pending_transactions.push(transaction);
        Ok(())
    }

    /// Mines a new block with the pending transactions
    ///
    /// Adds the mining reward for `reward_address` to the pool, runs the
    /// proof-of-work search over the whole batch, appends the block, and
    /// leaves the pool empty. This is the only operation that advances
    /// the chain.
    ///
    /// # Arguments
    ///
    /// * `reward_address` - The address credited with the mining reward
    pub fn mine_pending_transactions(&mut self, reward_address: &Address) {
        let reward_transaction =
            Transaction::new_reward(reward_address.clone(), self.mining_reward);
        self.pending_transactions.push(reward_transaction);

        let transactions = std::mem::take(&mut self.pending_transactions);
        let mut block = Block::new(
            Utc::now(),
            transactions,
            self.latest_block().hash.clone(),
        );

        block.mine(self.difficulty);

        info!(
            "Block successfully mined with {} transactions",
            block.transactions.len()
        );
        self.blocks.push(block);
    }

    /// Gets the balance of an address
    ///
    /// Replays every transaction in every mined block: outgoing amounts
    /// are subtracted, incoming amounts are added. Linear in the total
    /// number of transactions; nothing is cached. The result is signed
    /// because submission does not check funds.
    pub fn balance_of(&self, address: &Address) -> i64 {
        let mut balance = 0;

        for block in &self.blocks {
            for transaction in &block.transactions {
                if transaction.sender.as_ref() == Some(address) {
                    balance -= transaction.amount as i64;
                }
                if &transaction.recipient == address {
                    balance += transaction.amount as i64;
                }
            }
        }

        balance
    }

    /// Validates the blockchain
    ///
    /// Every block after genesis must contain only valid transactions,
    /// carry the hash of its own contents, and link to the hash of its
    /// predecessor. Tampering anywhere in the chain makes this false.
    pub fn is_chain_valid(&self) -> bool {
        for i in 1..self.blocks.len() {
            let current_block = &self.blocks[i];
            let previous_block = &self.blocks[i - 1];

            if !current_block.has_valid_transactions() {
                return false;
            }

            if current_block.hash != current_block.compute_hash() {
                return false;
            }

            if current_block.previous_hash != previous_block.hash {
                return false;
            }
        }

        true
    }

    /// Gets the blocks in the chain
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Gets the transactions waiting to be mined
    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    /// Gets the mining difficulty
    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Gets the mining reward
    pub fn mining_reward(&self) -> u64 {
        self.mining_reward
    }

    /// Renders the whole chain as a human-inspectable JSON snapshot
    ///
    /// Advisory output for logging and debugging, not a compatibility
    /// format.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::crypto::Wallet;

    fn signed_transfer(from: &Wallet, to: &Wallet, amount: u64) -> Transaction {
        let mut tx = Transaction::new(from.address().clone(), to.address().clone(), amount);
        tx.sign(from).unwrap();
        tx
    }

    #[test]
    fn test_new_blockchain() {
        let blockchain = Blockchain::new();

        assert_eq!(blockchain.blocks().len(), 1);
        assert_eq!(blockchain.latest_block().previous_hash, "0");
        assert!(blockchain.latest_block().transactions.is_empty());
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_genesis_is_deterministic() {
        let a = Blockchain::new();
        let b = Blockchain::new();

        assert_eq!(a.latest_block().hash, b.latest_block().hash);
    }

    #[test]
    fn test_add_transaction() {
        let mut blockchain = Blockchain::new();
        let sender = Wallet::new();
        let recipient = Wallet::new();

        blockchain
            .add_transaction(signed_transfer(&sender, &recipient, 10))
            .unwrap();

        assert_eq!(blockchain.pending_transactions().len(), 1);
    }

    #[test]
    fn test_add_transaction_rejects_missing_sender() {
        let mut blockchain = Blockchain::new();
        let recipient = Wallet::new();

        // Reward transactions may only be minted by the chain itself
        let reward = Transaction::new_reward(recipient.address().clone(), 100);
        let result = blockchain.add_transaction(reward);

        assert!(matches!(result, Err(BlockchainError::InvalidAddress(_))));
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_add_transaction_rejects_empty_recipient() {
        let mut blockchain = Blockchain::new();
        let sender = Wallet::new();

        let mut tx = Transaction::new(sender.address().clone(), Address(String::new()), 10);
        tx.sign(&sender).unwrap();
        let result = blockchain.add_transaction(tx);

        assert!(matches!(result, Err(BlockchainError::InvalidAddress(_))));
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_add_transaction_rejects_unsigned() {
        let mut blockchain = Blockchain::new();
        let sender = Wallet::new();
        let recipient = Wallet::new();

        let tx = Transaction::new(sender.address().clone(), recipient.address().clone(), 10);
        let result = blockchain.add_transaction(tx);

        assert!(matches!(result, Err(BlockchainError::InvalidSignature)));
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_add_transaction_rejects_tampered() {
        let mut blockchain = Blockchain::new();
        let sender = Wallet::new();
        let recipient = Wallet::new();

        let mut tx = signed_transfer(&sender, &recipient, 10);
        tx.amount = 1_000;
        let result = blockchain.add_transaction(tx);

        assert!(matches!(result, Err(BlockchainError::InvalidSignature)));
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_mine_pending_transactions() {
        let mut blockchain = Blockchain::new();
        let sender = Wallet::new();
        let recipient = Wallet::new();
        let miner = Wallet::new();

        blockchain
            .add_transaction(signed_transfer(&sender, &recipient, 10))
            .unwrap();
        blockchain.mine_pending_transactions(miner.address());

        assert_eq!(blockchain.blocks().len(), 2);
        assert!(blockchain.pending_transactions().is_empty());

        let block = blockchain.latest_block();
        assert_eq!(block.transactions.len(), 2); // transfer + mining reward
        assert!(block.transactions[1].is_reward());
        assert_eq!(&block.transactions[1].recipient, miner.address());

        let target = "0".repeat(blockchain.difficulty());
        assert!(block.hash.starts_with(&target));
    }

    #[test]
    fn test_balance_replay() {
        let mut blockchain = Blockchain::new();
        let miner = Wallet::new();
        let recipient = Wallet::new();
        let other_miner = Wallet::new();

        // Genesis carries no transactions, so every balance starts at zero
        assert_eq!(blockchain.balance_of(miner.address()), 0);

        // One mined block pays the full reward
        blockchain.mine_pending_transactions(miner.address());
        assert_eq!(blockchain.balance_of(miner.address()), 100);

        // Spending 10 in a later block leaves the reward minus the spend
        blockchain
            .add_transaction(signed_transfer(&miner, &recipient, 10))
            .unwrap();
        blockchain.mine_pending_transactions(other_miner.address());

        assert_eq!(blockchain.balance_of(miner.address()), 90);
        assert_eq!(blockchain.balance_of(recipient.address()), 10);
        assert_eq!(blockchain.balance_of(other_miner.address()), 100);
    }

    #[test]
    fn test_end_to_end_transfer_and_mine() {
        let mut blockchain = Blockchain::new();
        let alice = Wallet::new();
        let bob = Wallet::new();

        blockchain
            .add_transaction(signed_transfer(&alice, &bob, 10))
            .unwrap();
        blockchain.mine_pending_transactions(alice.address());

        // Reward and spend land in the same block: 100 - 10
        assert_eq!(blockchain.balance_of(alice.address()), 90);
        assert_eq!(blockchain.balance_of(bob.address()), 10);
        assert!(blockchain.is_chain_valid());
    }

    #[test]
    fn test_chain_stays_valid_over_successive_mines() {
        let mut blockchain = Blockchain::new();
        let miner = Wallet::new();

        for _ in 0..3 {
            blockchain.mine_pending_transactions(miner.address());
        }

        assert_eq!(blockchain.blocks().len(), 4);
        assert!(blockchain.is_chain_valid());
    }

    #[test]
    fn test_tampered_transaction_invalidates_chain() {
        let mut blockchain = Blockchain::new();
        let sender = Wallet::new();
        let recipient = Wallet::new();

        blockchain
            .add_transaction(signed_transfer(&sender, &recipient, 10))
            .unwrap();
        blockchain.mine_pending_transactions(sender.address());
        assert!(blockchain.is_chain_valid());

        // Rewrite an amount inside the mined block
        blockchain.blocks[1].transactions[0].amount = 1_000;

        assert!(!blockchain.is_chain_valid());
    }

    #[test]
    fn test_recomputed_hash_still_breaks_linkage() {
        let mut blockchain = Blockchain::new();
        let sender = Wallet::new();
        let recipient = Wallet::new();
        let miner = Wallet::new();

        blockchain
            .add_transaction(signed_transfer(&sender, &recipient, 10))
            .unwrap();
        blockchain.mine_pending_transactions(miner.address());
        blockchain.mine_pending_transactions(miner.address());
        assert!(blockchain.is_chain_valid());

        // Tamper with the reward amount (rewards carry no signature, so
        // transaction validation cannot catch this) and cover it up by
        // recomputing the block's own hash; the next block still links
        // to the old hash
        blockchain.blocks[1].transactions[1].amount = 1_000_000;
        blockchain.blocks[1].hash = blockchain.blocks[1].compute_hash();

        assert!(!blockchain.is_chain_valid());
    }

    #[test]
    fn test_json_snapshot() {
        let mut blockchain = Blockchain::new();
        let miner = Wallet::new();

        blockchain.mine_pending_transactions(miner.address());

        let snapshot = blockchain.to_json_pretty().unwrap();
        assert!(snapshot.contains("\"blocks\""));
        assert!(snapshot.contains(&miner.address().0));
    }
}
