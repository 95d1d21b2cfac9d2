//! A minimal educational blockchain: an append-only chain of
//! proof-of-work blocks holding signed value-transfer transactions.
//!
//! The [`blockchain`] module is the whole engine; embed it by creating a
//! [`blockchain::Blockchain`], submitting signed
//! [`blockchain::Transaction`]s, and mining them into blocks.

pub mod blockchain;

pub use blockchain::{Address, Block, Blockchain, BlockchainError, Transaction, Wallet};
