use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::crypto::{sha256_hex, verify_signature, Address, CryptoError, DigitalSignature, Wallet};

/// Errors that can occur during transaction operations
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Transaction is not signed")]
    MissingSignature,

    #[error("Signing key does not match the sender address")]
    UnauthorizedSigner,

    #[error("Crypto error: {0}")]
    CryptoError(#[from] CryptoError),
}

/// Represents a value transfer in the blockchain
///
/// A transaction with no sender is a mining reward, issued by the chain
/// itself when a block is mined. Reward transactions carry no signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender's address, `None` for mining rewards
    pub sender: Option<Address>,

    /// Recipient's address
    pub recipient: Address,

    /// Amount being transferred, in whole coin units
    pub amount: u64,

    /// Digital signature over the transaction's content hash
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<DigitalSignature>,
}

impl Transaction {
    /// Creates a new unsigned transaction
    ///
    /// # Arguments
    ///
    /// * `sender` - The address of the sender
    /// * `recipient` - The address of the recipient
    /// * `amount` - The amount to transfer
    pub fn new(sender: Address, recipient: Address, amount: u64) -> Self {
        Transaction {
            sender: Some(sender),
            recipient,
            amount,
            signature: None,
        }
    }

    /// Creates a mining reward transaction
    ///
    /// Only the chain is allowed to mint these.
    pub(crate) fn new_reward(recipient: Address, amount: u64) -> Self {
        Transaction {
            sender: None,
            recipient,
            amount,
            signature: None,
        }
    }

    /// Computes the hash of the transaction's transfer content
    ///
    /// The preimage is a structured encoding of `(sender, recipient,
    /// amount)` and nothing else; the same transfer always hashes to
    /// the same digest.
    pub fn content_hash(&self) -> String {
        let data = serde_json::json!({
            "sender": self.sender,
            "recipient": self.recipient.0,
            "amount": self.amount,
        });

        sha256_hex(data.to_string().as_bytes())
    }

    /// Signs the transaction with a wallet
    ///
    /// Fails unless the wallet holds the key for the declared sender.
    /// Signing again overwrites the previous signature.
    pub fn sign(&mut self, wallet: &Wallet) -> Result<(), TransactionError> {
        if self.sender.as_ref() != Some(wallet.address()) {
            return Err(TransactionError::UnauthorizedSigner);
        }

        let content_hash = self.content_hash();
        self.signature = Some(wallet.sign(content_hash.as_bytes()));

        Ok(())
    }

    /// Checks whether the transaction's signature is valid
    ///
    /// Mining rewards are valid by construction. A missing signature on
    /// a transfer is an error; a signature that fails verification is
    /// reported as `Ok(false)`.
    pub fn is_valid(&self) -> Result<bool, TransactionError> {
        let sender = match &self.sender {
            Some(sender) => sender,
            None => return Ok(true),
        };

        let signature = match &self.signature {
            Some(sig) => sig,
            None => return Err(TransactionError::MissingSignature),
        };

        let public_key = sender.to_public_key()?;
        let content_hash = self.content_hash();

        Ok(verify_signature(
            content_hash.as_bytes(),
            signature,
            &public_key,
        ))
    }

    /// Checks if the transaction is a mining reward
    pub fn is_reward(&self) -> bool {
        self.sender.is_none()
    }
}
