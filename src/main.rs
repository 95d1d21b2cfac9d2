use anyhow::{Context, Result};
use log::{info, warn};

use minichain::blockchain::{Blockchain, Transaction, Wallet};

/// Loads a wallet from a hex-encoded secret key in the environment,
/// falling back to a freshly generated keypair when the variable is
/// unset. Run the `keygen` binary to produce keys worth keeping.
fn load_wallet(env_var: &str) -> Result<Wallet> {
    match std::env::var(env_var) {
        Ok(secret_hex) => {
            let secret = hex::decode(secret_hex.trim())
                .with_context(|| format!("{} is not valid hex", env_var))?;
            let wallet = Wallet::from_secret_key(&secret)
                .with_context(|| format!("{} holds malformed key material", env_var))?;

            info!("Loaded wallet {} from {}", wallet.address(), env_var);
            Ok(wallet)
        }
        Err(_) => {
            let wallet = Wallet::new();
            warn!(
                "{} not set, generated throwaway wallet {}",
                env_var,
                wallet.address()
            );
            Ok(wallet)
        }
    }
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let my_wallet = load_wallet("MINICHAIN_SECRET_KEY")?;
    let other_wallet = load_wallet("MINICHAIN_OTHER_SECRET_KEY")?;

    let mut chain = Blockchain::new();

    // Send 10 coins to the other wallet, then mine the block that
    // carries the transfer together with the mining reward
    let mut tx = Transaction::new(
        my_wallet.address().clone(),
        other_wallet.address().clone(),
        10,
    );
    tx.sign(&my_wallet)?;
    chain.add_transaction(tx)?;

    info!("Starting the miner...");
    chain.mine_pending_transactions(my_wallet.address());

    info!(
        "Balance of {} is {}",
        my_wallet.address(),
        chain.balance_of(my_wallet.address())
    );
    info!(
        "Balance of {} is {}",
        other_wallet.address(),
        chain.balance_of(other_wallet.address())
    );
    info!("Is chain valid? {}", chain.is_chain_valid());

    // Field-by-field dump of the whole chain for inspection
    println!("{}", chain.to_json_pretty()?);

    Ok(())
}
