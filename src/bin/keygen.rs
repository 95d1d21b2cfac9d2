use minichain::blockchain::Wallet;

/// Generates a fresh keypair and prints it. The public key doubles as
/// the account address; the private key signs transactions and should
/// be kept out of version control.
fn main() {
    let wallet = Wallet::new();

    println!("Private key: {}", hex::encode(wallet.export_secret_key()));
    println!();
    println!("Public key:  {}", wallet.address());
}
