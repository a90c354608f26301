//! Generate the RSA key pair and shared secrets the license server needs.
//!
//! Usage: `generate-keys [output_dir]` (defaults to the current directory)

use license_server::security::generate_shared_secret;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use std::io;
use std::path::PathBuf;

const KEY_BITS: usize = 2048;

fn main() -> io::Result<()> {
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    println!("🔐 Generating RSA-{} key pair...", KEY_BITS);

    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, KEY_BITS).map_err(io::Error::other)?;

    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(io::Error::other)?;
    let public_pem = private_key
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(io::Error::other)?;

    std::fs::create_dir_all(&output_dir)?;
    let private_path = output_dir.join("private_key.pem");
    let public_path = output_dir.join("public_key.pem");
    std::fs::write(&private_path, private_pem.as_bytes())?;
    std::fs::write(&public_path, public_pem.as_bytes())?;

    println!("✅ Keys written:");
    println!("   📄 {} (keep secret)", private_path.display());
    println!("   📄 {} (embed in the client app)", public_path.display());
    println!();
    println!("{}", public_pem);
    println!("⚠️ Add to the server .env:");
    println!("HMAC_SECRET={}", generate_shared_secret());
    println!("ADMIN_API_KEY={}", generate_shared_secret());

    Ok(())
}
