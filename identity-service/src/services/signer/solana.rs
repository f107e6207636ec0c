//! Solana-family signature verification.
//!
//! The address is the base58-encoded 32-byte Ed25519 public key, so
//! verification needs no separate key material: decode the address,
//! decode the base58 signature, verify over the raw message bytes.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use super::{SignatureVerifier, SignerError};

pub struct SolanaVerifier;

impl SignatureVerifier for SolanaVerifier {
    fn verify(
        &self,
        address: &str,
        message: &str,
        signature: &str,
        _public_key: Option<&str>,
    ) -> Result<bool, SignerError> {
        let key_bytes = decode_solana_pubkey(address)?;

        let sig_bytes = bs58::decode(signature)
            .into_vec()
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
        let signature = Signature::from_slice(&sig_bytes)
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;

        let verifying_key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| SignerError::InvalidPublicKey(e.to_string()))?;

        Ok(verifying_key.verify(message.as_bytes(), &signature).is_ok())
    }
}

/// Validate a base58 address and return the raw 32-byte public key.
fn decode_solana_pubkey(address: &str) -> Result<[u8; 32], SignerError> {
    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|e| SignerError::InvalidAddress(e.to_string()))?;

    decoded
        .try_into()
        .map_err(|_| SignerError::InvalidAddress("expected 32 bytes".to_string()))
}

/// Solana addresses are case-sensitive base58; normalization only
/// validates the encoding.
pub fn normalize_solana_address(address: &str) -> Result<String, SignerError> {
    decode_solana_pubkey(address)?;
    Ok(address.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    fn generate() -> (SigningKey, String) {
        let key = SigningKey::generate(&mut OsRng);
        let address = bs58::encode(key.verifying_key().to_bytes()).into_string();
        (key, address)
    }

    #[test]
    fn verifies_signature_from_address_key() {
        let (key, address) = generate();
        let message = "example.com wants you to sign in\n\nNonce: abc123";
        let signature = bs58::encode(key.sign(message.as_bytes()).to_bytes()).into_string();

        let ok = SolanaVerifier
            .verify(&address, message, &signature, None)
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn rejects_signature_from_other_key() {
        let (key, _) = generate();
        let (_, other_address) = generate();
        let message = "sign me";
        let signature = bs58::encode(key.sign(message.as_bytes()).to_bytes()).into_string();

        let ok = SolanaVerifier
            .verify(&other_address, message, &signature, None)
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn rejects_tampered_message() {
        let (key, address) = generate();
        let signature =
            bs58::encode(key.sign(b"original message").to_bytes()).into_string();

        let ok = SolanaVerifier
            .verify(&address, "tampered message", &signature, None)
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn malformed_inputs_are_errors() {
        let (_, address) = generate();
        assert!(SolanaVerifier
            .verify(&address, "msg", "0OIl not base58", None)
            .is_err());
        assert!(SolanaVerifier
            .verify("tooshort", "msg", &address, None)
            .is_err());
    }
}
