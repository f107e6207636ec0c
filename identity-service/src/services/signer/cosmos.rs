//! Cosmos-family signature verification.
//!
//! Cosmos signatures are plain secp256k1 over SHA-256 and cannot
//! recover the signing key, so the wallet supplies its compressed
//! public key alongside the signature. The key is only trusted after
//! confirming it hashes (RIPEMD-160 of SHA-256, bech32-encoded) to
//! the claimed address.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bech32::FromBase32;
use k256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use super::{SignatureVerifier, SignerError};

pub struct CosmosVerifier;

impl SignatureVerifier for CosmosVerifier {
    fn verify(
        &self,
        address: &str,
        message: &str,
        signature: &str,
        public_key: Option<&str>,
    ) -> Result<bool, SignerError> {
        let public_key = public_key.ok_or(SignerError::MissingPublicKey)?;

        let key_bytes = BASE64
            .decode(public_key)
            .map_err(|e| SignerError::InvalidPublicKey(e.to_string()))?;
        if key_bytes.len() != 33 {
            return Err(SignerError::InvalidPublicKey(format!(
                "expected 33-byte compressed key, got {}",
                key_bytes.len()
            )));
        }

        // The supplied key must hash to the claimed address before it
        // is allowed to vouch for anything.
        let (_hrp, address_hash) = decode_cosmos_address(address)?;
        if pubkey_hash(&key_bytes) != address_hash.as_slice() {
            return Ok(false);
        }

        let verifying_key = VerifyingKey::from_sec1_bytes(&key_bytes)
            .map_err(|e| SignerError::InvalidPublicKey(e.to_string()))?;

        let sig_bytes = BASE64
            .decode(signature)
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
        let signature = Signature::from_slice(&sig_bytes)
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;

        // Verifier for secp256k1 hashes the message with SHA-256.
        Ok(verifying_key.verify(message.as_bytes(), &signature).is_ok())
    }
}

/// RIPEMD-160(SHA-256(compressed key)) - the 20-byte account hash.
fn pubkey_hash(key_bytes: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(key_bytes);
    Ripemd160::digest(sha).into()
}

/// Decode a bech32 address into its prefix and 20-byte account hash.
fn decode_cosmos_address(address: &str) -> Result<(String, Vec<u8>), SignerError> {
    let (hrp, data, variant) =
        bech32::decode(address).map_err(|e| SignerError::InvalidAddress(e.to_string()))?;

    if variant != bech32::Variant::Bech32 {
        return Err(SignerError::InvalidAddress(
            "expected bech32 (not bech32m) encoding".to_string(),
        ));
    }

    let bytes = Vec::<u8>::from_base32(&data)
        .map_err(|e| SignerError::InvalidAddress(e.to_string()))?;
    if bytes.len() != 20 {
        return Err(SignerError::InvalidAddress(format!(
            "expected 20-byte account hash, got {}",
            bytes.len()
        )));
    }

    Ok((hrp, bytes))
}

/// Bech32 addresses are canonically lowercase; reject mixed case and
/// anything that fails checksum validation.
pub fn normalize_cosmos_address(address: &str) -> Result<String, SignerError> {
    let lowered = address.to_lowercase();
    decode_cosmos_address(&lowered)?;
    Ok(lowered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bech32::ToBase32;
    use k256::ecdsa::{signature::Signer, SigningKey};
    use rand::rngs::OsRng;

    fn generate() -> (SigningKey, String, String) {
        let key = SigningKey::random(&mut OsRng);
        let compressed = key.verifying_key().to_encoded_point(true);
        let address = bech32::encode(
            "cosmos",
            pubkey_hash(compressed.as_bytes()).to_base32(),
            bech32::Variant::Bech32,
        )
        .unwrap();
        let public_key = BASE64.encode(compressed.as_bytes());
        (key, address, public_key)
    }

    #[test]
    fn verifies_signature_with_matching_key() {
        let (key, address, public_key) = generate();
        let message = "example.com wants you to sign in\n\nNonce: abc123";
        let signature: Signature = key.sign(message.as_bytes());
        let signature = BASE64.encode(signature.to_bytes());

        let ok = CosmosVerifier
            .verify(&address, message, &signature, Some(&public_key))
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn rejects_key_that_does_not_hash_to_address() {
        let (key, address, _) = generate();
        let (_, _, other_public_key) = generate();
        let message = "sign me";
        let signature: Signature = key.sign(message.as_bytes());
        let signature = BASE64.encode(signature.to_bytes());

        let ok = CosmosVerifier
            .verify(&address, message, &signature, Some(&other_public_key))
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn rejects_tampered_message() {
        let (key, address, public_key) = generate();
        let signature: Signature = key.sign(b"original message");
        let signature = BASE64.encode(signature.to_bytes());

        let ok = CosmosVerifier
            .verify(&address, "tampered message", &signature, Some(&public_key))
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn missing_public_key_is_an_error() {
        let (_, address, _) = generate();
        assert!(matches!(
            CosmosVerifier.verify(&address, "msg", "c2ln", None),
            Err(SignerError::MissingPublicKey)
        ));
    }

    #[test]
    fn address_normalization_checks_checksum() {
        let (_, address, _) = generate();
        assert_eq!(normalize_cosmos_address(&address).unwrap(), address);

        let mut corrupted = address.clone();
        corrupted.pop();
        corrupted.push(if address.ends_with('q') { 'p' } else { 'q' });
        assert!(normalize_cosmos_address(&corrupted).is_err());
    }
}
