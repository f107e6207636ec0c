//! Ethereum-family signature verification.
//!
//! Wallets sign with `personal_sign` (EIP-191): the message is
//! prefixed, Keccak-256 hashed, and signed with secp256k1. The public
//! key is recovered from the 65-byte r||s||v signature and reduced to
//! an address, so no key needs to be transmitted.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

use super::{SignatureVerifier, SignerError};

pub struct EvmVerifier;

impl SignatureVerifier for EvmVerifier {
    fn verify(
        &self,
        address: &str,
        message: &str,
        signature: &str,
        _public_key: Option<&str>,
    ) -> Result<bool, SignerError> {
        let address = normalize_evm_address(address)?;

        let sig_bytes = decode_hex(signature)
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
        if sig_bytes.len() != 65 {
            return Err(SignerError::InvalidSignature(format!(
                "expected 65 bytes, got {}",
                sig_bytes.len()
            )));
        }

        // v is transmitted as 27/28 by most wallets, 0/1 by some.
        let v = sig_bytes[64];
        let recovery_byte = if v >= 27 { v - 27 } else { v };
        let recovery_id = RecoveryId::from_byte(recovery_byte).ok_or_else(|| {
            SignerError::InvalidSignature(format!("invalid recovery byte: {}", v))
        })?;

        let signature = Signature::from_slice(&sig_bytes[..64])
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;

        let digest = eip191_hash(message);
        let recovered = match VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        {
            Ok(key) => key,
            Err(_) => return Ok(false),
        };

        Ok(address_from_pubkey(&recovered) == address)
    }
}

/// Keccak-256 convenience wrapper.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// EIP-191 personal-message hash: prefix with
/// "\x19Ethereum Signed Message:\n" + byte length, then Keccak-256.
fn eip191_hash(message: &str) -> [u8; 32] {
    let prefixed = format!(
        "\x19Ethereum Signed Message:\n{}{}",
        message.len(),
        message
    );
    keccak256(prefixed.as_bytes())
}

/// Derive the 0x-prefixed lowercase address from a recovered key:
/// Keccak-256 of the uncompressed point (minus the 0x04 tag), last 20
/// bytes.
pub fn address_from_pubkey(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&digest[12..]))
}

/// Validate and lowercase a 0x-prefixed 20-byte hex address.
pub fn normalize_evm_address(address: &str) -> Result<String, SignerError> {
    let stripped = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| SignerError::InvalidAddress("missing 0x prefix".to_string()))?;

    if stripped.len() != 40 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SignerError::InvalidAddress(
            "expected 20 hex-encoded bytes".to_string(),
        ));
    }

    Ok(format!("0x{}", stripped.to_lowercase()))
}

fn decode_hex(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let stripped = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;
    use rand::rngs::OsRng;

    fn sign_personal(key: &SigningKey, message: &str) -> String {
        let digest = eip191_hash(message);
        let (sig, recovery_id) = key
            .sign_prehash_recoverable(&digest)
            .expect("signing failed");
        let mut bytes = sig.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        format!("0x{}", hex::encode(bytes))
    }

    #[test]
    fn recovers_signer_address() {
        let key = SigningKey::random(&mut OsRng);
        let address = address_from_pubkey(key.verifying_key());
        let message = "example.com wants you to sign in\n\nNonce: abc123";
        let signature = sign_personal(&key, message);

        let ok = EvmVerifier
            .verify(&address, message, &signature, None)
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn rejects_wrong_address() {
        let key = SigningKey::random(&mut OsRng);
        let other = SigningKey::random(&mut OsRng);
        let message = "sign me";
        let signature = sign_personal(&key, message);

        let ok = EvmVerifier
            .verify(&address_from_pubkey(other.verifying_key()), message, &signature, None)
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn rejects_tampered_message() {
        let key = SigningKey::random(&mut OsRng);
        let address = address_from_pubkey(key.verifying_key());
        let signature = sign_personal(&key, "original message");

        let ok = EvmVerifier
            .verify(&address, "tampered message", &signature, None)
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn malformed_signature_is_an_error() {
        let key = SigningKey::random(&mut OsRng);
        let address = address_from_pubkey(key.verifying_key());

        assert!(EvmVerifier
            .verify(&address, "msg", "0xdeadbeef", None)
            .is_err());
        assert!(EvmVerifier
            .verify(&address, "msg", "not hex at all", None)
            .is_err());
    }

    #[test]
    fn address_normalization() {
        let addr = "0xAbCdEf0123456789aBcDeF0123456789abcdef01";
        assert_eq!(
            normalize_evm_address(addr).unwrap(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );
        assert!(normalize_evm_address("abcdef").is_err());
        assert!(normalize_evm_address("0x1234").is_err());
    }
}
