//! Chain-family signature verification.
//!
//! Each supported wallet family exposes the same capability: a pure
//! predicate deciding whether `signature` over `message` proves
//! control of `address`. Verifiers never touch the challenge store or
//! the database; the identity resolver consumes a challenge first and
//! only then calls into this module.

pub mod cosmos;
pub mod evm;
pub mod solana;

use thiserror::Error;

use crate::models::AuthProvider;

pub use cosmos::CosmosVerifier;
pub use evm::EvmVerifier;
pub use solana::SolanaVerifier;

/// Errors for malformed verification inputs. A well-formed signature
/// that simply does not match yields `Ok(false)` from `verify`, not
/// an error.
#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid signature encoding: {0}")]
    InvalidSignature(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Public key is required for this chain family")]
    MissingPublicKey,
}

/// A blockchain signature scheme family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainFamily {
    /// ECDSA-recovery over Keccak-256 (EIP-191 personal_sign).
    Evm,
    /// Ed25519 over raw message bytes, base58 addresses.
    Solana,
    /// secp256k1 over SHA-256, bech32 addresses derived from the
    /// supplied public key.
    Cosmos,
}

impl ChainFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFamily::Evm => "evm",
            ChainFamily::Solana => "solana",
            ChainFamily::Cosmos => "cosmos",
        }
    }

    /// Human label used in sign-in message templates.
    pub fn display_name(&self) -> &'static str {
        match self {
            ChainFamily::Evm => "Ethereum",
            ChainFamily::Solana => "Solana",
            ChainFamily::Cosmos => "Cosmos",
        }
    }
}

impl std::str::FromStr for ChainFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "evm" | "ethereum" => Ok(ChainFamily::Evm),
            "solana" => Ok(ChainFamily::Solana),
            "cosmos" => Ok(ChainFamily::Cosmos),
            _ => Err(format!("Unsupported chain family: {}", s)),
        }
    }
}

impl From<ChainFamily> for AuthProvider {
    fn from(chain: ChainFamily) -> Self {
        match chain {
            ChainFamily::Evm => AuthProvider::Evm,
            ChainFamily::Solana => AuthProvider::Solana,
            ChainFamily::Cosmos => AuthProvider::Cosmos,
        }
    }
}

/// Capability interface implemented once per chain family.
pub trait SignatureVerifier: Send + Sync {
    /// Check that `signature` over `message` proves control of
    /// `address`. `public_key` is only consulted by families whose
    /// signatures do not permit key recovery (Cosmos).
    fn verify(
        &self,
        address: &str,
        message: &str,
        signature: &str,
        public_key: Option<&str>,
    ) -> Result<bool, SignerError>;
}

static EVM: EvmVerifier = EvmVerifier;
static SOLANA: SolanaVerifier = SolanaVerifier;
static COSMOS: CosmosVerifier = CosmosVerifier;

/// Select the verifier for a chain family.
pub fn verifier_for(chain: ChainFamily) -> &'static dyn SignatureVerifier {
    match chain {
        ChainFamily::Evm => &EVM,
        ChainFamily::Solana => &SOLANA,
        ChainFamily::Cosmos => &COSMOS,
    }
}

/// Normalize a claimed address to its canonical stored form,
/// rejecting malformed input.
pub fn normalize_address(chain: ChainFamily, address: &str) -> Result<String, SignerError> {
    match chain {
        ChainFamily::Evm => evm::normalize_evm_address(address),
        ChainFamily::Solana => solana::normalize_solana_address(address),
        ChainFamily::Cosmos => cosmos::normalize_cosmos_address(address),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_families_parse_from_path_segment() {
        assert_eq!("evm".parse::<ChainFamily>().unwrap(), ChainFamily::Evm);
        assert_eq!(
            "ethereum".parse::<ChainFamily>().unwrap(),
            ChainFamily::Evm
        );
        assert_eq!(
            "Solana".parse::<ChainFamily>().unwrap(),
            ChainFamily::Solana
        );
        assert!("bitcoin".parse::<ChainFamily>().is_err());
    }

    #[test]
    fn chain_family_maps_to_provider_code() {
        assert_eq!(AuthProvider::from(ChainFamily::Evm).as_str(), "evm");
        assert_eq!(AuthProvider::from(ChainFamily::Cosmos).as_str(), "cosmos");
    }
}
