use rand::RngCore;

use super::PaddingOracle;
use crate::{
    cbc::{encrypt_aes_256_cbc, has_valid_padding, AES_BLOCK_SIZE},
    error::OracleError,
};

/// An in-process AES-256-CBC padding oracle.
///
/// Every query is decrypted under the same key and IV, whatever the caller
/// thinks the first block is.
#[derive(Debug, Clone)]
pub struct LocalOracle {
    key: [u8; 32],
    iv: [u8; 16],
}

impl LocalOracle {
    pub fn new(key: [u8; 32], iv: [u8; 16]) -> Self {
        Self { key, iv }
    }

    pub fn with_rng(rng: &mut impl RngCore) -> Self {
        let mut key = [0u8; 32];
        let mut iv = [0u8; 16];
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut iv);
        Self { key, iv }
    }

    /// Encrypt a message the way the party holding the key would.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        encrypt_aes_256_cbc(plaintext, &self.key, &self.iv)
    }

    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; 16] {
        &self.iv
    }

    pub fn padding_valid(&self, ciphertext: &[u8]) -> Result<bool, OracleError> {
        if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_SIZE != 0 {
            return Err(OracleError::Malformed {
                len: ciphertext.len(),
            });
        }
        Ok(has_valid_padding(ciphertext, &self.key, &self.iv))
    }
}

impl PaddingOracle for LocalOracle {
    async fn query(&self, ciphertext: &[u8]) -> Result<bool, OracleError> {
        self.padding_valid(ciphertext)
    }
}
