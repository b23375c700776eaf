/// AES-256 in CBC mode with PKCS#7 padding.
///
/// This is the cipher the oracles are built on. The attack itself never
/// touches it.
use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;

use crate::{add_padding, error::PaddingError, pkcs7::is_padded, remove_padding};

pub const AES_BLOCK_SIZE: usize = 16;

pub fn encrypt_aes_256_cbc(plaintext: &[u8], key: &[u8; 32], iv: &[u8; 16]) -> Vec<u8> {
    let cipher = Aes256::new(GenericArray::from_slice(key));
    let padded = add_padding(plaintext, AES_BLOCK_SIZE as u8);
    let mut ciphertext = Vec::with_capacity(padded.len());

    let mut last_block = *iv;
    for plaintext_block in padded.chunks_exact(AES_BLOCK_SIZE) {
        let mut block = aes::Block::default();
        block
            .iter_mut()
            .zip(plaintext_block.iter().zip(last_block))
            .for_each(|(b, (p, c))| *b = p ^ c);
        cipher.encrypt_block(&mut block);
        last_block.copy_from_slice(&block);
        ciphertext.extend_from_slice(&block);
    }
    ciphertext
}

/// Decrypt without stripping the padding.
///
/// `ciphertext` must be a whole number of blocks.
pub fn decrypt_aes_256_cbc_padded(ciphertext: &[u8], key: &[u8; 32], iv: &[u8; 16]) -> Vec<u8> {
    debug_assert_eq!(ciphertext.len() % AES_BLOCK_SIZE, 0);
    let cipher = Aes256::new(GenericArray::from_slice(key));
    let mut message = Vec::with_capacity(ciphertext.len());

    let mut last_block = *iv;
    for ciphertext_block in ciphertext.chunks_exact(AES_BLOCK_SIZE) {
        let mut block = aes::Block::clone_from_slice(ciphertext_block);
        cipher.decrypt_block(&mut block);
        message.extend(block.iter().zip(last_block).map(|(d, c)| d ^ c));
        last_block.copy_from_slice(ciphertext_block);
    }
    message
}

pub fn decrypt_aes_256_cbc(
    ciphertext: &[u8],
    key: &[u8; 32],
    iv: &[u8; 16],
) -> Result<Vec<u8>, PaddingError> {
    remove_padding(&decrypt_aes_256_cbc_padded(ciphertext, key, iv))
}

/// True if the ciphertext decrypts to a buffer ending in valid padding.
pub(crate) fn has_valid_padding(ciphertext: &[u8], key: &[u8; 32], iv: &[u8; 16]) -> bool {
    is_padded(&decrypt_aes_256_cbc_padded(ciphertext, key, iv))
}
