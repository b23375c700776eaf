// The byte-at-a-time search shared by every attack.
//
// Decrypting a CBC block C_i gives
//
//                 P_i = D(C_i) ⊕ C_{i-1}.
//
// D(C_i) is the "intermediate state" of the block. It depends only on the key
// and C_i, so if we put a block X of our choosing in front of C_i, the final
// block of X|C_i decrypts to D(C_i) ⊕ X and the oracle tells us whether that
// ends in valid padding.
//
// Working from the last byte to the first, for offset o we want the trailing
// bytes o..n of D(C_i) ⊕ X to all equal the padding value p = n - o. Bytes to
// the right of o are already solved, so we can force them to p. Byte o is
// swept over every value until the oracle accepts, at which point
// D(C_i)[o] ⊕ X[o] = p.
//
// Rather than sweeping X directly, every byte of X is expressed relative to
// a reference block R: X[o] = R[o] ⊕ t. An accepted t then gives
//
//                 D(C_i)[o] ⊕ R[o] = t ⊕ p.
//
// With R = C_{i-1}, the left-hand side is the plaintext byte P_i[o]. With R set
// to a known plaintext block, it is the byte of the preceding block that
// makes C_i decrypt to that plaintext. The sweep is identical, only the
// meaning of the answer changes.
//
// t = 0 leaves X[o] = R[o] and is never sent. If no t in 1..=255 is accepted,
// t = 0 was the answer, which happens when the reference already decrypts to
// valid padding.
use futures::future::join_all;
use log::{trace, warn};

use crate::{error::OracleError, oracle::PaddingOracle};

/// What the block in front of the target means, and so what a solved block
/// means.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Framing<'a> {
    /// The real preceding ciphertext block is known. Solving yields the
    /// target's plaintext.
    Plaintext { preceding: &'a [u8] },
    /// The target's plaintext is known. Solving yields the preceding block
    /// that decrypts the target to it.
    PrecedingBlock { plaintext: &'a [u8] },
}

impl Framing<'_> {
    fn reference(&self) -> &[u8] {
        match self {
            Framing::Plaintext { preceding } => preceding,
            Framing::PrecedingBlock { plaintext } => plaintext,
        }
    }

    /// The trial block before any byte is forced. Bytes left of the current
    /// offset keep these values.
    fn initial_trial(&self) -> Vec<u8> {
        match self {
            Framing::Plaintext { preceding } => preceding.to_vec(),
            Framing::PrecedingBlock { plaintext } => vec![0; plaintext.len()],
        }
    }
}

/// How candidate bytes are sent to the oracle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryMode {
    /// One query in flight at a time.
    #[default]
    Sequential,
    /// Up to `n` candidates for the same byte in flight at once. Accepted
    /// candidates are still examined in ascending order, so the result
    /// matches sequential mode.
    Batched(usize),
}

impl QueryMode {
    fn batch_size(self) -> usize {
        match self {
            QueryMode::Sequential => 1,
            QueryMode::Batched(n) => n.clamp(1, 255),
        }
    }
}

pub(crate) struct BlockSolver<'a, O> {
    oracle: &'a O,
    mode: QueryMode,
    /// Blocks kept in front of the trial block, untouched.
    prefix: &'a [u8],
    target: &'a [u8],
    framing: Framing<'a>,
}

impl<'a, O: PaddingOracle> BlockSolver<'a, O> {
    pub(crate) fn new(
        oracle: &'a O,
        mode: QueryMode,
        prefix: &'a [u8],
        target: &'a [u8],
        framing: Framing<'a>,
    ) -> Self {
        debug_assert_eq!(framing.reference().len(), target.len());
        debug_assert!(target.is_empty() || prefix.len() % target.len() == 0);
        Self {
            oracle,
            mode,
            prefix,
            target,
            framing,
        }
    }

    /// Solve every byte of the block, right to left.
    pub(crate) async fn solve(&self) -> Result<Vec<u8>, OracleError> {
        let block_size = self.target.len();
        let reference = self.framing.reference();
        let mut solved = vec![0u8; block_size];

        let trial_start = self.prefix.len();
        let mut query = Vec::with_capacity(trial_start + 2 * block_size);
        query.extend_from_slice(self.prefix);
        query.extend_from_slice(&self.framing.initial_trial());
        query.extend_from_slice(self.target);

        for offset in (0..block_size).rev() {
            let padding_value = (block_size - offset) as u8;
            for i in (offset + 1)..block_size {
                query[trial_start + i] = reference[i] ^ solved[i] ^ padding_value;
            }

            let check_collision = offset == block_size - 1 && block_size > 1;
            let accepted = self
                .search_byte(&query, trial_start + offset, reference[offset], check_collision)
                .await?;
            solved[offset] = match accepted {
                Some(test) => test ^ padding_value,
                None => padding_value,
            };
            trace!(
                "solved byte {offset}: {:#04x} (test {:?})",
                solved[offset],
                accepted
            );
        }
        Ok(solved)
    }

    /// Find the first `test` in `1..=255` for which the oracle accepts the
    /// query with byte `index` set to `reference ^ test`.
    async fn search_byte(
        &self,
        query: &[u8],
        index: usize,
        reference: u8,
        check_collision: bool,
    ) -> Result<Option<u8>, OracleError> {
        let candidates: Vec<u8> = (1..=255).collect();
        let batch_size = self.mode.batch_size();
        let mut trials = vec![query.to_vec(); batch_size];

        for chunk in candidates.chunks(batch_size) {
            for (trial, &test) in trials.iter_mut().zip(chunk) {
                trial[index] = reference ^ test;
            }
            let verdicts = join_all(
                trials[..chunk.len()]
                    .iter()
                    .map(|trial| self.oracle.query(trial)),
            )
            .await;

            for ((trial, &test), verdict) in trials.iter_mut().zip(chunk).zip(verdicts) {
                if !verdict? {
                    continue;
                }
                if check_collision && !self.survives_neighbour_flip(trial, index).await? {
                    warn!("discarding coincidental padding acceptance at test {test}");
                    continue;
                }
                return Ok(Some(test));
            }
        }
        Ok(None)
    }

    /// An accepted final byte might have formed a longer pad by accident
    /// (e.g. `02 02` instead of `01`). A genuine `01` pad does not care what
    /// the byte before it decrypts to.
    async fn survives_neighbour_flip(
        &self,
        trial: &mut [u8],
        index: usize,
    ) -> Result<bool, OracleError> {
        trial[index - 1] ^= 1;
        let verdict = self.oracle.query(trial).await;
        trial[index - 1] ^= 1;
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use aes::cipher::{generic_array::GenericArray, BlockDecrypt, KeyInit};
    use aes::Aes256;
    use rand::{rngs::StdRng, SeedableRng};
    use rstest::rstest;

    use crate::{add_padding, oracle::local::LocalOracle, oracle::oracle_fn};

    fn raw_decrypt(key: &[u8; 32], block: &[u8]) -> Vec<u8> {
        let mut block = aes::Block::clone_from_slice(block);
        Aes256::new(GenericArray::from_slice(key)).decrypt_block(&mut block);
        block.to_vec()
    }

    #[rstest]
    #[case(QueryMode::Sequential)]
    #[case(QueryMode::Batched(16))]
    #[case(QueryMode::Batched(255))]
    #[tokio::test]
    async fn solver_finds_intermediate_state_given_zero_plaintext(#[case] mode: QueryMode) {
        let oracle = LocalOracle::with_rng(&mut StdRng::from_seed([21; 32]));
        let ciphertext = oracle.encrypt(b"Cooking MC's like a pound of bacon");
        let target = &ciphertext[16..32];
        let zeros = [0u8; 16];
        let framing = Framing::PrecedingBlock { plaintext: &zeros };

        let solved = BlockSolver::new(&oracle, mode, &[], target, framing)
            .solve()
            .await
            .unwrap();

        assert_eq!(solved, raw_decrypt(oracle.key(), target));
    }

    #[tokio::test]
    async fn solver_recovers_plaintext_of_final_block() {
        let oracle = LocalOracle::with_rng(&mut StdRng::from_seed([22; 32]));
        // Pads with a single 0x01, so the last byte is only found by
        // exhausting every test value.
        let message = b"Burning 'em, if you ain't quick";
        let ciphertext = oracle.encrypt(message);
        let framing = Framing::Plaintext {
            preceding: &ciphertext[..16],
        };

        let solved = BlockSolver::new(
            &oracle,
            QueryMode::Sequential,
            &[],
            &ciphertext[16..],
            framing,
        )
        .solve()
        .await
        .unwrap();

        assert_eq!(solved, add_padding(message, 16)[16..]);
    }

    #[tokio::test]
    async fn solver_keeps_prefix_blocks_in_every_query() {
        let local = LocalOracle::with_rng(&mut StdRng::from_seed([23; 32]));
        let ciphertext = local.encrypt(b"I go crazy when I hear a cymbal and a hi-hat");
        let prefix = &ciphertext[..16];
        let oracle = oracle_fn(|query: Vec<u8>| {
            let local = local.clone();
            let prefix = prefix.to_vec();
            async move {
                assert_eq!(query.len(), 48);
                assert_eq!(query[..16], prefix[..]);
                local.padding_valid(&query)
            }
        });
        let framing = Framing::Plaintext {
            preceding: &ciphertext[16..32],
        };

        let solved = BlockSolver::new(
            &oracle,
            QueryMode::Sequential,
            prefix,
            &ciphertext[32..48],
            framing,
        )
        .solve()
        .await
        .unwrap();

        assert_eq!(solved, add_padding(b"I go crazy when I hear a cymbal and a hi-hat", 16)[32..48]);
    }

    #[rstest]
    #[case(QueryMode::Sequential)]
    #[case(QueryMode::Batched(2))]
    #[case(QueryMode::Batched(255))]
    #[tokio::test]
    async fn solver_discards_coincidental_padding_given_known_plaintext(#[case] mode: QueryMode) {
        let local = LocalOracle::new([24; 32], [25; 16]);
        // Behind the zero filler, a target whose second-to-last intermediate
        // byte is 0x02 makes any trial ending in 0x02 look validly padded.
        let (target, intermediate) = (0u64..)
            .map(|n| {
                let mut block = [0u8; 16];
                block[..8].copy_from_slice(&n.to_le_bytes());
                block
            })
            .map(|block| (block, raw_decrypt(local.key(), &block)))
            .find(|(_, intermediate)| intermediate[14] == 0x02)
            .unwrap();
        // Test value 1 then gives the false 02 02 pad, test value 2 the real
        // 01 pad.
        let mut plaintext = [b'A'; 16];
        plaintext[15] = intermediate[15] ^ 0x03;
        let queries = Mutex::new(Vec::new());
        let oracle = oracle_fn(|query: Vec<u8>| {
            let verdict = local.padding_valid(&query);
            queries.lock().unwrap().push(query);
            async move { verdict }
        });
        let framing = Framing::PrecedingBlock {
            plaintext: &plaintext,
        };

        let solved = BlockSolver::new(&oracle, mode, &[], &target, framing)
            .solve()
            .await
            .unwrap();

        let expected: Vec<u8> = intermediate
            .iter()
            .zip(plaintext)
            .map(|(i, p)| i ^ p)
            .collect();
        assert_eq!(solved, expected);
        // While the last byte is searched, byte 14 is only ever the zero
        // filler or the flipped neighbour. Both acceptances get flipped.
        let flipped_tests: Vec<u8> = queries
            .lock()
            .unwrap()
            .iter()
            .take_while(|q| q[14] <= 1)
            .filter(|q| q[14] == 1)
            .map(|q| q[15] ^ plaintext[15])
            .collect();
        assert_eq!(flipped_tests, [1, 2]);
    }

    #[tokio::test]
    async fn solver_returns_err_when_oracle_aborts() {
        let oracle = oracle_fn(|_| async { Err(OracleError::Aborted("timeout".to_string())) });
        let block = [0u8; 16];
        let framing = Framing::PrecedingBlock { plaintext: &block };

        let result = BlockSolver::new(&oracle, QueryMode::Sequential, &[], &block, framing)
            .solve()
            .await;

        assert_eq!(result, Err(OracleError::Aborted("timeout".to_string())));
    }

    #[test]
    fn batch_size_is_clamped() {
        assert_eq!(QueryMode::Sequential.batch_size(), 1);
        assert_eq!(QueryMode::Batched(0).batch_size(), 1);
        assert_eq!(QueryMode::Batched(1000).batch_size(), 255);
    }
}
