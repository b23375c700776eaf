use std::fmt;

/// Trailing bytes of a buffer are not a valid PKCS#7 pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingError {
    InvalidPadding,
}

impl fmt::Display for PaddingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PaddingError::InvalidPadding => write!(f, "invalid pkcs7 padding"),
        }
    }
}

impl std::error::Error for PaddingError {}

/// Errors an oracle implementation can raise instead of answering.
///
/// Returning any of these aborts the search that issued the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The oracle was handed a buffer that is empty or not block aligned.
    Malformed { len: usize },
    /// The query could not be delivered.
    Transport(String),
    /// A remote oracle answered with something other than valid/invalid.
    UnexpectedResponse(u16),
    /// The oracle gave up, e.g. after a caller-imposed timeout.
    Aborted(String),
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OracleError::Malformed { len } => {
                write!(f, "oracle queried with malformed ciphertext of {len} bytes")
            }
            OracleError::Transport(e) => write!(f, "oracle transport failed: {e}"),
            OracleError::UnexpectedResponse(status) => {
                write!(f, "oracle answered with unexpected status {status}")
            }
            OracleError::Aborted(reason) => write!(f, "oracle aborted: {reason}"),
        }
    }
}

impl std::error::Error for OracleError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttackError {
    /// Ciphertext is empty, not block aligned, or shorter than two blocks.
    InvalidCiphertext { len: usize, block_size: usize },
    /// Block sizes must fit a PKCS#7 padding byte.
    InvalidBlockSize(usize),
    BlockSizeMismatch {
        cipher_block: usize,
        plaintext_block: usize,
    },
    /// A block handed to the attack is not the configured block size.
    UnexpectedBlockLength { expected: usize, actual: usize },
    /// Recovered plaintext did not end in valid padding.
    InvalidPadding(PaddingError),
    Oracle(OracleError),
}

impl fmt::Display for AttackError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttackError::InvalidCiphertext { len, block_size } => write!(
                f,
                "invalid ciphertext: {len} bytes is not at least two blocks of {block_size} bytes"
            ),
            AttackError::InvalidBlockSize(size) => {
                write!(f, "invalid block size {size}, must be in 1..=255")
            }
            AttackError::BlockSizeMismatch {
                cipher_block,
                plaintext_block,
            } => write!(
                f,
                "ciphertext block of {cipher_block} bytes does not match plaintext block of {plaintext_block} bytes"
            ),
            AttackError::UnexpectedBlockLength { expected, actual } => write!(
                f,
                "block of {actual} bytes does not match configured block size {expected}"
            ),
            AttackError::InvalidPadding(e) => write!(f, "recovered plaintext has {e}"),
            AttackError::Oracle(e) => write!(f, "search aborted: {e}"),
        }
    }
}

impl std::error::Error for AttackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AttackError::InvalidPadding(e) => Some(e),
            AttackError::Oracle(e) => Some(e),
            _ => None,
        }
    }
}

impl From<OracleError> for AttackError {
    fn from(e: OracleError) -> Self {
        AttackError::Oracle(e)
    }
}

impl From<PaddingError> for AttackError {
    fn from(e: PaddingError) -> Self {
        AttackError::InvalidPadding(e)
    }
}
