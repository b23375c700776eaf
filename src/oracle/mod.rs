// Padding oracles.
//
// A padding oracle answers a single question about a ciphertext: does it
// decrypt, under some key we don't know, to a buffer with valid PKCS#7
// padding? The attack only ever sees this trait. Where the answer comes from
// (a key held in memory, a web service returning different status codes,
// a slow error path) is up to the implementation.
pub mod http;
pub mod local;

use std::future::Future;

use crate::error::OracleError;

pub trait PaddingOracle {
    /// Report whether `ciphertext` decrypts with valid padding.
    ///
    /// `ciphertext` is always a whole number of blocks, at least one block
    /// long. Implementations must answer identically for identical input and
    /// must not keep the buffer. Returning an error aborts the attack.
    fn query(&self, ciphertext: &[u8]) -> impl Future<Output = Result<bool, OracleError>>;
}

impl<O: PaddingOracle + ?Sized> PaddingOracle for &O {
    fn query(&self, ciphertext: &[u8]) -> impl Future<Output = Result<bool, OracleError>> {
        (**self).query(ciphertext)
    }
}

/// Oracle backed by an async closure, see [`oracle_fn`].
#[derive(Debug, Clone)]
pub struct FnOracle<F> {
    f: F,
}

/// Wrap a function returning a future into a [`PaddingOracle`].
///
/// The function receives its own copy of the candidate ciphertext.
pub fn oracle_fn<F, Fut>(f: F) -> FnOracle<F>
where
    F: Fn(Vec<u8>) -> Fut,
    Fut: Future<Output = Result<bool, OracleError>>,
{
    FnOracle { f }
}

impl<F, Fut> PaddingOracle for FnOracle<F>
where
    F: Fn(Vec<u8>) -> Fut,
    Fut: Future<Output = Result<bool, OracleError>>,
{
    fn query(&self, ciphertext: &[u8]) -> impl Future<Output = Result<bool, OracleError>> {
        (self.f)(ciphertext.to_vec())
    }
}
