mod attack;
pub mod cbc;
mod error;
pub mod oracle;
mod pkcs7;
mod solver;

pub use attack::{
    compute_iv, crack, encrypt, Attack, AttackConfig, Forgery, DEFAULT_BLOCK_SIZE,
};
pub use error::{AttackError, OracleError, PaddingError};
pub use oracle::http::server::{spawn_server, PaddingCheckHandler};
pub use oracle::http::HttpOracle;
pub use oracle::local::LocalOracle;
pub use oracle::{oracle_fn, FnOracle, PaddingOracle};
pub use pkcs7::{add_padding, remove_padding};
pub use solver::QueryMode;
