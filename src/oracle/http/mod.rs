// A padding oracle reached over HTTP.
//
// The server side wraps a `LocalOracle` and leaks its verdict through the
// status code, the way a careless web service leaks a decryption failure.
// The client side turns those status codes back into booleans.
pub mod server;

use reqwest::StatusCode;

use super::PaddingOracle;
use crate::error::OracleError;

#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    check_url: String,
}

impl HttpOracle {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:9000`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        let check_url = format!("{}{}", base_url.trim_end_matches('/'), server::CHECK_PATH);
        Self { client, check_url }
    }
}

impl PaddingOracle for HttpOracle {
    async fn query(&self, ciphertext: &[u8]) -> Result<bool, OracleError> {
        let response = self
            .client
            .get(&self.check_url)
            .query(&[("ciphertext", hex::encode(ciphertext))])
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::INTERNAL_SERVER_ERROR => Ok(false),
            status => Err(OracleError::UnexpectedResponse(status.as_u16())),
        }
    }
}
