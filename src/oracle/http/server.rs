use crate::{error::OracleError, oracle::local::LocalOracle};

use axum::{extract::Query, http::StatusCode, response::IntoResponse, routing::get, Router};
use log::{debug, info};
use tokio::net::{TcpListener, ToSocketAddrs};

use std::{collections::HashMap, sync::Arc};

pub const CHECK_PATH: &str = "/check";

/// Serve padding checks on `address` in the background.
///
/// Returns the base URL the server listens on, which is useful when binding
/// to port 0.
pub async fn spawn_server(
    address: impl ToSocketAddrs,
    request_handler: &PaddingCheckHandler,
) -> std::io::Result<String> {
    let app = router(request_handler);
    let listener = TcpListener::bind(address).await?;
    let addr = listener.local_addr()?;
    info!("padding oracle listening on {addr}");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            log::error!("padding oracle server stopped: {e}");
        }
    });
    Ok(format!("http://{}", addr))
}

pub fn router(request_handler: &PaddingCheckHandler) -> Router {
    let handler = Arc::new(request_handler.clone());
    Router::new().route(
        CHECK_PATH,
        get(move |query: Query<HashMap<String, String>>| {
            let handler = Arc::clone(&handler);
            async move { handler.handle_request(query).await }
        }),
    )
}

/// Answers `GET /check?ciphertext=<hex>` with 200 for valid padding and 500
/// for invalid padding.
#[derive(Debug, Clone)]
pub struct PaddingCheckHandler {
    oracle: LocalOracle,
}

impl PaddingCheckHandler {
    pub fn new(oracle: LocalOracle) -> Self {
        Self { oracle }
    }

    pub async fn handle_request(
        &self,
        Query(params): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        let ciphertext = match params.get("ciphertext") {
            Some(c) => match hex::decode(c) {
                Ok(c) => c,
                Err(e) => {
                    return (StatusCode::BAD_REQUEST, format!("Illegal ciphertext: {}", e))
                        .into_response()
                }
            },
            None => {
                return (StatusCode::BAD_REQUEST, "Missing 'ciphertext' parameter").into_response()
            }
        };

        match self.oracle.padding_valid(&ciphertext) {
            Ok(true) => (StatusCode::OK, "Padding is valid").into_response(),
            Ok(false) => (StatusCode::INTERNAL_SERVER_ERROR, "Invalid padding").into_response(),
            Err(e @ OracleError::Malformed { .. }) => {
                debug!("rejecting request: {e}");
                (StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
            Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
        }
    }
}
