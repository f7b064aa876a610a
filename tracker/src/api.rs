use crate::services::QueryService;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use crypto_tracker_common::{DeviationView, InvalidAssetError, Snapshot, StatsView};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct CoinQuery {
    coin: Option<String>,
}

impl CoinQuery {
    fn coin(&self) -> Result<&str, InvalidAssetError> {
        self.coin
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(InvalidAssetError::Missing)
    }
}

/// Client-facing error: always 400 with `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    InvalidAsset(InvalidAssetError),
    /// Query string could not be decoded, e.g. `coin` given twice.
    MalformedQuery(String),
}

impl From<InvalidAssetError> for ApiError {
    fn from(err: InvalidAssetError) -> Self {
        Self::InvalidAsset(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::MalformedQuery(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match self {
            Self::InvalidAsset(err) => err.to_string(),
            Self::MalformedQuery(reason) => reason,
        };
        debug!("Rejecting query: {}", message);
        (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
    }
}

async fn get_crypto(State(queries): State<QueryService>) -> Json<BTreeMap<String, Snapshot>> {
    Json(queries.get_snapshot().await)
}

async fn get_stats(
    State(queries): State<QueryService>,
    query: Result<Query<CoinQuery>, QueryRejection>,
) -> Result<Json<StatsView>, ApiError> {
    let Query(params) = query?;
    let coin = params.coin()?;
    Ok(Json(queries.get_stats(coin).await?))
}

async fn get_deviation(
    State(queries): State<QueryService>,
    query: Result<Query<CoinQuery>, QueryRejection>,
) -> Result<Json<DeviationView>, ApiError> {
    let Query(params) = query?;
    let coin = params.coin()?;
    Ok(Json(queries.get_deviation(coin).await?))
}

pub fn router(queries: QueryService) -> Router {
    Router::new()
        .route("/crypto", get(get_crypto))
        .route("/stats", get(get_stats))
        .route("/deviation", get(get_deviation))
        .with_state(queries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_query_requires_non_empty_value() {
        let missing = CoinQuery { coin: None };
        assert_eq!(missing.coin(), Err(InvalidAssetError::Missing));

        let empty = CoinQuery {
            coin: Some(String::new()),
        };
        assert_eq!(empty.coin(), Err(InvalidAssetError::Missing));

        let given = CoinQuery {
            coin: Some("bitcoin".into()),
        };
        assert_eq!(given.coin(), Ok("bitcoin"));
    }

    #[test]
    fn test_api_error_is_bad_request() {
        let response = ApiError::from(InvalidAssetError::Unknown("dogecoin".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::MalformedQuery("bad query".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
