//! Characteristics exchange: players upload their name and PP through a
//! userscript and read back everyone sharing the same API key.

use super::backend_address;
use crate::app::UploadCharacteristics;
use crate::domain::model::UserSummary;
use crate::utils::error::KrabotError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

const USERSCRIPT_TEMPLATE: &str = include_str!("../../../assets/krabot-characteristics.user.js");

#[derive(Clone)]
pub struct CharacteristicsApi {
    pub use_case: Arc<UploadCharacteristics>,
    pub public_url: String,
    pub script_version: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyQuery {
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
}

impl ApiKeyQuery {
    fn namespace(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub player_id: Option<String>,
    pub name: Option<String>,
    pub pp: Option<i64>,
}

pub fn router<S>(api: CharacteristicsApi) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/krabot/characteristics/uploadCharacteristics",
            post(upload_characteristics),
        )
        .route("/krabot/characteristics/getUsers", get(get_users))
        .route(
            "/krabot/characteristics/getUserScript.user.js",
            get(userscript),
        )
        .with_state(api)
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, message.to_string()).into_response()
}

fn missing_api_key() -> Response {
    (StatusCode::UNAUTHORIZED, "apiKey is required").into_response()
}

async fn upload_characteristics(
    State(api): State<CharacteristicsApi>,
    Query(query): Query<ApiKeyQuery>,
    payload: std::result::Result<Json<UploadRequest>, JsonRejection>,
) -> Response {
    let Some(namespace) = query.namespace() else {
        return missing_api_key();
    };
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            tracing::warn!("⚠️ Rejected characteristics upload: {}", rejection);
            return bad_request("invalid request body");
        }
    };

    let Some(player_id) = request.player_id.as_deref() else {
        return bad_request("playerId is required");
    };
    let Some(name) = request.name.as_deref() else {
        return bad_request("name is required");
    };
    let Some(pp) = request.pp else {
        return bad_request("pp is required");
    };

    match api.use_case.upload(namespace, player_id, name, pp) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(KrabotError::ValidationError { message }) => bad_request(&message),
        Err(e) => {
            tracing::error!(category = ?e.category(), "❌ Characteristics upload failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn get_users(
    State(api): State<CharacteristicsApi>,
    Query(query): Query<ApiKeyQuery>,
) -> std::result::Result<Json<Vec<UserSummary>>, Response> {
    let namespace = query.namespace().ok_or_else(missing_api_key)?;
    Ok(Json(api.use_case.users(namespace)))
}

async fn userscript(State(api): State<CharacteristicsApi>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        render_characteristics_userscript(&api.public_url, &api.script_version),
    )
}

pub fn render_characteristics_userscript(public_url: &str, version: &str) -> String {
    let (backend_url, host) = backend_address(public_url);
    let host_no_port = host.split(':').next().unwrap_or(host);

    USERSCRIPT_TEMPLATE
        .replace("__BACKEND_URL__", backend_url)
        .replace("__BACKEND_HOST_NO_PORT__", host_no_port)
        .replace("__BACKEND_HOST__", host)
        .replace("__SCRIPT_VERSION__", version)
}
