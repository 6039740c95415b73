//! Inbound HTTP surface: state inspection, delay control, userscripts,
//! characteristics exchange and health probes.

pub mod characteristics;

use crate::app::{CheckReminder, UploadCharacteristics};
use crate::core::timer::DelayableTimer;
use crate::domain::ports::StateRepository;
use crate::utils::error::Result;
use crate::utils::monitor::{MemoryMonitor, MemoryStats, MemoryStatus};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct ApiState {
    pub state: Arc<dyn StateRepository>,
    pub message_timer: Arc<DelayableTimer>,
    pub reminder_timer: Arc<DelayableTimer>,
    pub check_reminder: Arc<CheckReminder>,
    pub characteristics: Arc<UploadCharacteristics>,
    pub monitor: Arc<MemoryMonitor>,
    pub probes: Arc<HealthProbes>,
    pub public_url: String,
    pub script_version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    pub message_count: usize,
    pub has_notification: bool,
    pub current_version: String,
    pub latest_version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayResponse {
    pub next_message_check: DateTime<Utc>,
    pub next_reminder_check: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SleepCheckResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LiveResponse {
    pub status: MemoryStatus,
    pub memory: Option<MemoryStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub name: String,
    pub up: bool,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub up: bool,
    pub checks: Vec<ProbeResult>,
}

const PROBE_USER_AGENT: &str = "Krabot-Health-Check";

/// HEAD probes against the external services the cycles depend on.
pub struct HealthProbes {
    client: Client,
    targets: Vec<(String, String)>,
}

impl HealthProbes {
    /// Probes the game site, the Discord webhook and the release API.
    pub fn for_services(
        site_url: &str,
        webhook_url: &str,
        release_feed_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        Self::new(
            vec![
                ("Kraland".to_string(), site_url.to_string()),
                ("Discord webhook".to_string(), webhook_url.to_string()),
                ("GitHub releases".to_string(), release_feed_url.to_string()),
            ],
            timeout,
        )
    }

    pub fn new(targets: Vec<(String, String)>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(PROBE_USER_AGENT)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, targets })
    }

    pub async fn check_all(&self) -> Vec<ProbeResult> {
        let mut results = Vec::with_capacity(self.targets.len());
        for (name, url) in &self.targets {
            let result = match self.client.head(url).send().await {
                Ok(response) if response.status().is_success() => ProbeResult {
                    name: name.clone(),
                    up: true,
                    detail: format!("{} is reachable", name),
                },
                Ok(response) => ProbeResult {
                    name: name.clone(),
                    up: false,
                    detail: format!("{} returned status: {}", name, response.status().as_u16()),
                },
                Err(e) => ProbeResult {
                    name: name.clone(),
                    up: false,
                    detail: format!("{} unreachable: {}", name, e),
                },
            };
            results.push(result);
        }
        results
    }
}

pub fn router(state: ApiState) -> Router {
    let exchange = characteristics::CharacteristicsApi {
        use_case: state.characteristics.clone(),
        public_url: state.public_url.clone(),
        script_version: state.script_version.clone(),
    };

    Router::new()
        .route("/krabot/state", get(get_state))
        .route("/krabot/state/reset", post(reset_state))
        .route("/krabot/kramail-check/delay", post(delay_checks))
        .route("/krabot/kramail-check/sleep-check", post(trigger_sleep_check))
        .route("/krabot/kramail-check/userscript.user.js", get(userscript))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .merge(characteristics::router(exchange))
        .with_state(state)
}

async fn get_state(State(api): State<ApiState>) -> Json<StateResponse> {
    let snapshot = api.state.snapshot();
    Json(StateResponse {
        message_count: snapshot.message_count,
        has_notification: snapshot.has_notification,
        current_version: snapshot.current_version.tag().to_string(),
        latest_version: snapshot.latest_version.tag().to_string(),
    })
}

async fn reset_state(State(api): State<ApiState>) -> StatusCode {
    reset_notifications(&api);
    StatusCode::NO_CONTENT
}

/// 使用者正在瀏覽遊戲網站：清除已通知紀錄並延後檢查
async fn delay_checks(State(api): State<ApiState>) -> Json<DelayResponse> {
    reset_notifications(&api);
    let next_message_check = api.message_timer.delay();
    let next_reminder_check = api.reminder_timer.delay();

    Json(DelayResponse {
        next_message_check,
        next_reminder_check,
    })
}

async fn trigger_sleep_check(State(api): State<ApiState>) -> impl IntoResponse {
    tracing::info!("😴 Manual sleep check triggered via REST API");
    match api.check_reminder.execute().await {
        Ok(()) => (
            StatusCode::OK,
            Json(SleepCheckResponse {
                success: true,
                message: "Sleep check executed successfully".to_string(),
            }),
        ),
        Err(e) => {
            tracing::error!("❌ Manual sleep check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SleepCheckResponse {
                    success: false,
                    message: format!("Sleep check failed: {}", e),
                }),
            )
        }
    }
}

async fn userscript(State(api): State<ApiState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        render_userscript(&api.public_url, &api.script_version),
    )
}

async fn liveness(State(api): State<ApiState>) -> impl IntoResponse {
    let memory = api.monitor.get_stats();
    let status = memory
        .as_ref()
        .map(|stats| api.monitor.classify(stats.usage_percent))
        .unwrap_or(MemoryStatus::Ok);

    let code = if status == MemoryStatus::Critical {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(LiveResponse { status, memory }))
}

async fn readiness(State(api): State<ApiState>) -> impl IntoResponse {
    let checks = api.probes.check_all().await;
    let up = checks.iter().all(|check| check.up);
    for check in checks.iter().filter(|check| !check.up) {
        tracing::warn!("⚠️ Readiness: {}", check.detail);
    }

    let code = if up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(ReadyResponse { up, checks }))
}

fn reset_notifications(api: &ApiState) {
    api.state.reset_general_notification_flag();
    api.state.reset_notified_messages();
    tracing::info!("🔄 Notification ledger and general latch reset");
}

/// Splits the public URL into the base the userscripts call and the
/// `host[:port]` they must be allowed to connect to.
fn backend_address(public_url: &str) -> (&str, &str) {
    let backend_url = public_url.trim_end_matches('/');
    let host = backend_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap_or(backend_url);
    (backend_url, host)
}

pub fn render_userscript(public_url: &str, version: &str) -> String {
    let (backend_url, host) = backend_address(public_url);

    format!(
        r#"// ==UserScript==
// @name         Krabot Delay Timer
// @namespace    krabot
// @version      {version}
// @description  Repousse le timer de vérification Krabot quand Kraland est visité
// @author       Krabot
// @match        *://www.kraland.org/*
// @match        *://kraland.org/*
// @grant        GM_xmlhttpRequest
// @connect      {host}
// ==/UserScript==

(function() {{
    'use strict';

    const BACKEND_URL = '{backend_url}';

    GM_xmlhttpRequest({{
        method: 'POST',
        url: BACKEND_URL + '/krabot/kramail-check/delay',
        onload: function(response) {{
            const data = JSON.parse(response.responseText);
            const nextMessageCheck = new Date(data.nextMessageCheck).toLocaleString('fr-FR');
            const nextReminderCheck = new Date(data.nextReminderCheck).toLocaleString('fr-FR');
            console.log('[Krabot] Timers delayed. Next kramail check: ' + nextMessageCheck + ', next sleep check: ' + nextReminderCheck);
        }},
        onerror: function(error) {{
            console.error('[Krabot] Failed to delay timer:', error);
        }}
    }});
}})();
"#
    )
}
