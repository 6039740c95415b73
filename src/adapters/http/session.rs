use crate::utils::error::Result;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "fr,fr-FR;q=0.8,en-US;q=0.5,en;q=0.3";

/// 一次 HTTP 回應的狀態碼與內容
#[derive(Debug, Clone)]
pub struct HttpPage {
    pub status: StatusCode,
    pub body: String,
}

impl HttpPage {
    pub fn is_error(&self) -> bool {
        self.status.as_u16() >= 400
    }
}

/// Cookie-carrying client for the game site. No retries and no business logic.
pub struct SessionClient {
    client: Client,
    origin: String,
}

impl SessionClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE),
        );
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );

        let client = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(timeout)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            origin: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn get(&self, url: &str) -> Result<HttpPage> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(HttpPage { status, body })
    }

    /// 送出已編碼的表單內容
    pub async fn post_form(&self, url: &str, encoded_body: String) -> Result<HttpPage> {
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::ORIGIN, self.origin.as_str())
            .header(header::REFERER, format!("{}/", self.origin))
            .body(encoded_body)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(HttpPage { status, body })
    }
}

/// Form-encodes fields from their ISO-8859-1 bytes, the charset the login form
/// expects. Characters outside Latin-1 become `?`.
pub fn encode_form_latin1(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={}", encode_latin1(key), encode_latin1(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_latin1(value: &str) -> String {
    let bytes: Vec<u8> = value
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect();
    url::form_urlencoded::byte_serialize(&bytes).collect()
}
