//! HTTP plumbing shared by the discovery and per-station endpoints.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use crate::error::HttpError;

/// Issues a GET for `url` and decodes the body as JSON.
///
/// Any non-2xx status is an error; the body is not inspected in that case.
pub async fn fetch_json<C: HttpClient>(
    client: &C,
    url: reqwest::Url,
) -> Result<serde_json::Value, HttpError> {
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req).await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(HttpError::Status(status));
    }

    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
