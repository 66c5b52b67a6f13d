use async_trait::async_trait;
use reqwest::Url;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{DirectoryError, FetchError, HttpError};
use crate::fetch::{BasicClient, HttpClient, fetch_json};
use crate::model::{MeasurementRecord, Station};
use crate::services::directory::StationDirectory;
use crate::services::fetcher::StationFetcher;

pub const DEFAULT_BASE_URL: &str = "https://api.erg.ic.ac.uk/AirQuality";

#[derive(Deserialize)]
struct DiscoveryResponse {
    #[serde(rename = "Sites")]
    sites: SiteList,
}

#[derive(Deserialize)]
struct SiteList {
    #[serde(rename = "Site")]
    site: Vec<SiteDescriptor>,
}

#[derive(Deserialize)]
struct SiteDescriptor {
    #[serde(rename = "@SiteCode")]
    code: String,
}

/// Talks to the discovery and per-site data endpoints for one site group.
pub struct LondonAirClient<C = BasicClient> {
    http: C,
    base_url: Url,
    group: String,
}

impl<C: HttpClient> LondonAirClient<C> {
    /// Fails if `base_url` is not an absolute URL that can carry a path.
    pub fn new(http: C, base_url: &str, group: impl Into<String>) -> Result<Self, HttpError> {
        let base_url = Url::parse(base_url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(HttpError::InvalidUrl(format!("{base_url} cannot carry a path")));
        }

        Ok(Self {
            http,
            base_url,
            group: group.into(),
        })
    }

    pub fn sites_url(&self) -> Url {
        self.endpoint(&[
            "Information",
            "MonitoringSites",
            &format!("GroupName={}", self.group),
            "Json",
        ])
    }

    pub fn site_data_url(&self, station: &Station, start: NaiveDate, end: NaiveDate) -> Url {
        self.endpoint(&[
            "Data",
            "Site",
            &format!("SiteCode={station}"),
            &format!("StartDate={}", start.format("%Y-%m-%d")),
            &format!("EndDate={}", end.format("%Y-%m-%d")),
            "Json",
        ])
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects bases without a path, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl<C: HttpClient> StationDirectory for LondonAirClient<C> {
    #[tracing::instrument(skip_all, fields(group = %self.group))]
    async fn list_stations(&self) -> Result<Vec<Station>, DirectoryError> {
        let url = self.sites_url();
        debug!(url = %url, "Requesting monitoring sites");

        let body = fetch_json(&self.http, url).await?;
        let stations = parse_sites(body)?;

        info!(count = stations.len(), "Found monitoring sites");
        Ok(stations)
    }
}

#[async_trait]
impl<C: HttpClient> StationFetcher for LondonAirClient<C> {
    #[tracing::instrument(skip_all, fields(station = %station, start = %start, end = %end))]
    async fn fetch(
        &self,
        station: &Station,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<Vec<MeasurementRecord>>, FetchError> {
        if start > end {
            return Err(FetchError::InvalidRange { start, end });
        }

        let url = self.site_data_url(station, start, end);
        let body = fetch_json(&self.http, url).await?;
        let records = parse_site_data(station, &body)?;

        debug!(
            records = records.as_ref().map_or(0, Vec::len),
            "Site data received"
        );
        Ok(records)
    }
}

/// Extracts site codes from a discovery response, in response order.
pub fn parse_sites(body: Value) -> Result<Vec<Station>, DirectoryError> {
    let response: DiscoveryResponse =
        serde_json::from_value(body).map_err(|e| DirectoryError::Malformed(e.to_string()))?;

    Ok(response
        .sites
        .site
        .into_iter()
        .map(|s| Station::new(s.code))
        .collect())
}

/// Extracts the records of a per-site data response and tags them with `station`.
///
/// A response without a `Site` object, without `Data`, or with an empty
/// `Data` list means "no data" and yields `Ok(None)`.
pub fn parse_site_data(
    station: &Station,
    body: &Value,
) -> Result<Option<Vec<MeasurementRecord>>, FetchError> {
    let Some(site) = body.get("Site") else {
        return Ok(None);
    };

    let data = match site.get("Data") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(FetchError::Malformed(format!(
                "expected Data to be a list, got {}",
                json_kind(other)
            )));
        }
    };

    if data.is_empty() {
        return Ok(None);
    }

    data.iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_object()
                .map(|obj| MeasurementRecord::from_json(station.clone(), obj))
                .ok_or_else(|| {
                    FetchError::Malformed(format!(
                        "record {i} is {} rather than an object",
                        json_kind(item)
                    ))
                })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::model::FieldValue;
    use crate::pipeline::PipelineRunner;
    use serde_json::json;
    use std::sync::Mutex;

    struct UnreachableClient;

    #[async_trait]
    impl HttpClient for UnreachableClient {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            panic!("no request expected");
        }
    }

    /// Answers each request from the first route whose path fragment the
    /// URL contains, and remembers every URL it was asked for.
    #[derive(Default)]
    struct CannedHttp {
        routes: Vec<(&'static str, u16, &'static str)>,
        requested: Mutex<Vec<String>>,
    }

    impl CannedHttp {
        fn route(mut self, fragment: &'static str, status: u16, body: &'static str) -> Self {
            self.routes.push((fragment, status, body));
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for CannedHttp {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let url = req.url().to_string();
            self.requested.lock().unwrap().push(url.clone());

            let (status, body) = self
                .routes
                .iter()
                .find(|(fragment, _, _)| url.contains(fragment))
                .map(|(_, status, body)| (*status, *body))
                .unwrap_or((404, ""));

            let resp = http::Response::builder().status(status).body(body).unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }

    const BASE: &str = "https://example.test/AirQuality";

    const SITES_BODY: &str =
        r#"{"Sites": {"Site": [{"@SiteCode": "S1"}, {"@SiteCode": "S2"}]}}"#;

    const S1_BODY: &str = r#"{"Site": {"Data": [
        {"DateTime": "2024-01-01 08:00:00", "value": 10},
        {"DateTime": "2024-01-01 20:00:00", "value": 20}
    ]}}"#;

    fn client(http: CannedHttp) -> LondonAirClient<CannedHttp> {
        LondonAirClient::new(http, BASE, "London").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_urls() {
        let client = LondonAirClient::new(UnreachableClient, "https://example.test/AirQuality/", "London").unwrap();
        assert_eq!(
            client.sites_url().as_str(),
            "https://example.test/AirQuality/Information/MonitoringSites/GroupName=London/Json"
        );
        assert_eq!(
            client.site_data_url(&Station::from("BX1"), date(2024, 1, 1), date(2024, 1, 1)).as_str(),
            "https://example.test/AirQuality/Data/Site/SiteCode=BX1/StartDate=2024-01-01/EndDate=2024-01-01/Json"
        );
    }

    #[test]
    fn test_station_code_is_escaped_in_path() {
        let client = LondonAirClient::new(UnreachableClient, BASE, "London").unwrap();
        let url = client.site_data_url(&Station::from("A/B?x"), date(2024, 1, 1), date(2024, 1, 1));
        assert_eq!(
            url.as_str(),
            "https://example.test/AirQuality/Data/Site/SiteCode=A%2FB%3Fx/StartDate=2024-01-01/EndDate=2024-01-01/Json"
        );
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_base_url_must_be_absolute() {
        assert!(matches!(
            LondonAirClient::new(UnreachableClient, "not a url", "London"),
            Err(HttpError::InvalidUrl(_))
        ));
        assert!(matches!(
            LondonAirClient::new(UnreachableClient, "mailto:air@example.test", "London"),
            Err(HttpError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_parse_sites_in_response_order() {
        let body = json!({
            "Sites": {"Site": [
                {"@SiteCode": "BX1", "@SiteName": "Bexley - Slade Green"},
                {"@SiteCode": "BG2", "@SiteName": "Barking and Dagenham - Scrattons Farm"}
            ]}
        });
        let sites = parse_sites(body).unwrap();
        assert_eq!(sites, vec![Station::from("BX1"), Station::from("BG2")]);
    }

    #[test]
    fn test_parse_sites_empty_list() {
        let sites = parse_sites(json!({"Sites": {"Site": []}})).unwrap();
        assert!(sites.is_empty());
    }

    #[test]
    fn test_parse_sites_malformed() {
        assert!(matches!(
            parse_sites(json!({"Nope": {}})),
            Err(DirectoryError::Malformed(_))
        ));
        assert!(matches!(
            parse_sites(json!({"Sites": {"Site": [{"@SiteName": "no code"}]}})),
            Err(DirectoryError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_site_data_tags_records() {
        let body = json!({
            "Site": {"Data": [
                {"DateTime": "2024-01-01 08:00:00", "value": 10},
                {"DateTime": "2024-01-01 20:00:00", "value": 20}
            ]}
        });
        let records = parse_site_data(&Station::from("S1"), &body).unwrap().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.station().as_str() == "S1"));
        assert_eq!(records[1].field("value"), Some(&FieldValue::Number(20.0)));
    }

    #[test]
    fn test_parse_site_data_absent_is_empty() {
        let s = Station::from("S1");
        assert!(parse_site_data(&s, &json!({})).unwrap().is_none());
        assert!(parse_site_data(&s, &json!({"Site": {}})).unwrap().is_none());
        assert!(parse_site_data(&s, &json!({"Site": {"Data": []}})).unwrap().is_none());
    }

    #[test]
    fn test_parse_site_data_malformed() {
        let s = Station::from("S1");
        assert!(matches!(
            parse_site_data(&s, &json!({"Site": {"Data": "oops"}})),
            Err(FetchError::Malformed(_))
        ));
        assert!(matches!(
            parse_site_data(&s, &json!({"Site": {"Data": [1, 2]}})),
            Err(FetchError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_rejects_inverted_range_without_request() {
        let client = LondonAirClient::new(UnreachableClient, DEFAULT_BASE_URL, "London").unwrap();
        let result = client
            .fetch(&Station::from("S1"), date(2024, 1, 2), date(2024, 1, 1))
            .await;
        assert!(matches!(result, Err(FetchError::InvalidRange { .. })));
    }

    #[tokio::test]
    async fn test_list_stations_over_http() {
        let client = client(CannedHttp::default().route("MonitoringSites", 200, SITES_BODY));

        let stations = client.list_stations().await.unwrap();

        assert_eq!(stations, vec![Station::from("S1"), Station::from("S2")]);
        assert_eq!(
            client.http.requested(),
            vec!["https://example.test/AirQuality/Information/MonitoringSites/GroupName=London/Json"]
        );
    }

    #[tokio::test]
    async fn test_list_stations_server_error() {
        let client = client(CannedHttp::default().route("MonitoringSites", 500, "oops"));

        let err = client.list_stations().await.unwrap_err();

        match err {
            DirectoryError::Http(HttpError::Status(status)) => assert_eq!(status.as_u16(), 500),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_over_http() {
        let client = client(CannedHttp::default().route("SiteCode=S1/", 200, S1_BODY));

        let records = client
            .fetch(&Station::from("S1"), date(2024, 1, 1), date(2024, 1, 1))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            client.http.requested(),
            vec!["https://example.test/AirQuality/Data/Site/SiteCode=S1/StartDate=2024-01-01/EndDate=2024-01-01/Json"]
        );
    }

    #[tokio::test]
    async fn test_fetch_invalid_json() {
        let client = client(CannedHttp::default().route("SiteCode=S1/", 200, "<html>busy</html>"));

        let err = client
            .fetch(&Station::from("S1"), date(2024, 1, 1), date(2024, 1, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Http(HttpError::Json(_))));
    }

    #[tokio::test]
    async fn test_run_aborts_on_discovery_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(CannedHttp::default().route("MonitoringSites", 503, ""));
        let runner = PipelineRunner::new(&client, &client, dir.path(), "london");

        let err = runner.run(date(2024, 1, 1)).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Directory(DirectoryError::Http(HttpError::Status(_)))
        ));
        assert_eq!(client.http.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_run_continues_past_station_with_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(
            CannedHttp::default()
                .route("MonitoringSites", 200, SITES_BODY)
                .route("SiteCode=S1/", 200, S1_BODY)
                .route("SiteCode=S2/", 200, "not json"),
        );
        let runner = PipelineRunner::new(&client, &client, dir.path(), "london");

        let summary = runner.run(date(2024, 1, 1)).await.unwrap();

        assert_eq!(summary.raw_rows, 2);
        assert_eq!(summary.collected, vec![Station::from("S1")]);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, Station::from("S2"));
        assert!(matches!(
            summary.failures[0].1,
            FetchError::Http(HttpError::Json(_))
        ));
        assert_eq!(client.http.requested().len(), 3);
    }
}
