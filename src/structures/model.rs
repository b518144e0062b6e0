use indexmap::IndexMap;
use serde::Deserialize;

/// One weather station shown on the showcase page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteRecord {
    pub description: String,
    pub url: String,
    pub screenshot: String,

    // Only consulted when sorting; none of the built-in stations carry them.
    #[serde(default, alias = "stationUrl")]
    pub station_url: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, alias = "stationType")]
    pub station_type: Option<String>,
    #[serde(default, alias = "lastSeen")]
    pub last_seen: Option<i64>,
    #[serde(default, alias = "weewxInfo")]
    pub weewx_info: Option<String>,
}

#[cfg(test)]
impl SiteRecord {
    pub fn new(description: &str, url: &str, screenshot: &str) -> Self {
        Self {
            description: description.to_string(),
            url: url.to_string(),
            screenshot: screenshot.to_string(),
            station_url: None,
            latitude: None,
            longitude: None,
            station_type: None,
            last_seen: None,
            weewx_info: None,
        }
    }
}

/// `[timestamps, values]` for a single series. Values may be `null` where the
/// report has a gap.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeriesData(pub Vec<f64>, pub Vec<Option<f64>>);

/// Body of `GET /api/v2/stats/{report}`, keyed by series name in response order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ReportSeries(pub IndexMap<String, SeriesData>);

/// A single run of a named report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub name: String,
    pub consolidate: bool,
}

impl ReportRequest {
    pub fn new(name: &str, consolidate: bool) -> Self {
        Self {
            name: name.to_string(),
            consolidate,
        }
    }

    /// Path and query relative to the API server.
    pub fn path(&self) -> String {
        let mut path = format!("/api/v2/stats/{}", self.name);
        if self.consolidate {
            path.push_str("?consolidate=1");
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_path_without_consolidation() {
        let req = ReportRequest::new("weewx_info", false);
        assert_eq!(req.path(), "/api/v2/stats/weewx_info");
    }

    #[test]
    fn request_path_with_consolidation() {
        let req = ReportRequest::new("python_info", true);
        assert_eq!(req.path(), "/api/v2/stats/python_info?consolidate=1");
    }

    #[test]
    fn report_series_keeps_response_order_and_gaps() {
        let body = r#"{"zeta": [[1, 2], [3.5, null]], "alpha": [[5], [6]]}"#;
        let series: ReportSeries = serde_json::from_str(body).unwrap();
        let names: Vec<&str> = series.0.keys().map(String::as_str).collect();
        assert_eq!(names, ["zeta", "alpha"]);
        assert_eq!(series.0["zeta"], SeriesData(vec![1.0, 2.0], vec![Some(3.5), None]));
    }

    #[test]
    fn site_record_accepts_camel_case_extended_fields() {
        let yaml = "
description: Hood River, Oregon
url: https://www.threefools.org/weewx/
screenshot: hoodriver.png
stationUrl: https://example.org/station
lastSeen: 1700000000
";
        let site: SiteRecord = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(site.station_url.as_deref(), Some("https://example.org/station"));
        assert_eq!(site.last_seen, Some(1_700_000_000));
        assert_eq!(site.latitude, None);
    }
}
