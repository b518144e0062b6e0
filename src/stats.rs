//! Registration statistics dashboard: runs a named report against the stats
//! API and turns the series it returns into a line chart.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use futures::future::{BoxFuture, FutureExt};
use log::{debug, info, warn};
use reqwest::Client;
use serde::{ser::SerializeSeq, Serialize, Serializer};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::structures::{
    config::StatsConfig,
    errors::SiteError,
    model::{ReportRequest, ReportSeries, SeriesData},
};

pub const PLACEHOLDER: &str = "Please wait...";

pub trait ReportSource {
    fn fetch<'a>(
        &'a self,
        request: &'a ReportRequest,
    ) -> BoxFuture<'a, Result<ReportSeries, SiteError>>;
}

/// Fetches reports over HTTP from the stats API server.
pub struct StatsClient {
    client: Client,
    api_base: String,
}

impl StatsClient {
    pub fn new(client: Client, api_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, request: &ReportRequest) -> String {
        format!("{}{}", self.api_base, request.path())
    }
}

impl ReportSource for StatsClient {
    fn fetch<'a>(
        &'a self,
        request: &'a ReportRequest,
    ) -> BoxFuture<'a, Result<ReportSeries, SiteError>> {
        async move {
            let url = self.url(request);
            debug!("fetching {}", url);
            let response = self
                .client
                .get(&url)
                .timeout(Duration::from_secs(10))
                .send()
                .await?
                .error_for_status()?;
            Ok(response.json::<ReportSeries>().await?)
        }
        .boxed()
    }
}

/// One plotted line, shaped like a Plotly scatter trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotTrace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mode: &'static str,
    pub name: String,
    #[serde(serialize_with = "serialize_instants")]
    pub x: Vec<OffsetDateTime>,
    pub y: Vec<Option<f64>>,
    pub connectgaps: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    pub data: Vec<PlotTrace>,
}

impl Chart {
    /// JSON for embedding in an inline `<script>`.
    pub fn to_script_json(&self) -> Result<String, SiteError> {
        Ok(serde_json::to_string(self)?.replace("</", "<\\/"))
    }
}

fn serialize_instants<S: Serializer>(
    instants: &[OffsetDateTime],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(instants.len()))?;
    for instant in instants {
        let text = instant.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        seq.serialize_element(&text)?;
    }
    seq.end()
}

fn instant(epoch_seconds: f64) -> Result<OffsetDateTime, SiteError> {
    Ok(OffsetDateTime::from_unix_timestamp_nanos(
        (epoch_seconds * 1e9).round() as i128,
    )?)
}

/// One trace per series, in response order. Gaps stay gaps.
pub fn traces(series: &ReportSeries) -> Result<Vec<PlotTrace>, SiteError> {
    series
        .0
        .iter()
        .map(|(name, SeriesData(timestamps, values))| {
            if timestamps.len() != values.len() {
                return Err(SiteError::Other(format!(
                    "series {name} has {} timestamps but {} values",
                    timestamps.len(),
                    values.len()
                )));
            }
            Ok(PlotTrace {
                kind: "scatter",
                mode: "lines",
                name: name.clone(),
                x: timestamps.iter().map(|&t| instant(t)).collect::<Result<_, _>>()?,
                y: values.clone(),
                connectgaps: false,
            })
        })
        .collect()
}

/// What `#info_plot` currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotOutput {
    Idle,
    Loading,
    Rendered(Chart),
}

#[derive(Debug)]
struct Controls {
    selected: Option<String>,
    consolidate_enabled: bool,
    output: PlotOutput,
}

/// Report and consolidation selectors plus the plot area.
///
/// Every run bumps a generation counter before it fetches. When runs overlap,
/// a response that arrives after a newer run has started is dropped, so the
/// plot always belongs to the most recent selection.
pub struct Dashboard<S> {
    source: S,
    config: StatsConfig,
    generation: AtomicU64,
    controls: Mutex<Controls>,
}

impl<S: ReportSource> Dashboard<S> {
    pub fn new(source: S, config: StatsConfig) -> Self {
        Self {
            source,
            config,
            generation: AtomicU64::new(0),
            controls: Mutex::new(Controls {
                selected: None,
                consolidate_enabled: false,
                output: PlotOutput::Idle,
            }),
        }
    }

    fn controls(&self) -> MutexGuard<'_, Controls> {
        self.controls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_consolidatable(&self, report: &str) -> bool {
        self.config.consolidatable.iter().any(|name| name == report)
    }

    /// Report picked. Consolidatable reports wait for a consolidation choice,
    /// anything else runs straight away unconsolidated.
    pub async fn on_change_report(&self, report: &str) {
        let consolidatable = self.is_consolidatable(report);
        {
            let mut controls = self.controls();
            controls.selected = Some(report.to_string());
            controls.consolidate_enabled = consolidatable;
        }
        if !consolidatable {
            self.run_report(report, false).await;
        }
    }

    /// Consolidation picked: `"yes"` turns it on, anything else off.
    pub async fn on_change_consolidate(&self, value: &str) {
        let Some(report) = self.selected_report() else {
            debug!("consolidation changed with no report selected");
            return;
        };
        self.run_report(&report, value == "yes").await;
    }

    pub async fn run_report(&self, report: &str, consolidate: bool) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.controls().output = PlotOutput::Loading;

        let request = ReportRequest::new(report, consolidate);
        let result = self.source.fetch(&request).await;
        let data = match result.and_then(|series| traces(&series)) {
            Ok(data) => data,
            Err(e) => {
                // The placeholder stays up; there is nothing else to show.
                warn!("stats report {} failed: {}", request.path(), e);
                return;
            }
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("dropping stale result for {}", request.path());
            return;
        }
        info!("rendered {} with {} series", request.path(), data.len());
        self.controls().output = PlotOutput::Rendered(Chart {
            title: self.config.label_for(report),
            data,
        });
    }

    pub fn selected_report(&self) -> Option<String> {
        self.controls().selected.clone()
    }

    pub fn consolidate_enabled(&self) -> bool {
        self.controls().consolidate_enabled
    }

    pub fn output(&self) -> PlotOutput {
        self.controls().output.clone()
    }
}
