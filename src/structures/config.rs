use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use super::{errors::SiteError, model::SiteRecord};

const BUILTIN_SITES: &str = include_str!("../../data/sites.yaml");

/// Reports whose results can be consolidated by the API server.
pub const CONSOLIDATABLE_REPORTS: [&str; 5] = [
    "python_info",
    "weewx_info",
    "entry_path",
    "config_path",
    "platform_info",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_site_name")]
    pub site_name: String,
    #[serde(default = "default_site_root")]
    pub site_root: PathBuf,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub screenshots: ScreenshotsConfig,
    #[serde(default)]
    pub sites: Vec<SiteRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListingConfig {
    /// Autoindex server whose listings get decorated.
    pub upstream: String,
    #[serde(default = "default_icons_base")]
    pub icons_base: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatsConfig {
    pub api_base: String,
    #[serde(default = "default_consolidatable")]
    pub consolidatable: Vec<String>,
    #[serde(default = "default_reports")]
    pub reports: Vec<ReportOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportOption {
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScreenshotsConfig {
    #[serde(default = "default_screenshots_base")]
    pub base: String,
    #[serde(default)]
    pub max: Option<usize>,
    #[serde(default)]
    pub random: bool,
}

impl Config {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SiteError> {
        Self::from_yaml(&fs::read_to_string(path)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, SiteError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.with_builtin_sites()
    }

    fn with_builtin_sites(mut self) -> Result<Self, SiteError> {
        if self.sites.is_empty() {
            self.sites = builtin_sites()?;
        }
        Ok(self)
    }
}

impl StatsConfig {
    pub fn is_known_report(&self, report: &str) -> bool {
        self.reports.iter().any(|option| option.name == report)
    }

    pub fn label_for(&self, report: &str) -> String {
        self.reports
            .iter()
            .find(|option| option.name == report)
            .map_or_else(|| report.to_string(), |option| option.label.clone())
    }
}

/// The stations listed on weewx.com.
pub fn builtin_sites() -> Result<Vec<SiteRecord>, SiteError> {
    Ok(serde_yaml::from_str(BUILTIN_SITES)?)
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            upstream: "http://127.0.0.1:8081".to_string(),
            icons_base: default_icons_base(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8000".to_string(),
            consolidatable: default_consolidatable(),
            reports: default_reports(),
        }
    }
}

impl Default for ScreenshotsConfig {
    fn default() -> Self {
        Self {
            base: default_screenshots_base(),
            max: None,
            random: false,
        }
    }
}

fn default_site_name() -> String {
    "WeeWX".to_string()
}

fn default_site_root() -> PathBuf {
    PathBuf::from("./public")
}

fn default_icons_base() -> String {
    "/.nginxy/images/icons".to_string()
}

fn default_screenshots_base() -> String {
    "screenshots".to_string()
}

fn default_consolidatable() -> Vec<String> {
    CONSOLIDATABLE_REPORTS.iter().map(|s| s.to_string()).collect()
}

fn default_reports() -> Vec<ReportOption> {
    [
        ("weewx_info", "WeeWX version"),
        ("python_info", "Python version"),
        ("platform_info", "Platform"),
        ("entry_path", "Entry point"),
        ("config_path", "Configuration path"),
        ("station_type", "Station type"),
    ]
    .into_iter()
    .map(|(name, label)| ReportOption {
        name: name.to_string(),
        label: label.to_string(),
    })
    .collect()
}
