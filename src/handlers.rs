use std::{
    fs,
    path::{Component, Path, PathBuf},
    time::Duration,
};

use actix_web::{get, http::StatusCode, web, HttpRequest, HttpResponse};
use askama::Template;
use log::{info, warn};
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Deserialize;

use crate::{
    dom,
    listing::ListingDecorator,
    showcase::{self, Showcase},
    stats::{Dashboard, PlotOutput, StatsClient, PLACEHOLDER},
    structures::{config::Config, errors::SiteError},
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(stats_handler)
        .service(listing_handler)
        .service(page_handler);
}

struct ReportChoice<'a> {
    name: &'a str,
    label: &'a str,
    selected: bool,
}

#[derive(Template)]
#[template(path = "stats.html")]
struct StatsTemplate<'a> {
    site_name: &'a str,
    reports: Vec<ReportChoice<'a>>,
    nothing_selected: bool,
    consolidate_enabled: bool,
    consolidate: &'a str,
    placeholder: bool,
    placeholder_text: &'a str,
    chart: Option<String>,
}

/// Mount point of the listing proxy.
const LISTING_PREFIX: &str = "/listing";

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    report: Option<String>,
    consolidate: Option<String>,
    /// Which selector the form was submitted from: `report` or `consolidate`.
    changed: Option<String>,
}

#[get("/stats")]
pub async fn stats_handler(
    query: web::Query<StatsQuery>,
    config: web::Data<Config>,
    client: web::Data<Client>,
) -> Result<HttpResponse, SiteError> {
    let source = StatsClient::new(client.get_ref().clone(), &config.stats.api_base);
    let dashboard = Dashboard::new(source, config.stats.clone());

    let report = query.report.as_deref().filter(|report| !report.is_empty());
    if let Some(report) = report {
        // Only configured reports ever reach the API server.
        if !config.stats.is_known_report(report) {
            warn!("Refusing unknown stats report {:?}", report);
            return Err(SiteError::NotFound(report.to_string()));
        }
    }

    // A new report choice discards whatever consolidation the form still carried.
    let report_changed = query.changed.as_deref() == Some("report");
    let consolidate = match query.consolidate.as_deref() {
        Some(value) if !report_changed => value,
        _ => "",
    };
    if let Some(report) = report {
        dashboard.on_change_report(report).await;
        if dashboard.consolidate_enabled() && !consolidate.is_empty() {
            dashboard.on_change_consolidate(consolidate).await;
        }
    }

    let output = dashboard.output();
    let chart = match &output {
        PlotOutput::Rendered(chart) => Some(chart.to_script_json()?),
        _ => None,
    };
    let page = StatsTemplate {
        site_name: &config.site_name,
        reports: config
            .stats
            .reports
            .iter()
            .map(|option| ReportChoice {
                name: &option.name,
                label: &option.label,
                selected: Some(option.name.as_str()) == report,
            })
            .collect(),
        nothing_selected: report.is_none(),
        consolidate_enabled: dashboard.consolidate_enabled(),
        consolidate: if dashboard.consolidate_enabled() { consolidate } else { "" },
        placeholder: output == PlotOutput::Loading,
        placeholder_text: PLACEHOLDER,
        chart,
    }
    .render()?;

    let document = dom::parse(&page);
    showcase::render_navigation(&document)?;
    Ok(HttpResponse::Ok()
        .content_type("text/html")
        .body(dom::serialize(&document)?))
}

#[get("/listing/{tail:.*}")]
pub async fn listing_handler(
    req: HttpRequest,
    config: web::Data<Config>,
    client: web::Data<Client>,
) -> Result<HttpResponse, SiteError> {
    // Still percent-encoded, so names with `#`, `?` or `%` reach the same upstream entry.
    let raw_path = req.uri().path();
    let listing_path = match raw_path.strip_prefix(LISTING_PREFIX) {
        Some("") | None => "/",
        Some(path) => path,
    };
    let mut url = format!("{}{}", config.listing.upstream.trim_end_matches('/'), listing_path);
    if let Some(query) = req.uri().query() {
        url.push('?');
        url.push_str(query);
    }
    let response = client
        .get(&url)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .inspect_err(|e| warn!("Failed to fetch listing {}: {}", url, e))?;

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    if !content_type.starts_with("text/html") {
        return Ok(HttpResponse::build(status)
            .content_type(content_type)
            .body(response.bytes().await?));
    }

    let document = dom::parse(&response.text().await?);
    ListingDecorator::new(&config.site_name, &config.listing.icons_base)
        .decorate(&document, listing_path);
    info!("Decorated listing {}", listing_path);
    Ok(HttpResponse::build(status)
        .content_type("text/html")
        .body(dom::serialize(&document)?))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    sort: Option<String>,
    order: Option<String>,
}

#[get("/{page:.*}")]
pub async fn page_handler(
    page: web::Path<String>,
    query: web::Query<PageQuery>,
    config: web::Data<Config>,
) -> Result<HttpResponse, SiteError> {
    let mut relative = page.into_inner();
    if relative.is_empty() || relative.ends_with('/') {
        relative.push_str("index.html");
    }
    let path = resolve(&config.site_root, &relative)?;

    let read_path = path.clone();
    let bytes = match web::block(move || fs::read(read_path)).await? {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SiteError::NotFound(relative));
        }
        Err(e) => return Err(e.into()),
    };

    let content_type = content_type_for(&path);
    if content_type != "text/html" {
        return Ok(HttpResponse::Ok().content_type(content_type).body(bytes));
    }

    let html = String::from_utf8_lossy(&bytes);
    let body = inject_page(&html, &config, &query)?;
    Ok(HttpResponse::Ok().content_type(content_type).body(body))
}

/// Runs the navigation, showcase and screenshot injectors over a site page.
pub fn inject_page(html: &str, config: &Config, query: &PageQuery) -> Result<String, SiteError> {
    let document = dom::parse(html);
    showcase::render_navigation(&document)?;

    let showcase = Showcase::new(&config.sites, &config.screenshots.base);
    match &query.sort {
        Some(field) => {
            let order = showcase::sort_indices(
                &config.sites,
                field,
                query.order.as_deref().unwrap_or("up"),
            );
            showcase.render_showcase_ordered(&document, &order)?;
        }
        None => {
            showcase.render_showcase(&document)?;
        }
    }
    showcase.render_screenshots(
        &document,
        config.screenshots.max,
        config.screenshots.random,
        &mut rand::rng(),
    )?;
    dom::serialize(&document)
}

/// Joins `relative` onto `root`, refusing anything that could step outside it.
fn resolve(root: &Path, relative: &str) -> Result<PathBuf, SiteError> {
    let relative_path = Path::new(relative);
    if relative_path
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        Ok(root.join(relative_path))
    } else {
        Err(SiteError::NotFound(relative.to_string()))
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
