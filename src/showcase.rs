//! Navigation bar, showcase cards and screenshot thumbnails injected into site pages.

use std::cmp::Ordering;

use askama::Template;
use kuchikikiki::NodeRef;
use log::debug;
use rand::Rng;

use crate::{
    dom,
    structures::{errors::SiteError, model::SiteRecord},
};

pub const LOGO: &str = "/images/weewx-logo-128x128.png";

pub struct NavItem {
    pub href: &'static str,
    pub label: &'static str,
}

pub const NAV_ITEMS: [NavItem; 7] = [
    NavItem { href: "/stations.html", label: "MAP" },
    NavItem { href: "/showcase.html", label: "SHOWCASE" },
    NavItem { href: "/code.html", label: "CODE" },
    NavItem { href: "/hardware.html", label: "HARDWARE" },
    NavItem { href: "/support.html", label: "SUPPORT" },
    NavItem { href: "/docs.html", label: "DOCS" },
    NavItem { href: "/downloads", label: "DOWNLOAD" },
];

#[derive(Template)]
#[template(path = "navigation.html")]
struct NavigationTemplate<'a> {
    logo: &'a str,
    items: &'a [NavItem],
}

#[derive(Template)]
#[template(path = "showcase.html")]
struct ShowcaseTemplate<'a> {
    sites: Vec<&'a SiteRecord>,
    base: &'a str,
}

#[derive(Template)]
#[template(path = "screenshots.html")]
struct ScreenshotsTemplate<'a> {
    sites: Vec<&'a SiteRecord>,
    base: &'a str,
}

/// Injects the site navigation bar into `#navigation`. A bar left by an
/// earlier call is replaced, so the page never carries two.
pub fn render_navigation(document: &NodeRef) -> Result<bool, SiteError> {
    let Some(container) = dom::find_by_id(document, "navigation") else {
        debug!("no #navigation on page");
        return Ok(false);
    };

    if let Ok(previous) = container.select("div.nav") {
        for bar in previous.collect::<Vec<_>>() {
            bar.as_node().detach();
        }
    }
    let html = NavigationTemplate {
        logo: LOGO,
        items: &NAV_ITEMS,
    }
    .render()?;
    dom::append_html(&container, &html);
    Ok(true)
}

pub struct Showcase<'a> {
    sites: &'a [SiteRecord],
    screenshots_base: &'a str,
}

impl<'a> Showcase<'a> {
    pub fn new(sites: &'a [SiteRecord], screenshots_base: &'a str) -> Self {
        Self {
            sites,
            screenshots_base: screenshots_base.trim_end_matches('/'),
        }
    }

    /// Fills `#showcase` with one card per site, in table order.
    pub fn render_showcase(&self, document: &NodeRef) -> Result<bool, SiteError> {
        let order: Vec<usize> = (0..self.sites.len()).collect();
        self.render_showcase_ordered(document, &order)
    }

    /// Like [`Showcase::render_showcase`], visiting sites in the order of `order`.
    pub fn render_showcase_ordered(
        &self,
        document: &NodeRef,
        order: &[usize],
    ) -> Result<bool, SiteError> {
        let Some(container) = dom::find_by_id(document, "showcase") else {
            debug!("no #showcase on page");
            return Ok(false);
        };
        let html = ShowcaseTemplate {
            sites: self.pick(order),
            base: self.screenshots_base,
        }
        .render()?;
        dom::replace_html(&container, &html);
        Ok(true)
    }

    /// Fills `#screenshots` with thumbnails and returns the indices shown, or
    /// `None` when the page has no such container.
    pub fn render_screenshots<R: Rng + ?Sized>(
        &self,
        document: &NodeRef,
        max: Option<usize>,
        random: bool,
        rng: &mut R,
    ) -> Result<Option<Vec<usize>>, SiteError> {
        let Some(container) = dom::find_by_id(document, "screenshots") else {
            debug!("no #screenshots on page");
            return Ok(None);
        };
        let indices = select_screenshots(self.sites.len(), max, random, rng);
        let html = ScreenshotsTemplate {
            sites: self.pick(&indices),
            base: self.screenshots_base,
        }
        .render()?;
        dom::replace_html(&container, &html);
        Ok(Some(indices))
    }

    fn pick(&self, indices: &[usize]) -> Vec<&'a SiteRecord> {
        indices.iter().filter_map(|&i| self.sites.get(i)).collect()
    }
}

/// Chooses which of `len` sites get a thumbnail.
///
/// Without `random` this is the first `max` sites. With it, each site is kept
/// on a coin flip in table order until `max` have been kept, so fewer than
/// `max` may come back and earlier sites are favoured. A missing or zero
/// `max` means every site.
pub fn select_screenshots<R: Rng + ?Sized>(
    len: usize,
    max: Option<usize>,
    random: bool,
    rng: &mut R,
) -> Vec<usize> {
    let max = max.filter(|&max| max > 0).unwrap_or(len);
    if !random {
        return (0..max.min(len)).collect();
    }

    let mut indices = Vec::with_capacity(max.min(len));
    for i in 0..len {
        if indices.len() >= max {
            break;
        }
        if rng.random_bool(0.5) {
            indices.push(i);
        }
    }
    indices
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Description,
    StationUrl,
    Latitude,
    Longitude,
    StationType,
    LastSeen,
    WeewxInfo,
}

impl SortField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "description" => Some(SortField::Description),
            "station_url" | "stationUrl" => Some(SortField::StationUrl),
            "latitude" => Some(SortField::Latitude),
            "longitude" => Some(SortField::Longitude),
            "station_type" | "stationType" => Some(SortField::StationType),
            "last_seen" | "lastSeen" => Some(SortField::LastSeen),
            "weewx_info" | "weewxInfo" => Some(SortField::WeewxInfo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Up,
    Down,
}

impl From<&str> for SortDirection {
    fn from(value: &str) -> Self {
        if value == "up" {
            SortDirection::Up
        } else {
            SortDirection::Down
        }
    }
}

/// Three-way comparison that treats unordered values (NaN) as equal.
pub fn compare<T: PartialOrd + ?Sized>(x: &T, y: &T) -> Ordering {
    if x < y {
        Ordering::Less
    } else if x > y {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Stable permutation of `0..items.len()` ordered by `key`.
pub fn sorted_indices<T, K, F>(items: &[T], direction: SortDirection, key: F) -> Vec<usize>
where
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    let keys: Vec<K> = items.iter().map(key).collect();
    let mut indices: Vec<usize> = (0..items.len()).collect();
    indices.sort_by(|&a, &b| match direction {
        SortDirection::Up => compare(&keys[a], &keys[b]),
        SortDirection::Down => compare(&keys[b], &keys[a]),
    });
    indices
}

/// Order in which to show `sites` when sorted on `field`. `"up"` sorts
/// ascending, any other direction descending. Unknown fields leave the table
/// order alone. Sites missing the field sort before those that have it.
pub fn sort_indices(sites: &[SiteRecord], field: &str, direction: &str) -> Vec<usize> {
    let Some(field) = SortField::parse(field) else {
        debug!("unknown sort field {field:?}, keeping table order");
        return (0..sites.len()).collect();
    };
    let direction = SortDirection::from(direction);

    match field {
        // Case-folded first so "amatyr" lands next to "AmatYr".
        SortField::Description => sorted_indices(sites, direction, |site| {
            (site.description.to_lowercase(), site.description.clone())
        }),
        SortField::StationUrl => sorted_indices(sites, direction, |site| {
            site.station_url.as_deref().map(str::to_lowercase)
        }),
        SortField::Latitude => sorted_indices(sites, direction, |site| site.latitude),
        SortField::Longitude => sorted_indices(sites, direction, |site| site.longitude),
        SortField::StationType => {
            sorted_indices(sites, direction, |site| site.station_type.clone())
        }
        SortField::LastSeen => sorted_indices(sites, direction, |site| site.last_seen),
        SortField::WeewxInfo => sorted_indices(sites, direction, |site| site.weewx_info.clone()),
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    const PAGE: &str = r#"<html><head><title>Showcase</title></head><body>
<div id="navigation"></div>
<div id="showcase"><p>Loading...</p></div>
<div id="screenshots"></div>
</body></html>"#;

    fn table(len: usize) -> Vec<SiteRecord> {
        (0..len)
            .map(|i| {
                SiteRecord::new(
                    &format!("Station {i}"),
                    &format!("https://station{i}.example/"),
                    &format!("station{i}.png"),
                )
            })
            .collect()
    }

    fn described(names: &[&str]) -> Vec<SiteRecord> {
        names.iter().map(|name| SiteRecord::new(name, "https://x.example/", "x.png")).collect()
    }

    fn attr_values(document: &NodeRef, selector: &str, attr: &str) -> Vec<String> {
        document
            .select(selector)
            .unwrap()
            .filter_map(|node| dom::attribute(node.as_node(), attr))
            .collect()
    }

    #[test]
    fn navigation_is_injected_once() {
        let document = dom::parse(PAGE);
        assert!(render_navigation(&document).unwrap());
        assert!(render_navigation(&document).unwrap());

        assert_eq!(document.select("#navigation div.nav").unwrap().count(), 1);
        let links = attr_values(&document, "#navigation div.navitem a", "href");
        assert_eq!(
            links,
            [
                "/",
                "/stations.html",
                "/showcase.html",
                "/code.html",
                "/hardware.html",
                "/support.html",
                "/docs.html",
                "/downloads"
            ]
        );
        assert_eq!(attr_values(&document, "img.logo", "src"), [LOGO]);
    }

    #[test]
    fn missing_containers_are_skipped() {
        let document = dom::parse("<html><body><p>About</p></body></html>");
        let sites = table(3);
        let showcase = Showcase::new(&sites, "screenshots");
        let mut rng = StdRng::seed_from_u64(7);

        assert!(!render_navigation(&document).unwrap());
        assert!(!showcase.render_showcase(&document).unwrap());
        assert_eq!(showcase.render_screenshots(&document, Some(2), true, &mut rng).unwrap(), None);
        assert_eq!(document.select("img").unwrap().count(), 0);
    }

    #[test]
    fn showcase_replaces_container_with_cards() {
        let document = dom::parse(PAGE);
        let sites = table(3);
        let showcase = Showcase::new(&sites, "screenshots/");
        showcase.render_showcase(&document).unwrap();
        showcase.render_showcase(&document).unwrap();

        assert!(document.select_first("#showcase p").is_err());
        let cards: Vec<NodeRef> = document
            .select("#showcase div.showcase_item")
            .unwrap()
            .map(|card| card.as_node().clone())
            .collect();
        assert_eq!(cards.len(), 3);

        let first = &cards[0];
        let link = first.select_first("a").unwrap();
        assert_eq!(dom::attribute(link.as_node(), "href").as_deref(), Some("https://station0.example/"));
        assert_eq!(link.as_node().text_contents(), "Station 0");
        assert_eq!(
            attr_values(first, "img.screenshot", "src"),
            ["screenshots/station0.png"]
        );
    }

    #[test]
    fn showcase_escapes_descriptions() {
        let document = dom::parse(PAGE);
        let sites = described(&["<b>Bold</b> & Co"]);
        Showcase::new(&sites, "screenshots").render_showcase(&document).unwrap();
        assert!(document.select_first("#showcase b").is_err());
        let link = document.select_first("#showcase a").unwrap();
        assert_eq!(link.as_node().text_contents(), "<b>Bold</b> & Co");
    }

    #[test]
    fn ordered_showcase_follows_permutation() {
        let document = dom::parse(PAGE);
        let sites = described(&["B", "A"]);
        let showcase = Showcase::new(&sites, "screenshots");
        let order = sort_indices(&sites, "description", "up");
        showcase.render_showcase_ordered(&document, &order).unwrap();
        let names: Vec<String> = document
            .select("#showcase div.showcase_item > a:first-child")
            .unwrap()
            .map(|a| a.as_node().text_contents())
            .collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn screenshots_without_random_take_the_head() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_screenshots(10, Some(3), false, &mut rng), [0, 1, 2]);
        assert_eq!(select_screenshots(10, None, false, &mut rng), (0..10).collect::<Vec<_>>());
        assert_eq!(select_screenshots(10, Some(0), false, &mut rng).len(), 10);
        assert_eq!(select_screenshots(2, Some(5), false, &mut rng), [0, 1]);
    }

    #[test]
    fn random_screenshots_are_bounded_and_increasing() {
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = select_screenshots(26, Some(4), true, &mut rng);
            assert!(picked.len() <= 4, "seed {seed} picked {picked:?}");
            assert!(picked.windows(2).all(|w| w[0] < w[1]), "seed {seed} picked {picked:?}");
            assert!(picked.iter().all(|&i| i < 26));
        }
    }

    #[test]
    fn random_screenshots_render_selected_thumbnails() {
        let document = dom::parse(PAGE);
        let sites = table(10);
        let showcase = Showcase::new(&sites, "screenshots");
        let mut rng = StdRng::seed_from_u64(42);
        let picked = showcase
            .render_screenshots(&document, Some(3), true, &mut rng)
            .unwrap()
            .unwrap();

        let expected: Vec<String> = picked
            .iter()
            .map(|i| format!("screenshots/station{i}.png"))
            .collect();
        assert_eq!(attr_values(&document, "#screenshots img.screenshot", "src"), expected);
        assert_eq!(document.select("#screenshots br").unwrap().count(), picked.len());
    }

    #[test]
    fn sort_by_description() {
        let sites = described(&["B", "A"]);
        assert_eq!(sort_indices(&sites, "description", "up"), [1, 0]);
        assert_eq!(sort_indices(&sites, "description", "down"), [0, 1]);
        assert_eq!(sort_indices(&sites, "description", "sideways"), [0, 1]);
    }

    #[test]
    fn description_sort_ignores_case() {
        let sites = described(&["ruskers.com", "Royston, UK", "AmatYr - Naustvika"]);
        assert_eq!(sort_indices(&sites, "description", "up"), [2, 1, 0]);
    }

    #[test]
    fn unknown_field_keeps_table_order() {
        let sites = table(5);
        assert_eq!(sort_indices(&sites, "unknownField", "up"), [0, 1, 2, 3, 4]);
    }

    #[test]
    fn sort_by_numeric_and_optional_fields() {
        let mut sites = table(3);
        sites[0].latitude = Some(45.7);
        sites[1].latitude = Some(-27.2);
        sites[2].latitude = None;
        assert_eq!(sort_indices(&sites, "latitude", "up"), [2, 1, 0]);
        assert_eq!(sort_indices(&sites, "latitude", "down"), [0, 1, 2]);

        sites[0].station_url = Some("https://B.example".to_string());
        sites[1].station_url = Some("https://a.example".to_string());
        sites[2].station_url = Some("https://c.example".to_string());
        assert_eq!(sort_indices(&sites, "stationUrl", "up"), [1, 0, 2]);
    }

    #[test]
    fn equal_keys_keep_table_order() {
        let sites = table(4);
        assert_eq!(sort_indices(&sites, "last_seen", "up"), [0, 1, 2, 3]);
        assert_eq!(sort_indices(&sites, "last_seen", "down"), [0, 1, 2, 3]);
    }

    #[test]
    fn compare_is_three_way() {
        assert_eq!(compare(&1, &2), Ordering::Less);
        assert_eq!(compare(&2, &1), Ordering::Greater);
        assert_eq!(compare(&f64::NAN, &1.0), Ordering::Equal);
        assert_eq!(compare("a", "a"), Ordering::Equal);
    }
}
