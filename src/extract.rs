//! Restaurant extraction from saved map-listing pages.
//!
//! Input is the raw HTML of a listing page (optionally wrapped in an MHTML
//! "single file" snapshot); output is a list of candidate
//! [`RestaurantRecord`]s plus the candidates that were dropped and why.
//! Extraction never fails as a whole: malformed markup just yields fewer
//! candidates.
//!
//! Two markup shapes are supported, picked explicitly through
//! [`ExtractionStrategy`]; there is no automatic fallback between them.
//!
//! | Strategy | Candidate | name | id / link | rating label |
//! |----------|-----------|------|-----------|--------------|
//! | `search_anchors` | `<a>` linking to the search endpoint | `q=` query param | `ludocid=` → `?cid=` link | `Rated 4.5 out of 5` |
//! | `place_cards` | `div[role="article"]` | card `aria-label` | first `/maps/place/` link | `4.5 stars` |
//!
//! Both strategies share the description handling: the candidate's visible
//! text (minus headings and labelled widgets) is the description block; each
//! `$` in it adds one to the price level; separators, review counts and bare
//! numbers are removed; the first remaining segment is the cuisine.
//!
//! Neither shape carries a street address. Anchor candidates also carry no
//! coordinates. Those fields are filled from the configured placeholders.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use percent_encoding::percent_decode_str;
use regex::Regex;
use scraper::{node::Element, ElementRef, Html, Selector};

pub use crate::config::ExtractionStrategy;
use crate::config::{Config, ExtractionConfig};
use crate::models::RestaurantRecord;

const MULTIPART_BOUNDARY: &str = "------MultipartBoundary--";
const HTML_CONTENT_TYPE: &str = "Content-Type: text/html";
const QUOTED_PRINTABLE: &str = "Content-Transfer-Encoding: quoted-printable";
const DOCTYPE_LOWER: &str = "<!doctype html";

/// Why a candidate was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingName,
    MissingDocId,
    MissingMapsUrl,
    MissingImage,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DropReason::MissingName => "no name",
            DropReason::MissingDocId => "no document id",
            DropReason::MissingMapsUrl => "no maps link",
            DropReason::MissingImage => "no image on the provider CDN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedCandidate {
    /// Index among the candidates the strategy considered.
    pub position: usize,
    pub reason: DropReason,
    /// Name, when it was already known at the point of failure.
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<RestaurantRecord>,
    pub dropped: Vec<DroppedCandidate>,
}

struct Selectors {
    anchor: Selector,
    labelled: Selector,
    image: Selector,
    card: Selector,
    place_link: Selector,
}

struct Patterns {
    query_name: Regex,
    docid: Regex,
    rated: Regex,
    stars: Regex,
    place_coords: Regex,
    parenthesized: Regex,
    separators: Regex,
    numeric: Regex,
    whitespace: Regex,
}

pub struct Extractor {
    config: ExtractionConfig,
    search_marker: String,
    selectors: Selectors,
    patterns: Patterns,
}

impl Extractor {
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        let selectors = Selectors {
            anchor: selector("a[href]")?,
            labelled: selector("[aria-label]")?,
            image: selector("img[src]")?,
            card: selector(r#"div[role="article"]"#)?,
            place_link: selector(r#"a[href*="/maps/place/"]"#)?,
        };
        let patterns = Patterns {
            query_name: Regex::new(r"(?:^|[?&])q=([^&#]+)")?,
            docid: Regex::new(r"ludocid=(\d+)")?,
            rated: Regex::new(r"Rated (\d+(\.\d+)?) out of 5")?,
            stars: Regex::new(r"^\s*(\d+(?:\.\d+)?) stars?")?,
            place_coords: Regex::new(r"!3d(-?\d+(?:\.\d+)?)!4d(-?\d+(?:\.\d+)?)")?,
            parenthesized: Regex::new(r"\([^)]*\)")?,
            separators: Regex::new(r"[·⋅•|,\n]")?,
            numeric: Regex::new(r"^[\d.,+\-–KkMm]+$")?,
            whitespace: Regex::new(r"\s+")?,
        };
        let search_marker = format!("{}?", config.search_path.trim_end_matches('?'));

        Ok(Self {
            config,
            search_marker,
            selectors,
            patterns,
        })
    }

    pub fn strategy(&self) -> ExtractionStrategy {
        self.config.strategy
    }

    /// Runs the configured strategy over a page (or saved-page snapshot).
    pub fn extract(&self, payload: &str) -> Extraction {
        let page = unwrap_saved_page(payload);
        let doc = Html::parse_document(&page);

        let extraction = match self.config.strategy {
            ExtractionStrategy::SearchAnchors => self.extract_search_anchors(&doc),
            ExtractionStrategy::PlaceCards => self.extract_place_cards(&doc),
        };

        for d in &extraction.dropped {
            tracing::debug!(
                position = d.position,
                name = d.name.as_deref().unwrap_or(""),
                reason = %d.reason,
                "candidate dropped"
            );
        }
        tracing::info!(
            strategy = ?self.config.strategy,
            records = extraction.records.len(),
            dropped = extraction.dropped.len(),
            "extraction finished"
        );

        extraction
    }

    // ============ search_anchors ============

    fn extract_search_anchors(&self, doc: &Html) -> Extraction {
        let mut out = Extraction::default();
        let candidates = doc.select(&self.selectors.anchor).filter(|a| {
            a.value()
                .attr("href")
                .is_some_and(|href| href.contains(&self.search_marker))
        });

        for (position, anchor) in candidates.enumerate() {
            match self.search_anchor_record(anchor) {
                Ok(record) => out.records.push(record),
                Err((reason, name)) => out.dropped.push(DroppedCandidate {
                    position,
                    reason,
                    name,
                }),
            }
        }
        out
    }

    fn search_anchor_record(
        &self,
        anchor: ElementRef<'_>,
    ) -> Result<RestaurantRecord, (DropReason, Option<String>)> {
        let href = anchor.value().attr("href").unwrap_or_default();

        let name = self
            .query_name(href)
            .ok_or((DropReason::MissingName, None))?;
        let docid = self
            .patterns
            .docid
            .captures(href)
            .map(|c| c[1].to_string())
            .ok_or_else(|| (DropReason::MissingDocId, Some(name.clone())))?;

        let base = self.config.maps_url_base.trim();
        if base.is_empty() {
            return Err((DropReason::MissingMapsUrl, Some(name)));
        }
        let maps_url = format!("{}?cid={}", base, docid);

        let rating = self.rating_in(anchor, &[&self.patterns.rated]);
        let block = self.description_block(anchor);
        let description = self.clean_description(&block, &name);

        let image_url = self
            .image_in(anchor)
            .ok_or_else(|| (DropReason::MissingImage, Some(name.clone())))?;

        Ok(RestaurantRecord {
            docid: Some(docid),
            address: self.config.placeholder_address.clone(),
            lat: self.config.placeholder_lat,
            lng: self.config.placeholder_lng,
            cuisine: cuisine_of(&description),
            rating,
            price_level: price_level(&block),
            description,
            maps_url,
            image_url,
            name,
        })
    }

    /// URL-decoded value of the `q=` query parameter.
    fn query_name(&self, href: &str) -> Option<String> {
        let raw = self.patterns.query_name.captures(href)?.get(1)?.as_str();
        let spaced = raw.replace('+', " ");
        let decoded = percent_decode_str(&spaced).decode_utf8_lossy();
        let name = decoded.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    // ============ place_cards ============

    fn extract_place_cards(&self, doc: &Html) -> Extraction {
        let mut out = Extraction::default();
        for (position, card) in doc.select(&self.selectors.card).enumerate() {
            match self.place_card_record(card) {
                Ok(record) => out.records.push(record),
                Err((reason, name)) => out.dropped.push(DroppedCandidate {
                    position,
                    reason,
                    name,
                }),
            }
        }
        out
    }

    fn place_card_record(
        &self,
        card: ElementRef<'_>,
    ) -> Result<RestaurantRecord, (DropReason, Option<String>)> {
        let name = card
            .value()
            .attr("aria-label")
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .ok_or((DropReason::MissingName, None))?;

        let href = card
            .select(&self.selectors.place_link)
            .find_map(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| (DropReason::MissingMapsUrl, Some(name.clone())))?;
        let maps_url = if href.starts_with('/') {
            let base = self.config.maps_url_base.trim_end_matches('/');
            format!("{}{}", base, href)
        } else {
            href.to_string()
        };

        let (lat, lng) = self
            .patterns
            .place_coords
            .captures(href)
            .and_then(|c| Some((c[1].parse::<f64>().ok()?, c[2].parse::<f64>().ok()?)))
            .unwrap_or((self.config.placeholder_lat, self.config.placeholder_lng));

        let rating = self.rating_in(card, &[&self.patterns.stars, &self.patterns.rated]);
        let block = self.description_block(card);
        let description = self.clean_description(&block, &name);

        let image_url = self
            .image_in(card)
            .ok_or_else(|| (DropReason::MissingImage, Some(name.clone())))?;

        Ok(RestaurantRecord {
            docid: None,
            address: self.config.placeholder_address.clone(),
            lat,
            lng,
            cuisine: cuisine_of(&description),
            rating,
            price_level: price_level(&block),
            description,
            maps_url,
            image_url,
            name,
        })
    }

    // ============ shared ============

    /// First `aria-label` under `root` matching one of `patterns`, else 0.
    fn rating_in(&self, root: ElementRef<'_>, patterns: &[&Regex]) -> f64 {
        for el in root.select(&self.selectors.labelled) {
            let Some(label) = el.value().attr("aria-label") else {
                continue;
            };
            for re in patterns {
                if let Some(value) = re.captures(label).and_then(|c| c[1].parse::<f64>().ok()) {
                    return value;
                }
            }
        }
        0.0
    }

    fn image_in(&self, root: ElementRef<'_>) -> Option<String> {
        root.select(&self.selectors.image)
            .filter_map(|img| img.value().attr("src"))
            .find(|src| src.starts_with(&self.config.image_cdn_prefix))
            .map(str::to_string)
    }

    /// Visible text under `root`, one line per text node. Text inside
    /// headings, labelled widgets and script/style elements is skipped.
    fn description_block(&self, root: ElementRef<'_>) -> String {
        let root_id = root.id();
        let mut lines = Vec::new();

        for node in root.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node
                .ancestors()
                .take_while(|a| a.id() != root_id)
                .filter_map(ElementRef::wrap)
                .any(|e| is_excluded(e.value()));
            if hidden {
                continue;
            }
            let line = text.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines.join("\n")
    }

    /// Turns a description block into `segment, segment, ...`.
    fn clean_description(&self, block: &str, name: &str) -> String {
        let text = block.replace('\u{a0}', " ").replace('$', "");
        let text = self.patterns.parenthesized.replace_all(&text, "\n");

        let mut segments: Vec<String> = Vec::new();
        for raw in self.patterns.separators.split(&text) {
            let seg = self.patterns.whitespace.replace_all(raw.trim(), " ");
            let seg = seg.trim_matches(|c: char| c == '-' || c == '–' || c.is_whitespace());
            if seg.is_empty()
                || self.patterns.numeric.is_match(seg)
                || seg.eq_ignore_ascii_case(name)
                || segments.iter().any(|s| s.eq_ignore_ascii_case(seg))
            {
                continue;
            }
            segments.push(seg.to_string());
        }
        segments.join(", ")
    }
}

fn selector(css: &'static str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector '{}': {:?}", css, e))
}

fn is_excluded(el: &Element) -> bool {
    matches!(el.name(), "script" | "style" | "noscript" | "template")
        || el.attr("aria-label").is_some()
        || el.attr("role") == Some("heading")
}

/// One `$` per literal `$` in the block.
fn price_level(block: &str) -> String {
    "$".repeat(block.matches('$').count())
}

/// Text before the first comma.
fn cuisine_of(description: &str) -> String {
    description
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// `dinemap extract <file>`: scrape a saved page and print what came out.
///
/// Nothing is written to the store.
pub fn run_extract(
    config: &Config,
    path: &Path,
    strategy: Option<ExtractionStrategy>,
) -> Result<()> {
    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut extraction_config = config.extraction.clone();
    if let Some(s) = strategy {
        extraction_config.strategy = s;
    }
    let extractor = Extractor::new(extraction_config)?;
    let Extraction { records, dropped } = extractor.extract(&payload);

    println!("extract {}", path.display());
    println!("  strategy: {}", extractor.strategy());
    println!("  records: {}", records.len());
    for r in &records {
        println!(
            "    {} | {} | {} | {}",
            r.name,
            r.rating,
            if r.price_level.is_empty() { "-" } else { &r.price_level },
            r.maps_url
        );
    }
    println!("  dropped: {}", dropped.len());
    for d in &dropped {
        match &d.name {
            Some(name) => println!("    #{} {}: {}", d.position, name, d.reason),
            None => println!("    #{}: {}", d.position, d.reason),
        }
    }
    println!("ok");

    Ok(())
}

/// Returns the HTML document inside an MHTML snapshot, or the payload
/// itself when it is not one.
///
/// The first part declaring `text/html` is used from its doctype onward;
/// quoted-printable bodies are decoded.
pub fn unwrap_saved_page(payload: &str) -> Cow<'_, str> {
    if !payload.contains(MULTIPART_BOUNDARY) {
        return Cow::Borrowed(payload);
    }

    for part in payload.split(MULTIPART_BOUNDARY) {
        if !part.contains(HTML_CONTENT_TYPE) {
            continue;
        }
        // ASCII lowercasing keeps byte offsets aligned.
        let Some(start) = part.to_ascii_lowercase().find(DOCTYPE_LOWER) else {
            continue;
        };
        let html = part[start..].trim();
        if part[..start].contains(QUOTED_PRINTABLE) {
            return Cow::Owned(decode_quoted_printable(html));
        }
        return Cow::Borrowed(html);
    }

    Cow::Borrowed(payload)
}

fn decode_quoted_printable(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'=' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        // Soft line break.
        if bytes[i + 1..].starts_with(b"\r\n") {
            i += 3;
            continue;
        }
        if bytes[i + 1..].starts_with(b"\n") {
            i += 2;
            continue;
        }
        let hex = bytes.get(i + 1..i + 3).and_then(|h| std::str::from_utf8(h).ok());
        match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
            Some(b) => {
                out.push(b);
                i += 3;
            }
            None => {
                out.push(b'=');
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOES: &str = r#"<!DOCTYPE html><html><body><div id="search">
<a class="result" href="/search?sca_esv=1&amp;tbm=lcl&amp;q=Joe%27s+Pizza&amp;rflfq=1&amp;ludocid=12345&amp;ved=0">
  <div role="heading"><span>Joe's Pizza</span></div>
  <div><span aria-label="Rated 4.5 out of 5">4.5</span><span>(2,345)</span> · $ · Pizza</div>
  <div>Pizza, slices · Open 24 hours</div>
  <img src="https://lh3.googleusercontent.com/p/joes=w80-h80" alt="">
</a>
<a href="https://www.example.com/about">About</a>
</div></body></html>"#;

    fn extractor(strategy: ExtractionStrategy) -> Extractor {
        Extractor::new(ExtractionConfig {
            strategy,
            ..ExtractionConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn search_anchor_yields_full_record() {
        let out = extractor(ExtractionStrategy::SearchAnchors).extract(JOES);
        assert!(out.dropped.is_empty(), "{:?}", out.dropped);
        assert_eq!(out.records.len(), 1);

        let r = &out.records[0];
        assert_eq!(r.name, "Joe's Pizza");
        assert_eq!(r.docid.as_deref(), Some("12345"));
        assert_eq!(r.rating, 4.5);
        assert_eq!(r.maps_url, "https://maps.google.com/?cid=12345");
        assert_eq!(r.image_url, "https://lh3.googleusercontent.com/p/joes=w80-h80");
        assert_eq!(r.price_level, "$");
        assert_eq!(r.description, "Pizza, slices, Open 24 hours");
        assert_eq!(r.cuisine, "Pizza");
        assert_eq!(r.address, "Address unavailable");
        assert!(r.is_valid());
    }

    #[test]
    fn page_without_matching_anchors_yields_nothing() {
        let html = r#"<html><body><a href="/maps">Maps</a><p>$$$</p></body></html>"#;
        let out = extractor(ExtractionStrategy::SearchAnchors).extract(html);
        assert!(out.records.is_empty());
        assert!(out.dropped.is_empty());
    }

    #[test]
    fn malformed_html_does_not_panic() {
        let out = extractor(ExtractionStrategy::SearchAnchors)
            .extract("<a href=\"/search?q=x&ludocid=1\"><div><img src=");
        assert!(out.records.is_empty());
        assert_eq!(out.dropped.len(), 1);
    }

    #[test]
    fn anchor_without_image_is_dropped() {
        let html = r#"<a href="/search?q=Taco+Spot&ludocid=77"><span aria-label="Rated 4.0 out of 5"></span>$$ · Tacos
            <img src="https://example.com/other.png"></a>"#;
        let out = extractor(ExtractionStrategy::SearchAnchors).extract(html);
        assert!(out.records.is_empty());
        assert_eq!(
            out.dropped,
            vec![DroppedCandidate {
                position: 0,
                reason: DropReason::MissingImage,
                name: Some("Taco Spot".to_string()),
            }]
        );
    }

    #[test]
    fn anchor_without_docid_or_name_is_dropped() {
        let html = r#"
            <a href="/search?q=No+Id"><img src="https://lh3.googleusercontent.com/a"></a>
            <a href="/search?tbm=lcl&ludocid=5"><img src="https://lh3.googleusercontent.com/b"></a>"#;
        let out = extractor(ExtractionStrategy::SearchAnchors).extract(html);
        let reasons: Vec<DropReason> = out.dropped.iter().map(|d| d.reason).collect();
        assert_eq!(reasons, vec![DropReason::MissingDocId, DropReason::MissingName]);
    }

    #[test]
    fn missing_rating_defaults_to_zero() {
        let html = r#"<a href="/search?q=Quiet+Cafe&ludocid=9">$ · Cafe
            <img src="https://lh3.googleusercontent.com/c"></a>"#;
        let out = extractor(ExtractionStrategy::SearchAnchors).extract(html);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].rating, 0.0);
        assert!(!out.records[0].is_valid());
    }

    #[test]
    fn aq_parameter_is_not_the_name() {
        let html = r#"<a href="/search?aq=wrong&q=Right+Name&ludocid=3">
            <img src="https://lh3.googleusercontent.com/r"></a>"#;
        let out = extractor(ExtractionStrategy::SearchAnchors).extract(html);
        assert_eq!(out.records[0].name, "Right Name");
    }

    #[test]
    fn name_decoding_handles_percent_plus() {
        let html = r#"<a href="/search?q=A%2BB+Grill%20%26+Bar&ludocid=4">
            <img src="https://lh3.googleusercontent.com/g"></a>"#;
        let out = extractor(ExtractionStrategy::SearchAnchors).extract(html);
        assert_eq!(out.records[0].name, "A+B Grill & Bar");
    }

    #[test]
    fn price_level_counts_dollar_signs() {
        assert_eq!(price_level("4.2 · $$$ · Steak"), "$$$");
        assert_eq!(price_level("no price"), "");
    }

    #[test]
    fn description_cleanup() {
        let ex = extractor(ExtractionStrategy::SearchAnchors);
        let block = "(1.2K)\n·\n$$\n·\nThai, noodles\n4.6\nThai\nBangkok Bites";
        assert_eq!(
            ex.clean_description(block, "Bangkok Bites"),
            "Thai, noodles"
        );
        assert_eq!(cuisine_of("Thai, noodles"), "Thai");
        assert_eq!(cuisine_of(""), "");
    }

    const CARDS: &str = r#"<div role="feed">
  <div role="article" aria-label="Lucali">
    <a href="https://www.google.com/maps/place/Lucali/data=!4m7!3m6!1s0x0:0x1!8m2!3d40.6818!4d-73.9999!16s"></a>
    <div class="fontHeadlineSmall">Lucali</div>
    <span role="img" aria-label="4.7 stars 2,000 Reviews"><span>4.7</span></span>
    <div><span>Pizza</span><span> · </span><span>$$</span></div>
    <img src="https://lh3.googleusercontent.com/p/lucali=w80">
  </div>
  <div role="article" aria-label="Ghost Kitchen">
    <img src="https://lh3.googleusercontent.com/p/ghost">
  </div>
</div>"#;

    #[test]
    fn place_cards_strategy() {
        let out = extractor(ExtractionStrategy::PlaceCards).extract(CARDS);
        assert_eq!(out.records.len(), 1);
        let r = &out.records[0];
        assert_eq!(r.name, "Lucali");
        assert_eq!(r.docid, None);
        assert_eq!(r.rating, 4.7);
        assert_eq!(r.lat, 40.6818);
        assert_eq!(r.lng, -73.9999);
        assert_eq!(r.price_level, "$$");
        assert_eq!(r.cuisine, "Pizza");
        assert_eq!(r.description, "Pizza");
        assert!(r.maps_url.starts_with("https://www.google.com/maps/place/Lucali"));

        assert_eq!(out.dropped.len(), 1);
        assert_eq!(out.dropped[0].reason, DropReason::MissingMapsUrl);
    }

    #[test]
    fn strategies_are_not_mixed() {
        assert!(extractor(ExtractionStrategy::PlaceCards)
            .extract(JOES)
            .records
            .is_empty());
        assert!(extractor(ExtractionStrategy::SearchAnchors)
            .extract(CARDS)
            .records
            .is_empty());
    }

    #[test]
    fn plain_html_is_not_unwrapped() {
        assert!(matches!(unwrap_saved_page("<html></html>"), Cow::Borrowed("<html></html>")));
    }

    #[test]
    fn mhtml_snapshot_is_unwrapped_and_decoded() {
        let mhtml = "From: <Saved by Blink>\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/related; boundary=\"----MultipartBoundary--abc----\"\r\n\
\r\n\
------MultipartBoundary--abc----\r\n\
Content-Type: text/html\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
<!DOCTYPE html><html><body><a href=3D\"/search?q=Caf=C3=A9+Luna&amp;ludocid=42\">=\r\n\
<img src=3D\"https://lh3.googleusercontent.com/luna\"></a></body></html>\r\n\
------MultipartBoundary--abc----\r\n\
Content-Type: text/css\r\n\
\r\n\
body {}\r\n";

        let page = unwrap_saved_page(mhtml);
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("href=\"/search?q=Caf"));
        assert!(!page.contains("text/css"));

        let out = extractor(ExtractionStrategy::SearchAnchors).extract(mhtml);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].name, "Café Luna");
        assert_eq!(out.records[0].docid.as_deref(), Some("42"));
    }

    #[test]
    fn quoted_printable_keeps_stray_equals() {
        assert_eq!(decode_quoted_printable("a=3Db=\nc=ZZ="), "a=bc=ZZ=");
    }
}
