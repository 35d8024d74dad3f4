// ABOUTME: Body text selection: finds a site's article container and applies the policy.
// ABOUTME: Units are <p> elements, or <br>-separated segments for forum layouts.

use once_cell::sync::Lazy;
use rand::Rng;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::ExtractError;
use crate::normalize::clean;
use crate::options::ExtractionPolicy;
use crate::sites::SiteProfile;

static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Text of elements that never render as article text.
fn is_hidden_parent(node: Option<&Node>) -> bool {
    node.and_then(Node::as_element)
        .map_or(false, |el| matches!(el.name(), "script" | "style"))
}

/// Text of one unit: text nodes trimmed, empties dropped, joined with single spaces.
pub fn unit_text(el: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in el.descendants() {
        if let Node::Text(text) = node.value() {
            if is_hidden_parent(node.parent().map(|p| p.value())) {
                continue;
            }
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
    }
    parts.join(" ")
}

/// Splits the container's text at `<br>` elements.
///
/// Returns `None` if the container has no `<br>` at all.
fn break_units(container: ElementRef<'_>) -> Option<Vec<String>> {
    let mut units = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut saw_break = false;

    for node in container.descendants() {
        match node.value() {
            Node::Text(text) => {
                if is_hidden_parent(node.parent().map(|p| p.value())) {
                    continue;
                }
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    current.push(trimmed);
                }
            }
            Node::Element(el) if el.name() == "br" => {
                saw_break = true;
                if !current.is_empty() {
                    units.push(current.join(" "));
                    current.clear();
                }
            }
            _ => {}
        }
    }
    if !current.is_empty() {
        units.push(current.join(" "));
    }

    saw_break.then_some(units)
}

/// Collects the non-empty text units of a site's article body.
pub fn collect_units(doc: &Html, site: &SiteProfile) -> Result<Vec<String>, ExtractError> {
    let selector = Selector::parse(&site.body_selector).map_err(|e| {
        ExtractError::config(
            "SelectBody",
            Some(anyhow::anyhow!(
                "invalid body selector {:?} for {}: {}",
                site.body_selector,
                site.id,
                e
            )),
        )
    })?;

    let container = doc.select(&selector).next().ok_or_else(|| {
        ExtractError::no_content(
            "",
            "SelectBody",
            Some(anyhow::anyhow!("no element matches {:?}", site.body_selector)),
        )
    })?;

    let units = if site.breaks_as_paragraphs {
        break_units(container).unwrap_or_default()
    } else {
        container
            .select(&PARAGRAPH_SELECTOR)
            .map(unit_text)
            .filter(|t| !t.is_empty())
            .collect()
    };

    if units.is_empty() {
        return Err(ExtractError::no_content(
            "",
            "SelectBody",
            Some(anyhow::anyhow!(
                "{:?} matched but holds no text units",
                site.body_selector
            )),
        ));
    }
    Ok(units)
}

/// Start offset of a contiguous window of `count` units, uniform over the valid offsets.
pub fn random_window_start<R: Rng + ?Sized>(len: usize, count: usize, rng: &mut R) -> usize {
    rng.gen_range(0..=len.saturating_sub(count))
}

/// Applies the policy to the units and cleans the result.
///
/// For word limits the units are cleaned before counting, so the cleaned
/// output never holds more than `n` words.
pub fn apply_policy<R: Rng + ?Sized>(
    units: &[String],
    policy: &ExtractionPolicy,
    rng: &mut R,
) -> String {
    match *policy {
        ExtractionPolicy::All => clean(&units.join("\n")),
        ExtractionPolicy::WordLimit(n) => {
            let body = clean(&units.join("\n"));
            let words: Vec<&str> = body.split_whitespace().take(n).collect();
            clean(&words.join(" "))
        }
        ExtractionPolicy::ParagraphCount {
            count,
            random: false,
        } => clean(&units[..count.min(units.len())].join("\n")),
        ExtractionPolicy::ParagraphCount {
            count,
            random: true,
        } => {
            let start = random_window_start(units.len(), count, rng);
            let end = (start + count).min(units.len());
            clean(&units[start..end].join("\n"))
        }
    }
}

/// Extracts the body text of `doc` for `site` under `policy`.
pub fn select_body<R: Rng + ?Sized>(
    doc: &Html,
    site: &SiteProfile,
    policy: &ExtractionPolicy,
    rng: &mut R,
) -> Result<String, ExtractError> {
    let units = collect_units(doc, site)?;
    tracing::debug!(site = %site.id, units = units.len(), %policy, "selecting body");
    Ok(apply_policy(&units, policy, rng))
}
