//! Template style selection for merged paragraphs
//!
//! Every paragraph copied from a content document gets a style chosen from
//! the template's catalog by a fixed priority chain:
//!
//! 1. bullet or numbered items keep a bullet-family style
//! 2. the static translation table, when its target exists
//! 3. numeric headings such as `2.1 Overview`
//! 4. the procedure style for any other non-empty paragraph
//! 5. the body style, else the source name unchanged
//!
//! A bullet item never falls through to tiers 2-5.

use docweave_ast::Paragraph;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::styles::StyleCatalog;

/// Procedure style plain narrative paragraphs default to
pub const STEP_STYLE: &str = "Step 1";

/// Template body style
pub const BODY_STYLE: &str = "Body Text1";

/// Style assumed for paragraphs that declare none
pub const DEFAULT_SOURCE_STYLE: &str = "Normal";

/// Bullet styles tried after the translated name, in order
const BULLET_FALLBACKS: &[&str] = &["Bullet Point 1", "List Bullet", "List Paragraph"];

/// Source style names that mark bullet items
const BULLET_SOURCE_STYLES: &[&str] = &["List Bullet", "List Bullet 2", "Bullet Point 1", "Bullet Point 2"];

/// Source style name -> template style name
const STYLE_TRANSLATIONS: &[(&str, &str)] = &[
    ("Heading 1", "Heading 1"),
    ("Heading 2", "Heading 2"),
    ("Heading 3", "Heading 3"),
    ("Heading 4", "Heading 4"),
    ("List Bullet", "Bullet Point 1"),
    ("List Bullet 2", "Bullet Point 2"),
    ("Bullet Point 1", "Bullet Point 1"),
    ("Bullet Point 2", "Bullet Point 2"),
    ("List Number", "List Number1"),
    ("List Number 2", "List Number1"),
    ("Note", "Note"),
    ("Note_1", "Note_1"),
    ("Normal", "Body Text1"),
    ("Body Text", "Body Text1"),
    ("Default", "Body Text1"),
];

static NUMERIC_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)*\.?$").expect("valid numeric heading pattern"));

/// Which rule of the chain produced a style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Bullet,
    Translation,
    NumericHeading,
    Procedure,
    Fallback,
}

/// A resolved style name together with the rule that chose it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub style: String,
    pub tier: Tier,
}

/// Picks template styles for source paragraphs
#[derive(Debug, Clone, Copy)]
pub struct StyleResolver<'c> {
    catalog: &'c StyleCatalog,
}

impl<'c> StyleResolver<'c> {
    pub fn new(catalog: &'c StyleCatalog) -> Self {
        Self { catalog }
    }

    /// Style name for a paragraph of the content document
    pub fn resolve(&self, para: &Paragraph) -> String {
        self.resolve_with_tier(para.style.as_deref(), para.list_level, &para.text())
            .style
    }

    /// Style name and deciding rule for a declared style, list level and text
    pub fn resolve_with_tier(
        &self,
        source_style: Option<&str>,
        list_level: Option<u32>,
        text: &str,
    ) -> Resolution {
        let source = source_style
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SOURCE_STYLE);
        let text = text.trim();
        let translated = translate(source);

        if is_bullet_style(source) || list_level.is_some() {
            // Only bullet names translate within the bullet tier
            let style = translated
                .filter(|_| is_bullet_style(source))
                .into_iter()
                .chain(BULLET_FALLBACKS.iter().copied())
                .find(|name| self.catalog.contains(name))
                .unwrap_or(source);
            return Resolution {
                style: style.to_string(),
                tier: Tier::Bullet,
            };
        }

        if let Some(target) = translated.filter(|t| self.catalog.contains(t)) {
            return Resolution {
                style: target.to_string(),
                tier: Tier::Translation,
            };
        }

        if let Some(level) = numeric_heading_level(text) {
            let heading = format!("Heading {}", level);
            if self.catalog.contains(&heading) {
                log::debug!("numbered text {:?} styled as {}", text, heading);
                return Resolution {
                    style: heading,
                    tier: Tier::NumericHeading,
                };
            }
        }

        if !text.is_empty() && self.catalog.contains(STEP_STYLE) {
            return Resolution {
                style: STEP_STYLE.to_string(),
                tier: Tier::Procedure,
            };
        }

        let style = if self.catalog.contains(BODY_STYLE) {
            BODY_STYLE
        } else {
            log::debug!("no template style for {:?}, keeping it", source);
            source
        };
        Resolution {
            style: style.to_string(),
            tier: Tier::Fallback,
        }
    }
}

/// Translation-table entry for a source style name
pub fn translate(source: &str) -> Option<&'static str> {
    STYLE_TRANSLATIONS
        .iter()
        .find(|(from, _)| from.eq_ignore_ascii_case(source))
        .map(|(_, to)| *to)
}

/// Whether a source style name marks a bullet item
pub fn is_bullet_style(source: &str) -> bool {
    BULLET_SOURCE_STYLES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(source))
}

/// Heading depth implied by a leading section number.
///
/// The dot count of the first token decides: `2` is 1, `2.` and `2.1` are
/// 2, `2.1.3` and deeper are 3. Ordinary prose that starts with such a
/// token ("2.5 liters of water") is classified as a heading too.
pub fn numeric_heading_level(text: &str) -> Option<u8> {
    let first = text.split_whitespace().next()?;
    if !NUMERIC_HEADING.is_match(first) {
        return None;
    }
    Some(match first.matches('.').count() {
        0 => 1,
        1 => 2,
        _ => 3,
    })
}
