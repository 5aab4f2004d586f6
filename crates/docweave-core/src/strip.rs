//! Removal of text that must never reach the output
//!
//! Front matter at the top of the file, hidden `--- text ---` sections
//! closed by a `<!-- Key Activities -->` marker, and every comment.

use once_cell::sync::Lazy;
use regex::Regex;

static FRONT_MATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*---\s*\n.*?\n---\s*\n").expect("valid front matter pattern"));

static HIDDEN_SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?mis)^[ \t]*---[ \t]*text[ \t]*---[ \t\r\n]*.*?<!--\s*#*\s*Key\s+Activities\s*-->[ \t\r\n]*",
    )
    .expect("valid hidden section pattern")
});

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern"));

/// Strip front matter, hidden sections and comments.
///
/// The passes repeat until nothing changes, so removing one construct can
/// never expose another and `strip_hidden(strip_hidden(x)) == strip_hidden(x)`.
pub fn strip_hidden(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn strip_once(text: &str) -> String {
    let without_front_matter = FRONT_MATTER.replace(text, "");
    let without_hidden = HIDDEN_SECTION.replace_all(&without_front_matter, "");
    let without_comments = COMMENT.replace_all(&without_hidden, "");

    let removed = text.len() - without_comments.len();
    if removed > 0 {
        log::debug!("stripped {} bytes of hidden text", removed);
    }

    without_comments
        .trim_start_matches(['\n', '\r', ' '])
        .trim_end()
        .to_string()
}
