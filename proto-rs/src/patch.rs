//! SEARCH/REPLACE patches over a single HTML document
//!
//! Follow-up generations answer with one or more blocks of the form
//!
//! ```text
//! <<<<<<< SEARCH
//! [exact existing content]
//! =======
//! [replacement content]
//! >>>>>>> REPLACE
//! ```
//!
//! Nothing in here fails: a block that does not match is skipped, and the
//! worst case is getting the input document back unchanged.

use regex::Regex;
use std::sync::OnceLock;

pub const SEARCH_MARKER: &str = "<<<<<<< SEARCH";
pub const SEPARATOR_MARKER: &str = "=======";
pub const REPLACE_MARKER: &str = ">>>>>>> REPLACE";

/// One SEARCH/REPLACE unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub search: String,
    pub replace: String,
}

impl Patch {
    pub fn new(search: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            replace: replace.into(),
        }
    }

    /// Render back into block syntax
    pub fn to_block(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}",
            SEARCH_MARKER, self.search, SEPARATOR_MARKER, self.replace, REPLACE_MARKER
        )
    }
}

/// Outcome of applying a list of patches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub document: String,
    pub applied: usize,
    pub skipped: usize,
}

impl PatchReport {
    pub fn total(&self) -> usize {
        self.applied + self.skipped
    }
}

/// How a response was merged into the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// At least one block matched
    Patched { applied: usize, skipped: usize },
    /// The response was a complete document and replaced the old one
    Replaced,
    /// Nothing usable; the old document is returned as-is
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub document: String,
    pub kind: MergeKind,
}

fn block_regex() -> &'static Regex {
    static BLOCK_REGEX: OnceLock<Regex> = OnceLock::new();
    BLOCK_REGEX.get_or_init(|| {
        // the search group is lazy-optional so an empty SEARCH section ends at
        // its own separator instead of running into the next block
        Regex::new(r"(?s)<{7} SEARCH[ \t]*\r?\n(?:(.*?)\r?\n)??={7}[ \t]*\r?\n(.*?)\r?\n?>{7} REPLACE")
            .expect("patch block regex")
    })
}

fn fenced_html_regex() -> &'static Regex {
    static FENCED_REGEX: OnceLock<Regex> = OnceLock::new();
    FENCED_REGEX.get_or_init(|| Regex::new(r"(?s)```html\s*(.*?)```").expect("fenced regex"))
}

fn doctype_regex() -> &'static Regex {
    static DOCTYPE_REGEX: OnceLock<Regex> = OnceLock::new();
    DOCTYPE_REGEX.get_or_init(|| {
        Regex::new(r"(?is)<!doctype\s+html[^>]*>.*</html>").expect("doctype regex")
    })
}

fn html_element_regex() -> &'static Regex {
    static HTML_REGEX: OnceLock<Regex> = OnceLock::new();
    HTML_REGEX.get_or_init(|| Regex::new(r"(?is)<html[\s>].*</html>").expect("html regex"))
}

/// Pull every SEARCH/REPLACE block out of raw model output, in order.
/// Both sides are trimmed.
pub fn parse_patches(raw: &str) -> Vec<Patch> {
    block_regex()
        .captures_iter(raw)
        .map(|caps| Patch {
            search: caps.get(1).map_or("", |m| m.as_str()).trim().to_string(),
            replace: caps[2].trim().to_string(),
        })
        .collect()
}

/// Apply patches in order, each to the first occurrence of its search text.
///
/// A patch whose search text is empty or absent from the document at that
/// point is skipped.
pub fn apply_patches(document: &str, patches: &[Patch]) -> PatchReport {
    let mut current = document.to_string();
    let mut applied = 0;
    let mut skipped = 0;

    for patch in patches {
        if !patch.search.is_empty() && current.contains(&patch.search) {
            current = current.replacen(&patch.search, &patch.replace, 1);
            applied += 1;
        } else {
            skipped += 1;
        }
    }

    PatchReport {
        document: current,
        applied,
        skipped,
    }
}

/// Whether text is a complete document rather than a fragment
pub fn is_full_document(text: &str) -> bool {
    let head = text.trim_start();
    ["<!doctype", "<html"].iter().any(|prefix| {
        head.get(..prefix.len())
            .is_some_and(|start| start.eq_ignore_ascii_case(prefix))
    })
}

/// Extract a complete document from arbitrary model prose.
///
/// Tries, in order: a fenced `html` code block, a doctype-to-`</html>`
/// span, an `<html>`-to-`</html>` span. Falls back to the trimmed input.
pub fn extract_html(raw: &str) -> String {
    if let Some(caps) = fenced_html_regex().captures(raw) {
        return caps[1].trim().to_string();
    }
    if let Some(m) = doctype_regex().find(raw) {
        return m.as_str().to_string();
    }
    if let Some(m) = html_element_regex().find(raw) {
        return m.as_str().to_string();
    }
    raw.trim().to_string()
}

/// Merge a follow-up response into `document`.
///
/// Patches are tried first. When there are none, or none of them change the
/// document, a response that is itself a full document replaces it.
pub fn apply_patch_response(document: &str, raw: &str) -> MergeOutcome {
    let patches = parse_patches(raw);
    let report = apply_patches(document, &patches);

    if !patches.is_empty() && report.document != document {
        return MergeOutcome {
            document: report.document,
            kind: MergeKind::Patched {
                applied: report.applied,
                skipped: report.skipped,
            },
        };
    }

    if is_full_document(raw) {
        return MergeOutcome {
            document: raw.to_string(),
            kind: MergeKind::Replaced,
        };
    }

    MergeOutcome {
        document: document.to_string(),
        kind: MergeKind::Unchanged,
    }
}

/// Decide how a finished response becomes the next document: follow-ups
/// are patched against `document`, first generations are extracted.
pub fn merge_response(document: &str, raw: &str, is_follow_up: bool) -> MergeOutcome {
    if is_follow_up {
        return apply_patch_response(document, raw);
    }
    let extracted = extract_html(raw);
    if extracted.is_empty() {
        return MergeOutcome {
            document: document.to_string(),
            kind: MergeKind::Unchanged,
        };
    }
    MergeOutcome {
        document: extracted,
        kind: MergeKind::Replaced,
    }
}
