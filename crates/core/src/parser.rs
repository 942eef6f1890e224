//! Extracts structured fields from free-form model output.
//!
//! Models, small local ones especially, follow output format instructions
//! loosely. Everything here is pure and tolerant: the reply parser never
//! fails, and the analysis parser only fails when no conversation starter
//! can be found at all.

use std::sync::LazyLock;

use regex::Regex;

use crate::analysis::AnalysisResult;
use crate::error::ParseFailure;

/// Summary used when the model output has no `SUMMARY:` line.
pub const SUMMARY_FALLBACK: &str = "Unable to generate summary.";

const RESPONSE_MARKER: &str = "RESPONSE:";
const REASONING_END: &str = "</think>";

// Markdown bold around the label (`**SUMMARY:**`) is tolerated.
static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"SUMMARY:(?:\*\*)?(.*)").expect("valid regex")
});
static STARTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"STARTER \d+:(?:\*\*)?(.*)").expect("valid regex")
});

/// Parses the output of the analysis template.
///
/// The summary is the rest of the first `SUMMARY:` line, or
/// [`SUMMARY_FALLBACK`]. Starters are the rest of every `STARTER <n>:`
/// line in order of appearance. Output without any starter is a
/// [`ParseFailure`], even if a summary was found.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, ParseFailure> {
    let summary = text
        .lines()
        .find_map(|line| SUMMARY_RE.captures(line))
        .map(|caps| clean_field(&caps[1]))
        .filter(|summary| !summary.is_empty())
        .unwrap_or_else(|| SUMMARY_FALLBACK.to_owned());

    let starters = text
        .lines()
        .filter_map(|line| STARTER_RE.captures(line))
        .map(|caps| clean_field(&caps[1]))
        .filter(|starter| !starter.is_empty())
        .collect::<Vec<_>>();
    if starters.is_empty() {
        return Err(ParseFailure);
    }

    Ok(AnalysisResult { summary, starters })
}

/// Extracts the user-facing reply from the output of the conversation
/// template.
///
/// In order of preference:
///
/// 1. the payload of the last `RESPONSE:` marker that has one;
/// 2. everything after the last `</think>`;
/// 3. the last non-empty line.
///
/// Markers without any payload are ignored, and only the text before the
/// first of them is considered by the fallbacks. All results are trimmed.
/// If nothing matches, the whole trimmed text is returned, so this never
/// fails.
pub fn parse_reply(text: &str) -> String {
    let mut sections = text.split(RESPONSE_MARKER);
    let head = sections.next().unwrap_or_default();
    let payloads = sections.collect::<Vec<_>>();
    if let Some(payload) = payloads
        .into_iter()
        .rev()
        .map(str::trim)
        .find(|payload| !payload.is_empty())
    {
        return payload.to_owned();
    }
    let text = head;

    if let Some((_, rest)) = text.rsplit_once(REASONING_END) {
        let rest = rest.trim();
        return if rest.is_empty() {
            text.trim().to_owned()
        } else {
            rest.to_owned()
        };
    }

    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_owned()
}

#[inline]
fn clean_field(field: &str) -> String {
    field.trim().trim_end_matches("**").trim().to_owned()
}
