//! Parsers for the decoder's plain-text score output.
//!
//! Token grammar of a score breakdown, applied per whitespace-separated token:
//!
//! - `NUMBER := -?[0-9]+(\.[0-9]+)?([eE][-+]?[0-9]+)?` is a value;
//! - a token ending in `=` or `:` names the following values (separator stripped);
//! - `<name><NUMBER>`, name ending in a non-digit, is a name and a value glued together;
//! - anything else is a name as-is.
//!
//! Every value is labelled by the most recent name, so `TM0= -1 -2` gives two `TM0` columns.

use anyhow::anyhow;
use once_cell::sync::Lazy;
use regex::Regex;

const NUMBER: &str = r"-?[0-9]+(?:\.[0-9]+)?(?:[eE][-+]?[0-9]+)?";

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{NUMBER}$")).expect("number regex"));
static GLUED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(.*[^0-9.=:\-])({NUMBER})$")).expect("glued score regex")
});
static DECIMAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(NUMBER).expect("decimal regex"));
static TOTAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\[total=({NUMBER})\]")).expect("total regex"));

pub const BEST_TRANSLATION_MARKER: &str = "BEST TRANSLATION";
const KBEST_SEPARATOR: &str = "|||";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreEntry {
    pub name: Option<String>,
    pub value: String,
}

pub fn parse_breakdown(text: &str) -> Vec<ScoreEntry> {
    let mut entries = Vec::new();
    let mut current: Option<String> = None;
    for tok in text.split_whitespace() {
        if NUMBER_RE.is_match(tok) {
            entries.push(ScoreEntry {
                name: current.clone(),
                value: tok.to_string(),
            });
        } else if let Some(name) = tok.strip_suffix(['=', ':']) {
            current = Some(name.to_string());
        } else if let Some(caps) = GLUED_RE.captures(tok) {
            current = Some(caps[1].to_string());
            entries.push(ScoreEntry {
                name: current.clone(),
                value: caps[2].to_string(),
            });
        } else {
            current = Some(tok.to_string());
        }
    }
    entries
}

/// One line of a k-best list: `idx ||| sentence ||| breakdown ||| overall [||| ...]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KBestEntry {
    pub index: String,
    pub sentence: String,
    pub breakdown: Vec<ScoreEntry>,
    pub overall: String,
}

pub fn parse_kbest_line(line: &str) -> anyhow::Result<KBestEntry> {
    let fields: Vec<&str> = line.split(KBEST_SEPARATOR).map(str::trim).collect();
    if fields.len() < 4 {
        return Err(anyhow!(
            "k-best line has {} fields, expected at least 4: {line}",
            fields.len()
        ));
    }
    Ok(KBestEntry {
        index: fields[0].to_string(),
        sentence: fields[1].to_string(),
        breakdown: parse_breakdown(fields[2]),
        overall: fields[3].to_string(),
    })
}

pub fn parse_kbest(text: &str) -> anyhow::Result<Vec<KBestEntry>> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(parse_kbest_line)
        .collect()
}

/// The translation field of every k-best line, in rank order.
pub fn kbest_translations(text: &str) -> Vec<&str> {
    text.lines()
        .filter_map(|l| l.split(KBEST_SEPARATOR).nth(1))
        .map(str::trim)
        .collect()
}

/// Scores from the decoder's `BEST TRANSLATION` diagnostic line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BestTranslationScores {
    pub overall: Option<String>,
    pub breakdown: Vec<ScoreEntry>,
}

/// `None` when stderr holds no line starting with the marker.
///
/// The overall score is the `[total=X]` value; the breakdown is whatever follows it, e.g.
/// `<<0.000, -3.000, ...>>` or `LM0= -10.2 WordPenalty0= -3`. Without a total token the last
/// two tokens of the line are used: overall from the first, breakdown from the second.
pub fn parse_best_translation(stderr: &str) -> Option<BestTranslationScores> {
    let line = stderr
        .lines()
        .find(|l| l.trim_start().starts_with(BEST_TRANSLATION_MARKER))?;

    if let Some(caps) = TOTAL_RE.captures(line) {
        let whole = caps.get(0)?;
        let tail = &line[whole.end()..];
        return Some(BestTranslationScores {
            overall: Some(caps[1].to_string()),
            breakdown: parse_breakdown(&strip_brackets(tail)),
        });
    }

    let toks: Vec<&str> = line.split_whitespace().collect();
    let (overall_tok, breakdown_tok) = match toks.as_slice() {
        [.., a, b] => (*a, *b),
        _ => return Some(BestTranslationScores { overall: None, breakdown: Vec::new() }),
    };
    Some(BestTranslationScores {
        overall: DECIMAL_RE.find(overall_tok).map(|m| m.as_str().to_string()),
        breakdown: DECIMAL_RE
            .find_iter(breakdown_tok)
            .map(|m| ScoreEntry {
                name: None,
                value: m.as_str().to_string(),
            })
            .collect(),
    })
}

fn strip_brackets(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '<' | '>' | ',' | '(' | ')' | '[' | ']' => ' ',
            _ => c,
        })
        .collect()
}
