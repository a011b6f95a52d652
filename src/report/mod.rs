pub mod html;
pub mod parse;
pub mod table;

use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context};
use serde::Serialize;

use self::html::{render_document, HtmlTableOptions};
use self::parse::{parse_best_translation, parse_kbest, ScoreEntry};
use self::table::ReportTable;
use crate::pipeline::ini::feature_names;

pub const OUTPUT_SENTENCE: &str = "output sentence";
pub const OVERALL_SCORE: &str = "overall score";
pub const BLEU: &str = "bleu";
const MISSING_SCORE: &str = "n/a";

/// Run metadata shown above the results table.
#[derive(Clone, Debug, Serialize)]
pub struct ReportMeta {
    pub datetime: String,
    pub working_dir: String,
    pub run_number: String,
    pub input_file: String,
    pub reference_files: Vec<String>,
    pub sentence_id: usize,
    pub source_sentence: String,
    pub references: Vec<String>,
    pub decoder_command: String,
    pub scorer_command: Option<String>,
}

/// One row per k-best candidate, in rank order.
pub fn kbest_table(kbest: &str, bleu: Option<&[String]>) -> anyhow::Result<ReportTable> {
    let entries = parse_kbest(kbest)?;
    let features: Vec<String> = entries
        .first()
        .map(|e| column_names(&e.breakdown))
        .unwrap_or_default();

    let mut header = Vec::with_capacity(features.len() + 3);
    header.push(OUTPUT_SENTENCE.to_string());
    header.extend(features.iter().cloned());
    header.push(OVERALL_SCORE.to_string());
    if bleu.is_some() {
        header.push(BLEU.to_string());
    }
    let mut table = ReportTable::new(header);

    for (rank, entry) in entries.iter().enumerate() {
        if entry.breakdown.len() != features.len() {
            return Err(anyhow!(
                "k-best candidate {rank} has {} feature scores, the first has {}",
                entry.breakdown.len(),
                features.len()
            ));
        }
        let mut row = Vec::with_capacity(table.header().len());
        row.push(entry.sentence.clone());
        row.extend(entry.breakdown.iter().map(|s| s.value.clone()));
        row.push(entry.overall.clone());
        if let Some(scores) = bleu {
            row.push(bleu_cell(scores, rank));
        }
        table.push_row(row)?;
    }
    Ok(table)
}

/// Header and a single value row for a one-best decode.
///
/// Breakdown and overall score are left out when the decoder never printed its
/// `BEST TRANSLATION` line.
pub fn single_best_table(
    ini: &str,
    decoder_stderr: &str,
    translation: &str,
    bleu: Option<&[String]>,
) -> anyhow::Result<ReportTable> {
    let sentence = translation.lines().next().unwrap_or("").trim().to_string();

    let mut header = vec![OUTPUT_SENTENCE.to_string()];
    let mut row = vec![sentence];
    if let Some(scores) = parse_best_translation(decoder_stderr) {
        let labelled = !scores.breakdown.is_empty()
            && scores.breakdown.iter().all(|s| s.name.is_some());
        let names = if labelled {
            column_names(&scores.breakdown)
        } else {
            fit_names(feature_names(ini)?, scores.breakdown.len())
        };
        header.extend(names);
        row.extend(scores.breakdown.into_iter().map(|s| s.value));
        if let Some(overall) = scores.overall {
            header.push(OVERALL_SCORE.to_string());
            row.push(overall);
        }
    }
    if let Some(scores) = bleu {
        header.push(BLEU.to_string());
        row.push(bleu_cell(scores, 0));
    }

    let mut table = ReportTable::new(header);
    table.push_row(row)?;
    Ok(table)
}

fn column_names(entries: &[ScoreEntry]) -> Vec<String> {
    entries
        .iter()
        .enumerate()
        .map(|(i, s)| s.name.clone().unwrap_or_else(|| format!("feature{i}")))
        .collect()
}

/// Exactly `len` names: `names` truncated, or padded with `feature<i>`.
fn fit_names(mut names: Vec<String>, len: usize) -> Vec<String> {
    names.truncate(len);
    for i in names.len()..len {
        names.push(format!("feature{i}"));
    }
    names
}

fn bleu_cell(scores: &[String], i: usize) -> String {
    scores
        .get(i)
        .cloned()
        .unwrap_or_else(|| MISSING_SCORE.to_string())
}

/// Writes the HTML document to `path`, or to stdout when `path` is `None`.
pub fn write_html(
    path: Option<&Path>,
    meta: &ReportMeta,
    table: &ReportTable,
    opts: &HtmlTableOptions,
) -> anyhow::Result<()> {
    let html = render_document(meta, table, opts);
    match path {
        Some(p) => {
            if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create report dir: {}", parent.display()))?;
            }
            std::fs::write(p, html).with_context(|| format!("write report: {}", p.display()))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(html.as_bytes()).context("write report to stdout")?;
            stdout.flush().context("flush stdout")
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    meta: &'a ReportMeta,
    table: &'a ReportTable,
}

pub fn write_json(path: &Path, meta: &ReportMeta, table: &ReportTable) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(&JsonReport { meta, table })
        .context("serialize report json")?;
    std::fs::write(path, body).with_context(|| format!("write report json: {}", path.display()))
}
