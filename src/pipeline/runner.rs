use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use anyhow::{anyhow, Context};
use chrono::Local;

use super::config::{AnalysisOptions, OutputTarget};
use super::decoder::{build_decoder_command, run_decoder};
use super::ini::prepare_ini;
use super::input::resolve_input;
use super::rundir::RunDir;
use super::scorer::{build_scorer_command, prepare_candidates, read_scores, run_scorer};
use crate::config::RunConfig;
use crate::progress::ConsoleProgress;
use crate::report::html::HtmlTableOptions;
use crate::report::table::ReportTable;
use crate::report::{kbest_table, single_best_table, write_html, write_json, ReportMeta};

const STAGES: usize = 4;

pub struct AnalysisOutcome {
    pub run_dir: PathBuf,
    /// `None` when the report went to stdout.
    pub report: Option<PathBuf>,
    pub table: ReportTable,
}

/// Resolve input, decode, score, report: one sentence per run.
pub struct ErrAnalysis {
    cfg: RunConfig,
    opts: AnalysisOptions,
    progress: ConsoleProgress,
}

impl ErrAnalysis {
    pub fn new(cfg: RunConfig, opts: AnalysisOptions, progress: ConsoleProgress) -> Self {
        Self {
            cfg,
            opts,
            progress,
        }
    }

    pub fn run(&self) -> anyhow::Result<AnalysisOutcome> {
        for w in &self.opts.warnings {
            self.progress.warn(w);
        }
        let run = RunDir::create(&self.cfg.analysis_dir, Local::now())?;
        self.progress.info(format!("Run dir: {}", run.root().display()));

        self.progress.stage(1, STAGES, "resolve input");
        let input = resolve_input(&self.cfg, &self.opts, &run).context("resolve input")?;
        self.progress.info(format!(
            "Sentence {}: {}",
            self.opts.sentence_id, input.sentence
        ));

        self.progress.stage(2, STAGES, "decode");
        let constraint = if self.opts.force {
            let reference = input
                .prepared_refs
                .first()
                .ok_or_else(|| anyhow!("force decoding without a prepared reference"))?;
            Some(reference.as_path())
        } else {
            None
        };
        prepare_ini(&self.cfg.filtered_ini(), &run.ini(), constraint)?;
        let decoder = build_decoder_command(&self.cfg, &self.opts, &run);
        self.progress.info(format!("executing: {decoder}"));
        let status = run_decoder(&decoder, &input.sentence, &run)?;
        self.check_status("decoder", status, &run.decoder_stderr());

        let mut scorer_command = None;
        let bleu = if self.opts.bleu {
            self.progress.stage(3, STAGES, "score");
            let candidates = prepare_candidates(&run, self.opts.kbest.is_some())?;
            let scorer = build_scorer_command(&self.cfg, &input.prepared_refs);
            self.progress.info(format!(
                "executing: {scorer} < {}",
                candidates.display()
            ));
            let status = run_scorer(&scorer, &candidates, &run)?;
            self.check_status("scorer", status, &run.bleu_stderr());
            scorer_command = Some(format!("{scorer} < {}", candidates.display()));
            Some(read_scores(&run.bleu())?)
        } else {
            self.progress.stage(3, STAGES, "score (skipped)");
            None
        };

        self.progress.stage(4, STAGES, "report");
        let table = if self.opts.kbest.is_some() {
            kbest_table(&self.read_output(&run.kbest())?, bleu.as_deref())?
        } else {
            let ini = std::fs::read_to_string(run.ini())
                .with_context(|| format!("read ini: {}", run.ini().display()))?;
            single_best_table(
                &ini,
                &self.read_output(&run.decoder_stderr())?,
                &self.read_output(&run.translation())?,
                bleu.as_deref(),
            )?
        };
        if table.column(crate::report::OVERALL_SCORE).is_none() {
            self.progress
                .warn("decoder printed no BEST TRANSLATION line; scores omitted");
        }

        let meta = ReportMeta {
            datetime: run.started().format("%m/%d/%Y %H:%M:%S").to_string(),
            working_dir: self.cfg.moses_working_dir.display().to_string(),
            run_number: self.cfg.run_number.clone(),
            input_file: input.input_file.display().to_string(),
            reference_files: input
                .original_refs
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            sentence_id: self.opts.sentence_id,
            source_sentence: input.sentence.clone(),
            references: input.reference_lines.clone(),
            decoder_command: decoder.to_string(),
            scorer_command,
        };
        let html_opts = HtmlTableOptions {
            width_percent: self.opts.table_width,
            header: true,
            numbered: self.opts.kbest.is_some(),
        };
        let report = match &self.opts.output {
            OutputTarget::RunDir => Some(run.report_html()),
            OutputTarget::File(p) => Some(p.clone()),
            OutputTarget::Stdout => None,
        };
        write_html(report.as_deref(), &meta, &table, &html_opts)?;
        write_json(&run.report_json(), &meta, &table)?;
        match report.as_ref() {
            Some(p) => self.progress.info(format!("Wrote report: {}", p.display())),
            None => self.progress.info("Wrote report to stdout"),
        }

        Ok(AnalysisOutcome {
            run_dir: run.root().to_path_buf(),
            report,
            table,
        })
    }

    fn check_status(&self, what: &str, status: ExitStatus, stderr: &Path) {
        if !status.success() {
            self.progress.warn(format!(
                "{what} exited with {status}; see {}",
                stderr.display()
            ));
        }
    }

    /// Output files the external tools may not have written are read as empty.
    fn read_output(&self, path: &Path) -> anyhow::Result<String> {
        if !path.exists() {
            self.progress
                .warn(format!("missing output, treating as empty: {}", path.display()));
            return Ok(String::new());
        }
        std::fs::read_to_string(path).with_context(|| format!("read: {}", path.display()))
    }
}
