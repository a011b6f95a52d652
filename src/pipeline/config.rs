use std::path::PathBuf;

use anyhow::{bail, Context};

pub const DEFAULT_TABLE_WIDTH: u8 = 100;

/// Raw analysis choices as given on the command line, before validation.
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    pub sentence_id: usize,
    pub kbest: Option<usize>,
    pub distinct: bool,
    pub input_file: Option<PathBuf>,
    pub output_file: Option<String>,
    pub ref_files: Option<Vec<PathBuf>>,
    pub bleu: bool,
    pub force: bool,
    pub decoder_settings: Option<String>,
    pub trace: bool,
    pub table_width: u8,
}

impl AnalysisRequest {
    pub fn new(sentence_id: usize) -> Self {
        Self {
            sentence_id,
            kbest: None,
            distinct: false,
            input_file: None,
            output_file: None,
            ref_files: None,
            bleu: false,
            force: false,
            decoder_settings: None,
            trace: false,
            table_width: DEFAULT_TABLE_WIDTH,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KBest {
    pub size: usize,
    pub distinct: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputTarget {
    /// `report.html` inside the run directory.
    RunDir,
    Stdout,
    File(PathBuf),
}

/// Validated analysis options. Only obtainable through [`AnalysisOptions::validate`].
#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    pub sentence_id: usize,
    pub kbest: Option<KBest>,
    pub input_file: Option<PathBuf>,
    pub ref_files: Option<Vec<PathBuf>>,
    pub bleu: bool,
    pub force: bool,
    /// `--decodersettings` split into arguments with shell quoting rules.
    pub decoder_args: Vec<String>,
    pub trace: bool,
    pub output: OutputTarget,
    pub table_width: u8,
    pub warnings: Vec<String>,
}

impl AnalysisOptions {
    pub fn validate(req: AnalysisRequest) -> anyhow::Result<Self> {
        let ref_files = req.ref_files.filter(|v| !v.is_empty());

        if req.kbest.is_some() && req.force {
            bail!("cannot generate a k-best list and do force decoding at the same time");
        }
        if req.force {
            match ref_files.as_deref() {
                None => bail!("cannot do force decoding without specifying --refFile"),
                Some([_]) => {}
                Some(_) => bail!("cannot do force decoding with more than one --refFile"),
            }
        }
        if req.kbest == Some(0) {
            bail!("--kbest must be at least 1");
        }
        if req.table_width == 0 || req.table_width > 100 {
            bail!("--width must be within 1..=100, got {}", req.table_width);
        }

        let mut warnings = Vec::new();
        if req.distinct && req.kbest.is_none() {
            warnings.push("--distinct has no effect without --kbest".to_string());
        }

        let output = match req.output_file.as_deref().map(str::trim) {
            None | Some("") => OutputTarget::RunDir,
            Some("-") => OutputTarget::Stdout,
            Some(p) => OutputTarget::File(PathBuf::from(p)),
        };
        let decoder_args = match req.decoder_settings.as_deref() {
            Some(settings) => shell_words::split(settings)
                .with_context(|| format!("invalid --decodersettings: {settings}"))?,
            None => Vec::new(),
        };

        Ok(Self {
            sentence_id: req.sentence_id,
            kbest: req.kbest.map(|size| KBest {
                size,
                distinct: req.distinct,
            }),
            input_file: req.input_file,
            ref_files,
            bleu: req.bleu,
            force: req.force,
            decoder_args,
            trace: req.trace,
            output,
            table_width: req.table_width,
            warnings,
        })
    }

    /// Copies of each reference line the scorer needs: one per candidate.
    pub fn candidates_per_sentence(&self) -> usize {
        self.kbest.map(|k| k.size).unwrap_or(1)
    }

    pub fn needs_references(&self) -> bool {
        self.bleu || self.force
    }
}
