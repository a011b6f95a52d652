use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use regex::Regex;

use super::config::AnalysisOptions;
use super::rundir::RunDir;
use crate::config::RunConfig;

/// Exact line at the zero-based `index`, whitespace-trimmed.
///
/// Lines are split on raw bytes, so invalid UTF-8 elsewhere in the file is skipped over; the
/// selected line itself is decoded lossily.
pub fn read_line_at(path: &Path, index: usize) -> anyhow::Result<String> {
    let f = File::open(path).with_context(|| format!("open: {}", path.display()))?;
    let mut reader = BufReader::new(f);
    let mut buf = Vec::new();
    let mut count = 0usize;
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("read: {}", path.display()))?;
        if n == 0 {
            break;
        }
        if count == index {
            return Ok(String::from_utf8_lossy(&buf).trim().to_string());
        }
        count += 1;
    }
    Err(anyhow!(
        "sentence id {index} out of range: {} has {count} lines",
        path.display()
    ))
}

/// Source sentence plus the references prepared for scoring / constraining.
#[derive(Clone, Debug)]
pub struct ResolvedInput {
    pub input_file: PathBuf,
    pub sentence: String,
    /// Files the references were taken from.
    pub original_refs: Vec<PathBuf>,
    /// The reference text taken from each original file.
    pub reference_lines: Vec<String>,
    /// `tmp.ref<i>` files holding `k` copies of each reference line.
    pub prepared_refs: Vec<PathBuf>,
}

pub fn resolve_input(
    cfg: &RunConfig,
    opts: &AnalysisOptions,
    run: &RunDir,
) -> anyhow::Result<ResolvedInput> {
    let input_file = opts
        .input_file
        .clone()
        .unwrap_or_else(|| cfg.default_input_file());
    let sentence = read_line_at(&input_file, opts.sentence_id)?;

    let mut resolved = ResolvedInput {
        input_file,
        sentence,
        original_refs: Vec::new(),
        reference_lines: Vec::new(),
        prepared_refs: Vec::new(),
    };
    if !opts.needs_references() {
        return Ok(resolved);
    }

    let (original_refs, reference_lines) = match opts.ref_files.as_ref() {
        Some(files) => {
            let mut lines = Vec::with_capacity(files.len());
            for f in files {
                lines.push(read_first_line(f)?);
            }
            (files.clone(), lines)
        }
        None => {
            let files = discover_reference_files(&cfg.evaluation_dir(), &cfg.corpora_name)?;
            if files.is_empty() {
                return Err(anyhow!(
                    "no reference files for corpus {} in {}",
                    cfg.corpora_name,
                    cfg.evaluation_dir().display()
                ));
            }
            let mut lines = Vec::with_capacity(files.len());
            for f in &files {
                lines.push(read_line_at(f, opts.sentence_id)?);
            }
            (files, lines)
        }
    };

    let k = opts.candidates_per_sentence();
    for (i, line) in reference_lines.iter().enumerate() {
        let path = run.reference(i);
        write_repeated_line(&path, line, k)?;
        resolved.prepared_refs.push(path);
    }
    resolved.original_refs = original_refs;
    resolved.reference_lines = reference_lines;
    Ok(resolved)
}

/// Evaluation references named `<corpus>.reference.tok*.ref*`, sorted by file name.
pub fn discover_reference_files(eval_dir: &Path, corpus: &str) -> anyhow::Result<Vec<PathBuf>> {
    let pattern = Regex::new(&format!(r"^{}\.reference\.tok.*\.ref", regex::escape(corpus)))
        .context("reference file pattern")?;
    let entries = std::fs::read_dir(eval_dir)
        .with_context(|| format!("list evaluation dir: {}", eval_dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("list evaluation dir: {}", eval_dir.display()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if pattern.is_match(name) && entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// A caller-supplied reference file holds the reference for the selected sentence on its
/// first line; anything after it is ignored.
fn read_first_line(path: &Path) -> anyhow::Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read reference: {}", path.display()))?;
    if bytes.is_empty() {
        return Err(anyhow!("reference file is empty: {}", path.display()));
    }
    let first = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    Ok(String::from_utf8_lossy(first).trim().to_string())
}

fn write_repeated_line(path: &Path, line: &str, k: usize) -> anyhow::Result<()> {
    let mut body = String::with_capacity((line.len() + 1) * k);
    for _ in 0..k {
        body.push_str(line);
        body.push('\n');
    }
    std::fs::write(path, body).with_context(|| format!("write reference: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::config::AnalysisRequest;
    use chrono::Local;

    fn write(path: &Path, text: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, text).expect("write");
    }

    fn run_config(root: &Path) -> RunConfig {
        RunConfig {
            moses_working_dir: root.join("work"),
            corpora_name: "newstest".to_string(),
            run_number: "2".to_string(),
            moses_bin_dir: root.join("bin"),
            analysis_dir: root.join("analysis"),
        }
    }

    #[test]
    fn reads_trimmed_line_by_zero_based_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let p = dir.path().join("input");
        write(&p, "  first line \nsecond\tline\t\nthird\n");
        assert_eq!(read_line_at(&p, 0).expect("line 0"), "first line");
        assert_eq!(read_line_at(&p, 1).expect("line 1"), "second\tline");
        assert_eq!(read_line_at(&p, 2).expect("line 2"), "third");
        let err = read_line_at(&p, 3).expect_err("out of range");
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[test]
    fn discovers_only_matching_reference_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let eval = dir.path().join("evaluation");
        write(&eval.join("newstest.reference.tok.1.ref1"), "b\n");
        write(&eval.join("newstest.reference.tok.1.ref0"), "a\n");
        write(&eval.join("newstest.input.tc.1"), "x\n");
        write(&eval.join("other.reference.tok.1.ref0"), "y\n");
        let found = discover_reference_files(&eval, "newstest").expect("discover");
        assert_eq!(
            found,
            vec![
                eval.join("newstest.reference.tok.1.ref0"),
                eval.join("newstest.reference.tok.1.ref1"),
            ]
        );
    }

    #[test]
    fn default_references_are_picked_by_sentence_and_repeated_k_times() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = run_config(dir.path());
        let eval = cfg.evaluation_dir();
        write(&cfg.default_input_file(), "ein haus\ndas ist gut\n");
        write(&eval.join("newstest.reference.tok.2.ref0"), "a house\nthat is good\n");
        write(&eval.join("newstest.reference.tok.2.ref1"), "one house\nit is good\n");

        let opts = AnalysisOptions::validate(AnalysisRequest {
            kbest: Some(3),
            bleu: true,
            ..AnalysisRequest::new(1)
        })
        .expect("options");
        let run = RunDir::create(&cfg.analysis_dir, Local::now()).expect("run dir");
        let resolved = resolve_input(&cfg, &opts, &run).expect("resolve");

        assert_eq!(resolved.sentence, "das ist gut");
        assert_eq!(resolved.reference_lines, vec!["that is good", "it is good"]);
        assert_eq!(resolved.prepared_refs, vec![run.reference(0), run.reference(1)]);
        assert_eq!(
            std::fs::read_to_string(run.reference(0)).expect("ref0"),
            "that is good\nthat is good\nthat is good\n"
        );
    }

    #[test]
    fn skips_invalid_utf8_before_the_selected_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let p = dir.path().join("input");
        std::fs::write(&p, b"bad \xff\xfe line\n good line \n").expect("write");
        assert_eq!(read_line_at(&p, 1).expect("line 1"), "good line");
        assert!(read_line_at(&p, 0).expect("line 0").starts_with("bad "));
    }

    #[test]
    fn multi_line_explicit_reference_yields_one_line_per_candidate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = run_config(dir.path());
        let reference = dir.path().join("my.ref");
        write(&cfg.default_input_file(), "ein haus\n");
        write(&reference, "a house\nsecond line\nthird line\n");

        let opts = AnalysisOptions::validate(AnalysisRequest {
            kbest: Some(2),
            bleu: true,
            ref_files: Some(vec![reference]),
            ..AnalysisRequest::new(0)
        })
        .expect("options");
        let run = RunDir::create(&cfg.analysis_dir, Local::now()).expect("run dir");
        let resolved = resolve_input(&cfg, &opts, &run).expect("resolve");

        assert_eq!(resolved.reference_lines, vec!["a house"]);
        assert_eq!(
            std::fs::read_to_string(run.reference(0)).expect("ref0"),
            "a house\na house\n"
        );
    }

    #[test]
    fn empty_explicit_reference_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = run_config(dir.path());
        let reference = dir.path().join("empty.ref");
        write(&cfg.default_input_file(), "ein haus\n");
        write(&reference, "");
        let opts = AnalysisOptions::validate(AnalysisRequest {
            bleu: true,
            ref_files: Some(vec![reference]),
            ..AnalysisRequest::new(0)
        })
        .expect("options");
        let run = RunDir::create(&cfg.analysis_dir, Local::now()).expect("run dir");
        let err = resolve_input(&cfg, &opts, &run).expect_err("empty reference");
        assert!(format!("{err:#}").contains("reference file is empty"), "{err:#}");
    }

    #[test]
    fn explicit_reference_file_uses_its_first_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = run_config(dir.path());
        let input = dir.path().join("my.input");
        let reference = dir.path().join("my.ref");
        write(&input, "ein haus\n");
        write(&reference, "a small house\n");

        let opts = AnalysisOptions::validate(AnalysisRequest {
            force: true,
            input_file: Some(input.clone()),
            ref_files: Some(vec![reference.clone()]),
            ..AnalysisRequest::new(0)
        })
        .expect("options");
        let run = RunDir::create(&cfg.analysis_dir, Local::now()).expect("run dir");
        let resolved = resolve_input(&cfg, &opts, &run).expect("resolve");

        assert_eq!(resolved.input_file, input);
        assert_eq!(resolved.original_refs, vec![reference]);
        assert_eq!(
            std::fs::read_to_string(run.reference(0)).expect("ref0"),
            "a small house\n"
        );
    }

    #[test]
    fn no_references_prepared_without_bleu_or_force() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = run_config(dir.path());
        write(&cfg.default_input_file(), "ein haus\n");
        let opts = AnalysisOptions::validate(AnalysisRequest::new(0)).expect("options");
        let run = RunDir::create(&cfg.analysis_dir, Local::now()).expect("run dir");
        let resolved = resolve_input(&cfg, &opts, &run).expect("resolve");
        assert!(resolved.prepared_refs.is_empty());
        assert!(!run.reference(0).exists());
    }
}
