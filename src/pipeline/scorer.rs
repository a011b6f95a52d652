use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use anyhow::Context;

use super::rundir::RunDir;
use crate::config::RunConfig;
use crate::process::{ExternalCommand, StdinSource};
use crate::report::parse::kbest_translations;

/// Candidate file for the scorer: `ktrans` extracted from the k-best list, else `trans`.
pub fn prepare_candidates(run: &RunDir, kbest: bool) -> anyhow::Result<PathBuf> {
    if !kbest {
        return Ok(run.translation());
    }
    let kbest_path = run.kbest();
    let text = std::fs::read_to_string(&kbest_path)
        .with_context(|| format!("read k-best list: {}", kbest_path.display()))?;
    let mut body = String::new();
    for sentence in kbest_translations(&text) {
        body.push_str(sentence);
        body.push('\n');
    }
    let out = run.kbest_translations();
    std::fs::write(&out, body).with_context(|| format!("write: {}", out.display()))?;
    Ok(out)
}

pub fn build_scorer_command(cfg: &RunConfig, refs: &[PathBuf]) -> ExternalCommand {
    ExternalCommand::new(cfg.scorer_binary()).args(refs.iter().map(|p| p.as_os_str().to_owned()))
}

pub fn run_scorer(
    cmd: &ExternalCommand,
    candidates: &Path,
    run: &RunDir,
) -> anyhow::Result<ExitStatus> {
    cmd.run_captured(
        &StdinSource::File(candidates.to_path_buf()),
        &run.bleu(),
        &run.bleu_stderr(),
    )
}

/// One score per non-empty line of the scorer output, in candidate order.
pub fn read_scores(path: &Path) -> anyhow::Result<Vec<String>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read scores: {}", path.display()))?;
    Ok(parse_scores(&text))
}

fn parse_scores(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    #[test]
    fn ktrans_holds_one_sentence_per_kbest_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let run = RunDir::create(&dir.path().join("a"), Local::now()).expect("run");
        std::fs::write(
            run.kbest(),
            "0 ||| a house ||| LM0= -1.5 ||| -1.5\n0 ||| one house ||| LM0= -2 ||| -2\n",
        )
        .expect("write");
        let path = prepare_candidates(&run, true).expect("prepare");
        assert_eq!(path, run.kbest_translations());
        assert_eq!(
            std::fs::read_to_string(path).expect("read"),
            "a house\none house\n"
        );
        assert_eq!(prepare_candidates(&run, false).expect("single"), run.translation());
    }

    #[test]
    fn scores_skip_blank_lines() {
        assert_eq!(parse_scores("0.4523\n\n 0.12 \n"), vec!["0.4523", "0.12"]);
    }

    #[test]
    fn scorer_takes_references_as_arguments() {
        let cfg = RunConfig {
            moses_working_dir: PathBuf::from("/w"),
            corpora_name: "c".to_string(),
            run_number: "1".to_string(),
            moses_bin_dir: PathBuf::from("/bin/moses"),
            analysis_dir: PathBuf::from("/a"),
        };
        let cmd = build_scorer_command(&cfg, &[PathBuf::from("/r/tmp.ref0"), PathBuf::from("/r/tmp.ref1")]);
        assert_eq!(cmd.to_string(), "/bin/moses/sentence-bleu /r/tmp.ref0 /r/tmp.ref1");
    }
}
