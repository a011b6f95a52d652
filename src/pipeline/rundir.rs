use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use chrono::{DateTime, Local};

/// Timestamped directory holding every artifact of one analysis.
#[derive(Clone, Debug)]
pub struct RunDir {
    root: PathBuf,
    started: DateTime<Local>,
}

impl RunDir {
    /// Creates `<analysis_dir>/<ss-mm-hh_YYYY-mm-dd>/`. An existing directory is an error.
    pub fn create(analysis_dir: &Path, started: DateTime<Local>) -> anyhow::Result<Self> {
        std::fs::create_dir_all(analysis_dir)
            .with_context(|| format!("create analysis dir: {}", analysis_dir.display()))?;
        let root = analysis_dir.join(started.format("%S-%M-%H_%Y-%m-%d").to_string());
        if root.exists() {
            return Err(anyhow!("run directory already exists: {}", root.display()));
        }
        std::fs::create_dir(&root)
            .with_context(|| format!("create run dir: {}", root.display()))?;
        Ok(Self { root, started })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn started(&self) -> DateTime<Local> {
        self.started
    }

    pub fn ini(&self) -> PathBuf {
        self.root.join("moses.ini")
    }

    pub fn reference(&self, i: usize) -> PathBuf {
        self.root.join(format!("tmp.ref{i}"))
    }

    pub fn translation(&self) -> PathBuf {
        self.root.join("trans")
    }

    pub fn kbest(&self) -> PathBuf {
        self.root.join("kbest")
    }

    pub fn trace(&self) -> PathBuf {
        self.root.join("trace")
    }

    pub fn decoder_stderr(&self) -> PathBuf {
        self.root.join("decode.STDERR")
    }

    pub fn kbest_translations(&self) -> PathBuf {
        self.root.join("ktrans")
    }

    pub fn bleu(&self) -> PathBuf {
        self.root.join("bleu")
    }

    pub fn bleu_stderr(&self) -> PathBuf {
        self.root.join("bleu.STDERR")
    }

    pub fn report_html(&self) -> PathBuf {
        self.root.join("report.html")
    }

    pub fn report_json(&self) -> PathBuf {
        self.root.join("report.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn creates_timestamped_dir_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let analysis = dir.path().join("analysis");
        let t = Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .expect("time");
        let run = RunDir::create(&analysis, t).expect("create");
        assert_eq!(run.root(), analysis.join("07-05-14_2024-03-09"));
        assert!(run.root().is_dir());
        assert_eq!(run.reference(2), run.root().join("tmp.ref2"));

        let err = RunDir::create(&analysis, t).expect_err("second run in the same second");
        assert!(err.to_string().contains("already exists"), "{err}");
    }
}
