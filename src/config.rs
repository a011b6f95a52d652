use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::de::value::MapDeserializer;
use serde::Deserialize;

pub const DEFAULT_CONFIG_NAME: &str = ".cfg";
pub const CONFIG_ENV: &str = "ERRANALYSIS_CONFIG";

/// Where a finished evaluation run lives, read from the `.cfg` file.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RunConfig {
    pub moses_working_dir: PathBuf,
    pub corpora_name: String,
    pub run_number: String,
    pub moses_bin_dir: PathBuf,
    pub analysis_dir: PathBuf,
}

impl RunConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parse config: {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let map = parse_key_values(text)?;
        let de = MapDeserializer::<_, serde::de::value::Error>::new(map.into_iter());
        let cfg = RunConfig::deserialize(de).map_err(|e| anyhow!("{e}"))?;
        for (key, value) in [
            ("corpora-name", cfg.corpora_name.as_str()),
            ("run-number", cfg.run_number.as_str()),
        ] {
            if value.is_empty() {
                return Err(anyhow!("config key {key} is empty"));
            }
        }
        Ok(cfg)
    }

    pub fn evaluation_dir(&self) -> PathBuf {
        self.moses_working_dir.join("evaluation")
    }

    pub fn default_input_file(&self) -> PathBuf {
        self.evaluation_dir().join(format!(
            "{}.input.tc.{}",
            self.corpora_name, self.run_number
        ))
    }

    pub fn filtered_ini(&self) -> PathBuf {
        self.evaluation_dir().join(format!(
            "{}.filtered.ini.{}",
            self.corpora_name, self.run_number
        ))
    }

    pub fn decoder_binary(&self) -> PathBuf {
        self.moses_bin_dir.join("moses_chart")
    }

    pub fn scorer_binary(&self) -> PathBuf {
        self.moses_bin_dir.join("sentence-bleu")
    }
}

/// `key = value` lines; `#` comments and blank lines are skipped, later keys win.
fn parse_key_values(text: &str) -> anyhow::Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| anyhow!("line {}: expected `key = value`", lineno + 1))?;
        map.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(map)
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

/// `--config`, then `$ERRANALYSIS_CONFIG`, then `.cfg` upwards from the working directory.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p);
    }
    if let Some(p) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(p));
    }
    let cwd = std::env::current_dir().context("current dir")?;
    find_file_upwards(&cwd, DEFAULT_CONFIG_NAME, 8).ok_or_else(|| {
        anyhow!(
            "no {} found from {} upwards (use --config or set {})",
            DEFAULT_CONFIG_NAME,
            cwd.display(),
            CONFIG_ENV
        )
    })
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(DEFAULT_CONFIG_NAME);
    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TEXT)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG_TEXT: &str = r#"# Experiment directory (the one holding evaluation/)
moses-working-dir = /path/to/working-dir

# Evaluation set name, e.g. newstest2012
corpora-name = newstest

# Run whose evaluation files and filtered ini are analysed
run-number = 1

# Directory containing moses_chart and sentence-bleu
moses-bin-dir = /path/to/mosesdecoder/bin

# Each analysis creates a timestamped directory in here
analysis-dir = /path/to/analysis
"#;
