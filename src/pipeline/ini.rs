//! Reading and rewriting the decoder's `moses.ini`.

use std::path::Path;

use anyhow::{bail, Context};

const FEATURE_SECTION: &str = "[feature]";

/// Returns `ini` with `ConstrainedDecoding path=<reference>` appended to the `[feature]`
/// section, i.e. before the blank line closing it (or at the end of the file).
pub fn inject_constraint(ini: &str, reference: &Path) -> String {
    let directive = format!("ConstrainedDecoding path={}", reference.display());
    let mut out = String::with_capacity(ini.len() + directive.len() + 1);
    let mut in_feature = false;
    let mut injected = false;
    for line in ini.lines() {
        let trimmed = line.trim();
        if trimmed == FEATURE_SECTION {
            in_feature = true;
        } else if in_feature && trimmed.is_empty() {
            out.push_str(&directive);
            out.push('\n');
            in_feature = false;
            injected = true;
        }
        out.push_str(line);
        out.push('\n');
    }
    if in_feature && !injected {
        out.push_str(&directive);
        out.push('\n');
    }
    out
}

/// Copies the run's filtered ini into the run directory, constrained when `reference` is set.
pub fn prepare_ini(source: &Path, target: &Path, reference: Option<&Path>) -> anyhow::Result<()> {
    match reference {
        None => {
            std::fs::copy(source, target).with_context(|| {
                format!("copy ini {} -> {}", source.display(), target.display())
            })?;
        }
        Some(reference) => {
            let text = std::fs::read_to_string(source)
                .with_context(|| format!("read ini: {}", source.display()))?;
            std::fs::write(target, inject_constraint(&text, reference))
                .with_context(|| format!("write ini: {}", target.display()))?;
        }
    }
    Ok(())
}

/// Column names for the score breakdown, in declaration order of the `[feature]` section.
///
/// A feature is named by its `name=` attribute, or by its type when unnamed, and occupies
/// `num-features=N` columns (default 1). A `num-features` value that is not a count is an
/// error.
pub fn feature_names(ini: &str) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut in_feature = false;
    for line in ini.lines() {
        let line = line.trim();
        if line == FEATURE_SECTION {
            in_feature = true;
            continue;
        }
        if !in_feature {
            continue;
        }
        if line.is_empty() || line.starts_with('[') {
            break;
        }
        if line.starts_with('#') {
            continue;
        }
        let mut toks = line.split_whitespace();
        let Some(kind) = toks.next() else {
            continue;
        };
        let mut name = kind.to_string();
        let mut count = 1usize;
        for tok in toks {
            if let Some(v) = tok.strip_prefix("name=") {
                name = v.to_string();
            } else if let Some(v) = tok.strip_prefix("num-features=") {
                count = match v.parse() {
                    Ok(n) => n,
                    Err(_) => bail!("malformed num-features={v} for feature {kind}"),
                };
            }
        }
        for _ in 0..count {
            names.push(name.clone());
        }
    }
    Ok(names)
}
