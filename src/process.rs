use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use anyhow::Context;

/// What the child reads on standard input.
#[derive(Clone, Debug)]
pub enum StdinSource {
    Text(String),
    File(PathBuf),
}

/// An external program invocation as an argument list (never a shell string).
#[derive(Clone, Debug)]
pub struct ExternalCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Runs to completion with stdout/stderr redirected into the given files.
    ///
    /// Only a failure to start (or to feed stdin) is an error; the exit status is returned
    /// for the caller to judge.
    pub fn run_captured(
        &self,
        stdin: &StdinSource,
        stdout_path: &Path,
        stderr_path: &Path,
    ) -> anyhow::Result<ExitStatus> {
        let stdout = File::create(stdout_path)
            .with_context(|| format!("create stdout file: {}", stdout_path.display()))?;
        let stderr = File::create(stderr_path)
            .with_context(|| format!("create stderr file: {}", stderr_path.display()))?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        let status = match stdin {
            StdinSource::File(path) => {
                let f = File::open(path)
                    .with_context(|| format!("open stdin file: {}", path.display()))?;
                cmd.stdin(Stdio::from(f));
                cmd.status()
                    .with_context(|| format!("start {}", self.program.display()))?
            }
            StdinSource::Text(text) => {
                cmd.stdin(Stdio::piped());
                let mut child = cmd
                    .spawn()
                    .with_context(|| format!("start {}", self.program.display()))?;
                if let Some(mut pipe) = child.stdin.take() {
                    pipe.write_all(text.as_bytes())
                        .with_context(|| format!("write stdin of {}", self.program.display()))?;
                }
                child
                    .wait()
                    .with_context(|| format!("wait for {}", self.program.display()))?
            }
        };
        Ok(status)
    }
}

impl fmt::Display for ExternalCommand {
    /// Shell-style rendering, for logs and the report only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program.to_string_lossy()))?;
        for a in &self.args {
            write!(f, " {}", shell_quote(&a.to_string_lossy()))?;
        }
        Ok(())
    }
}

fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_' | '=' | ':' | ','));
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}
