use std::process::ExitStatus;

use super::config::AnalysisOptions;
use super::rundir::RunDir;
use crate::config::RunConfig;
use crate::process::{ExternalCommand, StdinSource};

/// `moses_chart -f <run>/moses.ini [-n-best-list <run>/kbest K [distinct]] [settings] [-T <run>/trace]`
pub fn build_decoder_command(
    cfg: &RunConfig,
    opts: &AnalysisOptions,
    run: &RunDir,
) -> ExternalCommand {
    let mut cmd = ExternalCommand::new(cfg.decoder_binary())
        .arg("-f")
        .arg(run.ini());
    if let Some(k) = opts.kbest {
        cmd = cmd
            .arg("-n-best-list")
            .arg(run.kbest())
            .arg(k.size.to_string());
        if k.distinct {
            cmd = cmd.arg("distinct");
        }
    }
    cmd = cmd.args(opts.decoder_args.iter().map(String::as_str));
    if opts.trace {
        cmd = cmd.arg("-T").arg(run.trace());
    }
    cmd
}

pub fn run_decoder(
    cmd: &ExternalCommand,
    sentence: &str,
    run: &RunDir,
) -> anyhow::Result<ExitStatus> {
    cmd.run_captured(
        &StdinSource::Text(format!("{sentence}\n")),
        &run.translation(),
        &run.decoder_stderr(),
    )
}
