use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use moses_erranalysis::config::{init_default_config, resolve_config_path, RunConfig};
use moses_erranalysis::pipeline::{
    AnalysisOptions, AnalysisRequest, ErrAnalysis, DEFAULT_TABLE_WIDTH,
};
use moses_erranalysis::progress::ConsoleProgress;

#[derive(Parser, Debug)]
#[command(name = "erranalysis")]
#[command(about = "A tool to make error analysis of Moses output easier", long_about = None)]
struct Args {
    /// The k-value for the generated k-best translation list
    #[arg(short = 'k', long = "kbest", value_name = "K")]
    kbest: Option<usize>,

    /// Only output distinct sentences in the k-best list
    #[arg(short = 'd', long = "distinct")]
    distinct: bool,

    /// Input source file (default: the evaluation input of the configured run)
    #[arg(short = 'i', long = "inputFile", value_name = "FILE")]
    input_file: Option<PathBuf>,

    /// Sentence id (zero-based line number) in the input file
    #[arg(
        short = 's',
        long = "sentenceid",
        value_name = "ID",
        required_unless_present = "init_config"
    )]
    sentence_id: Option<usize>,

    /// Output report, "-" for stdout (default: report.html in the run directory)
    #[arg(short = 'o', long = "outputFile", value_name = "FILE")]
    output_file: Option<String>,

    /// Reference files in the target language; exactly one is required for --force
    /// (default: the evaluation references of the configured run)
    #[arg(short = 'r', long = "refFile", value_name = "FILE", num_args = 0..)]
    ref_files: Option<Vec<PathBuf>>,

    /// Score the translation output with sentence-bleu
    #[arg(short = 'b', long = "bleu")]
    bleu: bool,

    /// Constrain the decoder to produce the reference translation
    #[arg(short = 'f', long = "force")]
    force: bool,

    /// Extra options for the decoder, split like a shell command line (quotes group words)
    #[arg(long = "decodersettings", value_name = "OPTIONS", allow_hyphen_values = true)]
    decoder_settings: Option<String>,

    /// Write the decoding trace for the translation output
    #[arg(short = 't', long = "trace")]
    trace: bool,

    /// Config file (default: $ERRANALYSIS_CONFIG, else .cfg searched upwards)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write a template .cfg (into DIR, default: current directory), then exit
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    init_config: Option<Option<PathBuf>>,

    /// Overwrite an existing .cfg when used with --init-config
    #[arg(long, requires = "init_config")]
    overwrite: bool,

    /// Width of the results table, in percent
    #[arg(long, value_name = "PCT", default_value_t = DEFAULT_TABLE_WIDTH)]
    width: u8,

    /// No progress output on stderr
    #[arg(short = 'q', long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(dir) = args.init_config {
        let dir = match dir {
            Some(d) => d,
            None => std::env::current_dir().context("current dir")?,
        };
        let cfg_path = init_default_config(&dir, args.overwrite).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let sentence_id = args
        .sentence_id
        .context("missing -s/--sentenceid")?;
    let opts = AnalysisOptions::validate(AnalysisRequest {
        sentence_id,
        kbest: args.kbest,
        distinct: args.distinct,
        input_file: args.input_file,
        output_file: args.output_file,
        ref_files: args.ref_files,
        bleu: args.bleu,
        force: args.force,
        decoder_settings: args.decoder_settings,
        trace: args.trace,
        table_width: args.width,
    })?;

    let cfg_path = resolve_config_path(args.config)?;
    let cfg = RunConfig::load(&cfg_path)?;

    let progress = ConsoleProgress::new(!args.quiet);
    progress.info(format!("Config: {}", cfg_path.display()));
    let outcome = ErrAnalysis::new(cfg, opts, progress).run()?;
    if outcome.report.is_some() {
        println!("{}", outcome.run_dir.display());
    }
    Ok(())
}
