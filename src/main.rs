use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fgo_mapping::pipeline::{init_default_config, MappingPipeline, PipelineConfig, RunOverrides};
use fgo_mapping::progress::ConsoleProgress;

#[derive(Parser, Debug)]
#[command(name = "fgo-mapping")]
#[command(about = "Merge multi-region game text into one published translation mapping", long_about = None)]
struct Args {
    /// Generate a default config file, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write the config file (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite an existing config file when used with --init-config
    #[arg(long)]
    force: bool,

    /// Config file path (default: search for fgo-mapping.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for the published files
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Unix time treated as "now" when hiding unreleased events
    #[arg(long)]
    now: Option<i64>,

    /// Worker threads (0 = all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Skip the wiki translation bundles
    #[arg(long)]
    skip_wiki: bool,

    /// Skip the community NA mapping mirror
    #[arg(long)]
    skip_atlas: bool,

    /// Do not derive names from templates
    #[arg(long)]
    no_autofill: bool,

    /// Suppress stage progress lines
    #[arg(short, long)]
    quiet: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let progress = ConsoleProgress::new(!args.quiet);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let overrides = RunOverrides {
        config_path: args.config,
        output: args.output,
        now: args.now,
        threads: args.threads,
        skip_wiki: args.skip_wiki,
        skip_atlas: args.skip_atlas,
        no_autofill: args.no_autofill,
    };
    let cfg = PipelineConfig::from_args(&overrides).context("build config")?;
    let output_dir = cfg.output_dir.clone();

    let pipeline = MappingPipeline::new(cfg, progress)?;
    let summary = pipeline.run()?;
    println!(
        "{} keys, {} official / {} wiki / {} atlas writes, {} autofilled -> {}",
        summary.keys,
        summary.official.written,
        summary.wiki.written,
        summary.atlas.written,
        summary.autofill.filled,
        output_dir.display()
    );
    Ok(())
}
