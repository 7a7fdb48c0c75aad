use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use conv::{
    api::{MetadataSource, VideoInfoClient},
    cache::OwnerCache,
    config::ConvConfig,
    executor::{Dispatcher, PrintDispatcher, ReplaceDispatcher},
    resolver::Resolver,
    scan::{self, Scanner},
};
use log::{info, LevelFilter};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Convert cached bilibili downloads into playable files
#[derive(Parser, Debug)]
#[command(name = "bili-conv", author, version, about, long_about = None)]
struct Args {
    /// Download directories to convert
    #[arg(required = true, num_args = 1..)]
    ref_path: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log verbosity (case-insensitive; WARNING and CRITICAL are accepted)
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = Verbosity::Info)]
    verbose: Verbosity,

    /// Print commands instead of executing them
    #[arg(short = 'd', long = "debug-mode")]
    debug: bool,

    /// Path to configuration file (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Verbosity {
    #[value(aliases = ["critical", "fatal"])]
    Error,
    #[value(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<Verbosity> for LevelFilter {
    fn from(v: Verbosity) -> Self {
        match v {
            Verbosity::Error => LevelFilter::Error,
            Verbosity::Warn => LevelFilter::Warn,
            Verbosity::Info => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
            Verbosity::Trace => LevelFilter::Trace,
        }
    }
}

impl Args {
    /// Config file values with command line overrides applied
    fn resolve_config(&self) -> Result<ConvConfig> {
        let mut cfg = ConvConfig::load_config(self.config.as_deref())
            .context("Failed to load configuration")?;
        if let Some(output) = &self.output {
            cfg.output_dir = output.clone();
        }
        if self.debug {
            cfg.debug_mode = true;
        }
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG module filters still apply; -v sets the global level
    env_logger::Builder::from_default_env()
        .filter_level(args.verbose.into())
        .format_timestamp_secs()
        .init();

    let cfg = args.resolve_config()?;
    info!("bili-conv starting");
    info!("  Download roots: {:?}", args.ref_path);
    info!("  Output dir: {}", cfg.output_dir.display());
    info!("  Owner cache: {}", cfg.cache_path.display());
    info!("  Debug mode: {}", cfg.debug_mode);

    if let Some(cache_dir) = cfg.cache_dir() {
        fs::create_dir_all(cache_dir)
            .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;
    }
    fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("Failed to create output directory: {}", cfg.output_dir.display()))?;

    let mut cache = OwnerCache::new(&cfg.cache_path);
    if cfg.cache_path.exists() {
        cache.load(None).context("Failed to load owner cache")?;
    } else {
        info!("No owner cache at {}, starting empty", cfg.cache_path.display());
    }

    let client = VideoInfoClient::new(
        cfg.api_endpoint.clone(),
        cfg.request_timeout_secs.map(Duration::from_secs),
    )?;
    let mut scanner = Scanner::new(
        Resolver::new(cache, client),
        cfg.transcoder.clone(),
        cfg.output_dir.clone(),
    );

    let roots = scan::expand_download_roots(&args.ref_path)
        .context("Failed to list download roots")?;

    if cfg.debug_mode {
        run(&mut scanner, &roots, &mut PrintDispatcher::stdout()).await?;
    } else {
        // The first runnable command replaces this process, so a production
        // run normally ends inside this call.
        run(&mut scanner, &roots, &mut ReplaceDispatcher).await?;
    }

    scanner
        .resolver()
        .cache()
        .save()
        .context("Failed to save owner cache")?;
    Ok(())
}

async fn run<S: MetadataSource, D: Dispatcher>(
    scanner: &mut Scanner<S>,
    roots: &[PathBuf],
    dispatcher: &mut D,
) -> Result<()> {
    let summary = scanner
        .scan(roots, dispatcher)
        .await
        .context("Scan aborted")?;
    info!(
        "Converted {} item(s) from {} root(s): {} command(s), {} dispatched",
        summary.items, summary.roots, summary.commands, summary.dispatched
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let args = Args::try_parse_from(["bili-conv", "download"]).unwrap();
        assert_eq!(args.ref_path, vec![PathBuf::from("download")]);
        assert_eq!(args.verbose, Verbosity::Info);
        assert!(!args.debug);

        let cfg = args.resolve_config().unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("output"));
        assert!(!cfg.debug_mode);
    }

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from([
            "bili-conv", "-o", "converted", "-v", "debug", "-d", "a", "b",
        ])
        .unwrap();
        assert_eq!(args.ref_path.len(), 2);
        assert_eq!(LevelFilter::from(args.verbose), LevelFilter::Debug);

        let cfg = args.resolve_config().unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("converted"));
        assert!(cfg.debug_mode);
    }

    #[test]
    fn ref_path_is_required() {
        assert!(Args::try_parse_from(["bili-conv"]).is_err());
    }

    #[test]
    fn severity_names_are_case_insensitive() {
        let cases = [
            ("INFO", LevelFilter::Info),
            ("DEBUG", LevelFilter::Debug),
            ("WARNING", LevelFilter::Warn),
            ("warning", LevelFilter::Warn),
            ("CRITICAL", LevelFilter::Error),
            ("Error", LevelFilter::Error),
        ];
        for (name, level) in cases {
            let args = Args::try_parse_from(["bili-conv", "-v", name, "x"])
                .unwrap_or_else(|e| panic!("-v {} rejected: {}", name, e));
            assert_eq!(LevelFilter::from(args.verbose), level, "-v {}", name);
        }
    }

    #[test]
    fn unknown_level_is_rejected() {
        assert!(Args::try_parse_from(["bili-conv", "-v", "loud", "x"]).is_err());
    }
}
