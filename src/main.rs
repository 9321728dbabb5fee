use anyhow::Result;
use apkscan::{
    config::Config,
    logging::init_tracing,
    output::{format_result_to_string, print_result, OutputFormat},
    pipeline::Pipeline,
    source::{ArchiveSource, LayerSource, RegistrySource},
    ScanError, ScanResult,
};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const REFERENCE_INVALID: u8 = 2;
    pub const IMAGE_UNAVAILABLE: u8 = 3;
    pub const FEED_ERROR: u8 = 4;
    pub const VULNERABLE: u8 = 5;
}

#[derive(Parser)]
#[command(name = "apkscan")]
#[command(
    author,
    version,
    about = "Scan container images for vulnerable Alpine packages"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an image for installed packages and known vulnerabilities
    Scan {
        /// Image reference (e.g. alpine:3.18), or a tarball path with --archive
        image: String,

        /// Treat IMAGE as a `docker save` tarball
        #[arg(long)]
        archive: bool,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write output to file
        #[arg(short, long)]
        output: Option<String>,

        /// Only list installed packages
        #[arg(long)]
        no_vuln_check: bool,

        /// Scan layers one at a time
        #[arg(long)]
        sequential: bool,

        /// Exit with a non-zero status if vulnerabilities are found
        #[arg(long)]
        fail_on_vulns: bool,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_tracing(&config)?;

    match cli.command {
        Commands::Scan {
            image,
            archive,
            format,
            output,
            no_vuln_check,
            sequential,
            fail_on_vulns,
        } => {
            let format_str = format.unwrap_or(config.default_format.clone());
            let format = OutputFormat::from_str(&format_str).map_err(|e| anyhow::anyhow!(e))?;

            let mut config = config;
            if sequential {
                config.parallel_layers = false;
            }

            let options = ScanOptions {
                format,
                output,
                check_vulns: !no_vuln_check,
                fail_on_vulns,
            };

            if archive {
                let mut source = ArchiveSource::open(&image)?;
                run_scan(&mut source, &config, options).await
            } else {
                let mut source = RegistrySource::new(&image)?;
                run_scan(&mut source, &config, options).await
            }
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

struct ScanOptions {
    format: OutputFormat,
    output: Option<String>,
    check_vulns: bool,
    fail_on_vulns: bool,
}

async fn run_scan(
    source: &mut dyn LayerSource,
    config: &Config,
    options: ScanOptions,
) -> Result<u8> {
    let is_interactive = options.format == OutputFormat::Table && options.output.is_none();
    let pipeline = Pipeline::from_config(config)?;

    let progress = is_interactive.then(|| spinner(format!("Scanning {}...", source.image())));
    let scan = pipeline.scan(source).await;
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    let scan = scan?;

    let mut result = ScanResult::new(source.image(), scan.inventory, scan.skipped);
    let mut code = exit_codes::SUCCESS;

    if options.check_vulns {
        let progress = is_interactive.then(|| spinner("Checking for vulnerabilities...".to_string()));
        let assessed = pipeline.assess(&result.inventory).await;
        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }

        match assessed {
            Ok(report) => result = result.with_report(report),
            Err(e) if e.is_feed_error() => {
                // Still show what the scan found.
                eprintln!("Warning: {}", e);
                code = exit_codes::FEED_ERROR;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(path) = options.output {
        let text = format_result_to_string(&result, options.format)?;
        std::fs::write(&path, text)?;
        eprintln!("Results written to: {}", path);
    } else {
        print_result(&result, options.format)?;
    }

    if code == exit_codes::SUCCESS && options.fail_on_vulns && result.has_vulnerabilities() {
        code = exit_codes::VULNERABLE;
    }
    Ok(code)
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    pb
}

/// Maps a failure to its exit code.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ScanError>() {
        Some(ScanError::ReferenceInvalid { .. }) => exit_codes::REFERENCE_INVALID,
        Some(ScanError::ImageUnavailable { .. }) => exit_codes::IMAGE_UNAVAILABLE,
        Some(e) if e.is_feed_error() => exit_codes::FEED_ERROR,
        _ => exit_codes::ERROR,
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    // Show current config
    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'apkscan config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
