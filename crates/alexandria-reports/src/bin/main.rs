use alexandria_reports::{
    logging, resolve_credentials, Config, CredentialProvider, EnvCredentials, Params,
    PromptCredentials, Runner,
};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{error, warn, Level};

#[derive(Parser)]
#[command(name = "alexandria-reports")]
#[command(about = "Download portal reports and file them by date")]
#[command(version)]
struct Cli {
    /// Config file to run
    #[arg(default_value = "configs/alexandria.yaml")]
    config: PathBuf,

    /// Run in headless mode (overrides config)
    #[arg(long)]
    headless: bool,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Only run this report (can be used multiple times)
    #[arg(short, long = "report", value_name = "NAME")]
    reports: Vec<String>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate config without running
    #[arg(long)]
    check: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,

    /// Directory for the run's log file
    #[arg(long, value_name = "DIR", default_value = "logs")]
    log_dir: PathBuf,
}

#[tokio::main]
async fn main() -> alexandria_reports::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };
    let guard = logging::init(level, Some(&cli.log_dir), "ReportRun")?;

    // -P values win over the environment (and .env)
    let params = Params::from_args(&cli.params)?.with_env();
    let mut config = Config::load_with_params(&cli.config, &params)?;
    if cli.headless {
        config.browser.headless = true;
    }
    let jobs = config.select_reports(&cli.reports)?;

    if cli.check {
        println!("Config valid: {}", config.name);
        println!("  Portal: {}", config.portal.url);
        println!("  Output: {}", config.output_dir.display());
        println!("  Reports: {}", jobs.len());
        for job in &jobs {
            println!("    - {}: {}", job.name, job.link);
        }
        if !config.params.is_empty() {
            println!("  Parameters: {}", config.params.len());
            for (name, def) in &config.params {
                let req = if def.required { " (required)" } else { "" };
                let desc = def.description.as_deref().unwrap_or("");
                println!("    - {}{}: {}", name, req, desc);
            }
        }
        return Ok(());
    }

    let env = EnvCredentials::default();
    let prompt = PromptCredentials::terminal();
    let mut providers: Vec<&dyn CredentialProvider> = vec![&env];
    if std::io::stdin().is_terminal() {
        providers.push(&prompt);
    }
    let credentials = resolve_credentials(&providers)?;

    println!("Running: {}", config.name);

    let runner = Runner::launch(&config.browser).await?;
    let run_date = chrono::Local::now().date_naive();
    let outcome = runner
        .run_reports(&config, &credentials, run_date, &jobs)
        .await;
    if let Err(e) = runner.close().await {
        warn!("Failed to close browser: {}", e);
    }

    println!();
    match outcome {
        Ok(result) => {
            println!("✓ Success");
            for report in &result.reports {
                println!("  {}: {}", report.name, report.path.display());
            }
            for warning in &result.warnings {
                println!("  Warning: {}", warning);
            }
            println!("  Duration: {}ms", result.duration_ms);
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {}", e);
            println!("✗ Failed");
            println!("  Error: {}", e);
            // exit skips destructors; flush the log file first
            drop(guard);
            std::process::exit(1);
        }
    }
}
