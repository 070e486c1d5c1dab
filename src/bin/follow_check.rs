use anyhow::{Context, Result};
use clap::Parser;
use follow_checker::session::CheckStage;
use follow_checker::{
    write_export, CheckError, CheckReport, CheckSession, CheckSource, DemoSource, FollowChecker,
    ProxyClient,
};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "follow-check",
    version = "0.1.0",
    about = "Compare who follows an account with who it follows"
)]
struct Args {
    /// Handle to check, with or without the leading @
    handle: String,

    /// Base URL of the follow-proxy server
    #[arg(short, long, default_value = "http://localhost:3001")]
    proxy_url: String,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "120")]
    timeout: u64,

    /// Write <handle>_data.json after the check
    #[arg(short, long)]
    export: bool,

    /// Directory for the export file
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Use made-up lists instead of calling the proxy
    #[arg(long)]
    demo: bool,

    /// Replace every handle in the export with a random placeholder
    #[arg(long, requires = "export")]
    placeholders: bool,

    /// Seed for demo lists and placeholders
    #[arg(long)]
    seed: Option<u64>,
}

fn setup_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,follow_check=info"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .init();
}

fn print_list(title: &str, users: &[String]) {
    println!("\n{} ({})", title, users.len());
    if users.is_empty() {
        println!("  none");
    }
    for user in users {
        println!("  @{user}");
    }
}

fn print_report(report: &CheckReport) {
    println!("\nResults for @{}", report.subject);
    if report.partial {
        println!("Warning: the upstream stopped early, lists may be incomplete");
    }
    print_list("Mutual", &report.comparison.mutual);
    print_list("Only follow you", &report.comparison.only_in_a);
    print_list("You follow only", &report.comparison.only_in_b);
}

async fn run_check<S: CheckSource>(
    checker: FollowChecker<S>,
    handle: &str,
) -> Result<CheckReport, CheckError> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = checker
        .check_with_progress(handle, |stage: CheckStage| {
            spinner.set_message(stage.to_string())
        })
        .await;

    spinner.finish_and_clear();
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let args = Args::parse();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let result = if args.demo {
        info!("Running in demo mode");
        let source = DemoSource::new(&mut rng, 40, 35, 20);
        run_check(FollowChecker::new(source), &args.handle).await
    } else {
        let client = ProxyClient::new(&args.proxy_url, Duration::from_secs(args.timeout))
            .map_err(|e| anyhow::anyhow!("Failed to create proxy client: {e}"))?;
        run_check(FollowChecker::new(client), &args.handle).await
    };

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}", e.user_message());
            if let CheckError::Throttled {
                retry_after: Some(wait),
            } = &e
            {
                eprintln!("Retry in {} seconds.", wait.as_secs().max(1));
            }
            info!("Check failed: {}", e);
            std::process::exit(1);
        }
    };

    print_report(&report);

    let mut session = CheckSession::new();
    session.store(report);

    if args.export {
        if let Some(document) = session.export() {
            let document = if args.placeholders {
                document.anonymize(&mut rng)
            } else {
                document
            };
            let path = write_export(&args.out_dir, &document)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))
                .context("Failed to write export")?;
            println!("\nExported to {}", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_requires_export() {
        let result = Args::try_parse_from(["follow-check", "ana", "--placeholders"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );

        let args = Args::try_parse_from(["follow-check", "ana", "--placeholders", "-e"]).unwrap();
        assert!(args.placeholders && args.export);
    }
}
