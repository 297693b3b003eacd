use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reqwest::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// The gateway answered, but not with a success.
#[derive(Debug, Error)]
enum RejectedError {
    #[error("gateway returned status {0}")]
    Status(StatusCode),

    #[error("gateway returned status {status}\nResponse: {body}")]
    WithBody { status: StatusCode, body: String },
}

#[derive(Parser)]
#[command(name = "gatewayctl")]
#[command(about = "Management CLI for the route gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the route table
    Targets,
    /// Add a route
    Add {
        /// Route key, e.g. /api
        path: String,
        /// Upstream base URL, e.g. http://localhost:9000
        target: String,
    },
    /// Remove a route
    Remove {
        /// Route key, e.g. /api
        path: String,
    },
    /// Show per-route success/failure counters
    Stats,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult {
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Targets => {
            let res = client.get(format!("{}/targets", base)).send().await?;
            print_json(res).await?;
        }
        Commands::Add { path, target } => {
            let res = client
                .post(format!("{}/targets", base))
                .json(&json!({ "path": path, "target": target }))
                .send()
                .await?;
            print_text(res).await?;
        }
        Commands::Remove { path } => {
            let key = path.trim_start_matches('/');
            let res = client
                .delete(format!("{}/targets/{}", base, key))
                .send()
                .await?;
            if res.status().is_success() {
                println!("Removed route: /{}", key);
            } else {
                print_text(res).await?;
            }
        }
        Commands::Stats => {
            let res = client.get(format!("{}/metrics", base)).send().await?;
            print_json(res).await?;
        }
    }

    Ok(())
}

async fn print_json(res: reqwest::Response) -> CliResult {
    let status = res.status();
    if !status.is_success() {
        return report_failure(res).await;
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

async fn print_text(res: reqwest::Response) -> CliResult {
    if !res.status().is_success() {
        return report_failure(res).await;
    }
    println!("{}", res.text().await?.trim_end());
    Ok(())
}

async fn report_failure(res: reqwest::Response) -> CliResult {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    let body = body.trim_end();
    if body.is_empty() {
        return Err(RejectedError::Status(status).into());
    }
    Err(RejectedError::WithBody {
        status,
        body: body.to_string(),
    }
    .into())
}
