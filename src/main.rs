// Copyright 2024 SAP SE
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![warn(clippy::pedantic)]

mod api_clients;
mod config;
mod ecs;
mod images;
mod pipeline;

use std::process::ExitCode;
use std::sync::LazyLock;

use api_clients::{Client, RealClient};
use clap::builder::styling::Style;
use clap::{ArgAction, Parser};
use config::Config;
use tracing_subscriber::EnvFilter;

const BOLD_UNDERLINE: Style = Style::new().bold().underline();
static ENVIRONMENT_HELP: LazyLock<String> = LazyLock::new(|| {
    format!(
        "{BOLD_UNDERLINE}Environment variables:{BOLD_UNDERLINE:#}
  AWS_REGION, AWS_PROFILE      Used by the default AWS credential and region chain
  RUST_LOG                     Log filter, overrides -v
"
    )
});

/// Lists the container images running in ECS clusters
#[derive(Parser)]
#[command(version, about, long_about = None, after_help = ENVIRONMENT_HELP.to_string())]
pub struct Cli {
    /// Only look at this cluster (name or ARN) instead of all clusters
    #[arg(short, long, env = "ECS_CLUSTER")]
    cluster: Option<String>,

    /// AWS region to query, defaults to the region of the AWS profile
    #[arg(long)]
    region: Option<String>,

    /// Sort the image list
    #[arg(long)]
    sort: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Log more to stderr (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::from_cli(&cli);
    let client = RealClient::new(config.region.clone()).await;

    ExitCode::from(exit_status(&run(&client, &config).await))
}

/// Prints the image list, or nothing at all if any step failed.
async fn run<C: Client>(client: &C, config: &Config) -> Result<(), anyhow::Error> {
    let images = pipeline::collect_images(client, config).await?;
    println!("{}", images.to_json(config.pretty)?);
    Ok(())
}

fn exit_status(result: &Result<(), anyhow::Error>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {err:?}");
            1
        },
    }
}

fn init_tracing(verbose: u8) {
    // stdout is reserved for the JSON document
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn log_filter(verbose: u8) -> String {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("warn,ecs_list_images={level}")
}
