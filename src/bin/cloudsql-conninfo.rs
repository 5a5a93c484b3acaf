use clap::Parser;
use reqwest::Client;
use cloudsql_iam_connector::config::proc_loader::parse_config;
use cloudsql_iam_connector::config::ConnectorConfig;
use cloudsql_iam_connector::instance::IpType;
use cloudsql_iam_connector::observability::metrics::get_metrics;
use cloudsql_iam_connector::utils::config_loader;
use cloudsql_iam_connector::utils::logging;
use anyhow::{bail, Result};
use cloudsql_iam_connector::utils::logging::LogLevel;
use tracing::info;

/// Print a PostgreSQL conninfo with a fresh IAM token and the Cloud SQL
/// instance address, e.g. `psql "$(cloudsql-conninfo --instance p:r:i ...)"`.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG")]
    config: Option<String>,
    /// base connection string; overrides the config file
    #[arg(long, env = "CONNINFO")]
    conninfo: Option<String>,
    /// project:region:instance
    #[arg(short, long, env = "INSTANCE_CONNECTION_NAME")]
    instance: Option<String>,
    #[arg(long, env = "IP_TYPE", value_enum)]
    ip_type: Option<IpType>,
    /// do not inject an IAM token as password
    #[arg(long)]
    no_iam_auth: bool,
    #[arg(long, env = "LOG_LEVEL" , value_enum)]
    log_level: Option<LogLevel>,
    /// dump collected metrics to stderr before exiting
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load config
    // -------------------------------

    let args = Args::parse();
    let mut config = match (&args.config, &args.conninfo) {
        (Some(path), _) => config_loader::run(path).await?,
        (None, Some(conninfo)) => parse_config(&inline_config(conninfo))?,
        (None, None) => bail!("either --config or --conninfo is required"),
    };
    apply_overrides(&mut config, &args);
    logging::run(config.logging.as_ref(), args.log_level)?;

    // -------------------------------
    // 2. Resolve instance, fetch token
    // -------------------------------

    let client = Client::new();
    let provider = config.build_conninfo_provider(&client).await?;
    let conninfo = provider.conninfo().await?;
    info!("conninfo ready, host {:?}", provider.connector().host());

    // -------------------------------
    // 3. Output
    // -------------------------------

    println!("{}", conninfo);
    if args.metrics {
        eprintln!("{}", get_metrics().await.render());
    }
    Ok(())
}

fn inline_config(conninfo: &str) -> String {
    format!(
        "connection:\n  conninfo: {}\n",
        serde_json::Value::String(conninfo.to_owned())
    )
}

fn apply_overrides(config: &mut ConnectorConfig, args: &Args) {
    if let Some(conninfo) = &args.conninfo {
        config.connection.conninfo = conninfo.clone();
    }
    if let Some(instance) = &args.instance {
        config.connection.instance_connection_name = Some(instance.clone());
    }
    if let Some(ip_type) = args.ip_type {
        config.connection.ip_type = ip_type;
    }
    if args.no_iam_auth {
        config.connection.enable_iam_auth = false;
    }
}
