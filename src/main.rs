//! Bill download CLI.
//!
//! Prints every trade record of the last `WXPAY_DAYS` days (default 2, ending
//! yesterday) as JSON lines, followed by a per-day count. Pass a `YYYYMMDD`
//! argument to fetch a single day instead.
//!
//! Credentials come from `WXPAY_APPID`, `WXPAY_MCH_ID`, `WXPAY_SUB_MCH_ID`
//! and `WXPAY_KEY`, optionally loaded from a `.env` file. `RUST_LOG` controls
//! log verbosity.

use std::process;

use chrono::{Duration, Local};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wxpay_bill::{ClientConfig, WxPayClient, WxPayError};

const DEFAULT_DAYS: i64 = 2;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        error!("{e}");
        process::exit(1);
    }
}

async fn run() -> Result<(), WxPayError> {
    let config = ClientConfig::from_env()?;
    let client = WxPayClient::new(config);

    for bill_date in bill_dates()? {
        info!(bill_date, "fetching trades");
        let mut count = 0usize;
        for record in client.trade_records(&bill_date).await? {
            let record = record?;
            let line = serde_json::to_string(&record)
                .map_err(|e| WxPayError::Unknown(format!("serialize record: {e}")))?;
            println!("{line}");
            count += 1;
        }
        println!("{bill_date}: {count}");
    }

    Ok(())
}

fn bill_dates() -> Result<Vec<String>, WxPayError> {
    if let Some(date) = std::env::args().nth(1) {
        return Ok(vec![date]);
    }

    let days = match std::env::var("WXPAY_DAYS") {
        Ok(v) => v
            .parse::<i64>()
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| {
                WxPayError::Config(format!("WXPAY_DAYS must be a positive integer, got {v:?}"))
            })?,
        Err(_) => DEFAULT_DAYS,
    };

    let today = Local::now().date_naive();
    Ok((1..=days)
        .map(|i| (today - Duration::days(i)).format("%Y%m%d").to_string())
        .collect())
}
