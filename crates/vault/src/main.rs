use anyhow::{anyhow, Result};
use clap::Parser;
use std::time::Duration;

use bittx::Vault;
use mempool::MempoolClient;
use tokio::time::timeout;
use tracing::info;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    fmt::{self},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};
use vault::{
    compile,
    config::{self, Command},
    refund::{self, RefundOutcome, RefundRequest},
};

#[tokio::main]
async fn main() -> Result<()> {
    // TIPS: guard must have same long lifetime with main
    let _guard = logger_init();

    let cli = config::Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let keys = cfg.merchant.keys()?;
    let provider = MempoolClient::new(
        &cfg.provider.url,
        Duration::from_secs(cfg.provider.timeout_secs),
    )?
    .confirmed_only(cfg.provider.confirmed_only);
    info!("using provider {} on {:?}", provider.base_url(), cfg.network);

    match cli.command {
        Command::Compile => {
            let info = compile::compile_vault(keys, cfg.network, &provider).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Refund {
            refund_amount,
            sender_address,
            sender_pubkey,
        } => {
            let request =
                RefundRequest::parse(&sender_pubkey, &sender_address, &refund_amount, cfg.network)?;
            println!(
                "{}",
                bittx::pubkey_to_address(&request.sender_pk, cfg.network)
            );

            let signer_key = cfg.signer_key()?;
            let vault = Vault::new(keys, cfg.network)?;
            let outcome = timeout(
                Duration::from_secs(cfg.refund_timeout_secs),
                refund::emergency_refund(&vault, &provider, &signer_key, &request),
            )
            .await
            .map_err(|_| anyhow!("refund timed out after {}s", cfg.refund_timeout_secs))??;

            match outcome {
                RefundOutcome::Refunded(receipt) => {
                    println!(
                        "Refunded {} sats to {} from vault contract!",
                        receipt.amount.to_sat(),
                        request.sender_address
                    );
                    println!("TXID: {}", receipt.txid);
                }
                RefundOutcome::NotFound {
                    candidates,
                    attempts,
                } => {
                    println!(
                        "No refundable output of {} sats for {} ({} candidates, {} failed attempts)",
                        request.refund_amount.to_sat(),
                        request.sender_address,
                        candidates,
                        attempts
                    );
                }
            }
        }
    }

    Ok(())
}

fn logger_init() -> WorkerGuard {
    let formatting_layer = fmt::layer().pretty().with_writer(std::io::stderr);
    let file_appender = RollingFileAppender::new(Rotation::HOURLY, "logs/vault", "vault.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG)
        .boxed();

    Registry::default()
        .with(formatting_layer)
        .with(file_layer)
        .with(EnvFilter::from_default_env())
        .init();

    guard
}
