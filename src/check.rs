use crate::aggregate::aggregate;
use crate::cli::CheckArgs;
use crate::config::Config;
use crate::dispatch::{Dispatcher, Envelope, Handler};
use crate::pipeline::{Pipeline, ReqwestTransport};
use crate::render;
use anyhow::{Context, bail};
use serde_json::json;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Run one validation pass and print the aggregated findings
///
/// The request crosses the same messaging boundary a UI shell would use:
/// build a FETCH_HTML message, send it to the dispatcher as an envelope,
/// await the single reply.
pub async fn check(args: &CheckArgs, config: &Config) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(config.validator.timeout_secs);
    let transport = ReqwestTransport::new(timeout)?;
    let pipeline = Pipeline::new(transport, &config.validator);
    let handler = Handler::new(pipeline);

    let (inbox_tx, inbox_rx) = mpsc::channel(1);
    tokio::spawn(Dispatcher::new(handler).serve(inbox_rx));

    let message = match (&args.url, args.port) {
        (Some(url), _) => json!({"type": "FETCH_HTML", "url": url}),
        (None, Some(port)) => json!({"type": "FETCH_HTML", "port": port}),
        // clap enforces exactly one target
        (None, None) => bail!("no validation target given"),
    };
    debug!("Dispatching {}", message);

    let (reply_tx, reply_rx) = oneshot::channel();
    inbox_tx
        .send(Envelope {
            message,
            reply: reply_tx,
        })
        .await
        .context("dispatcher stopped")?;

    let reply = reply_rx.await.context("no reply from dispatcher")?;
    if !reply.success {
        bail!(reply.error.unwrap_or_else(|| "validation failed".to_string()));
    }

    let diagnostics = reply.validation.map(|v| v.messages).unwrap_or_default();
    info!("Validator returned {} findings", diagnostics.len());
    let summary = aggregate(&diagnostics);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", render::format_summary(&summary));
    }

    if summary.counts.error > 0 && args.fail_on_error {
        bail!("{} markup errors found", summary.counts.error);
    }
    Ok(())
}
