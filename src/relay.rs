use crate::cli::ServeArgs;
use crate::config::Config;
use crate::dispatch::WireReply;
use crate::pipeline::{Pipeline, ReqwestTransport, Transport, ValidationRequest};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
struct ProxyParams {
    port: Option<u16>,
}

/// Local relay: `GET /api/proxy?port=<n>` runs the fetch-then-validate
/// pipeline against a dev server on localhost and returns the wire reply
pub async fn serve(args: &ServeArgs, config: &Config) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(config.validator.timeout_secs);
    let transport = ReqwestTransport::new(timeout)?;
    let pipeline = Arc::new(Pipeline::new(transport, &config.validator));

    let app = Router::new()
        .route("/api/proxy", get(proxy::<ReqwestTransport>))
        .with_state(pipeline);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    info!("Relay listening on {}", args.listen);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn proxy<T: Transport + 'static>(
    State(pipeline): State<Arc<Pipeline<T>>>,
    Query(params): Query<ProxyParams>,
) -> (StatusCode, Json<WireReply>) {
    let Some(port) = params.port else {
        return (
            StatusCode::BAD_REQUEST,
            Json(WireReply::err("port query parameter is required")),
        );
    };

    match pipeline.validate(&ValidationRequest::Port(port)).await {
        Ok(validated) => (StatusCode::OK, Json(WireReply::ok(validated))),
        Err(e) => {
            error!("Relay validation failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(WireReply::err(e.to_string())))
        }
    }
}
