use crate::pipeline::{Pipeline, PipelineError, Transport, Validated, ValidationRequest, ValidatorReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

/// Message type that triggers a validation run
pub const FETCH_HTML: &str = "FETCH_HTML";

/// Inbound message as it crosses the boundary
///
/// `type` is an open string so unrecognized kinds can be ignored instead of
/// failing deserialization.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Reply wire shape: `{success, data?, validation?, error?}`
///
/// Exactly one of `validation` or `error` is populated; the tagged pipeline
/// result only flattens into this shape at the serialization edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidatorReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WireReply {
    pub fn ok(validated: Validated) -> Self {
        Self {
            success: true,
            data: Some(validated.html),
            validation: Some(ValidatorReport {
                messages: validated.diagnostics,
            }),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            validation: None,
            error: Some(message.into()),
        }
    }
}

impl From<Result<Validated, PipelineError>> for WireReply {
    fn from(result: Result<Validated, PipelineError>) -> Self {
        match result {
            Ok(validated) => WireReply::ok(validated),
            Err(e) => WireReply::err(e.to_string()),
        }
    }
}

/// What the handler did with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Unrecognized message type; the reply sender was dropped, no reply
    /// was or will be sent
    Ignored,
    /// A reply was already sent synchronously
    Replied,
    /// A reply will be sent exactly once when the pipeline resolves
    Pending,
}

/// A message paired with its single-use reply channel
pub struct Envelope {
    pub message: serde_json::Value,
    pub reply: oneshot::Sender<WireReply>,
}

/// Handles FETCH_HTML messages by running the validation pipeline
///
/// Constructed once at startup and registered with a `Dispatcher`. At most
/// one run is in flight at a time; a trigger arriving mid-run gets an
/// immediate error reply instead of racing.
pub struct Handler<T: Transport + 'static> {
    pipeline: Arc<Pipeline<T>>,
    in_flight: Arc<AtomicBool>,
}

impl<T: Transport + 'static> Handler<T> {
    pub fn new(pipeline: Pipeline<T>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn handle(&self, message: &serde_json::Value, reply: oneshot::Sender<WireReply>) -> Continuation {
        let message: InboundMessage = match serde_json::from_value(message.clone()) {
            Ok(m) => m,
            Err(e) => {
                debug!("Ignoring malformed message: {}", e);
                return Continuation::Ignored;
            }
        };

        if message.kind != FETCH_HTML {
            debug!("Ignoring message with unrecognized type '{}'", message.kind);
            return Continuation::Ignored;
        }

        let request = match (message.url, message.port) {
            (Some(url), _) => ValidationRequest::Url(url),
            (None, Some(port)) => ValidationRequest::Port(port),
            (None, None) => {
                let _ = reply.send(WireReply::err("no validation target in message"));
                return Continuation::Replied;
            }
        };

        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("Rejecting trigger: a validation run is already in flight");
            let _ = reply.send(WireReply::err("a validation run is already in flight"));
            return Continuation::Replied;
        }

        let pipeline = self.pipeline.clone();
        let in_flight = self.in_flight.clone();
        tokio::spawn(async move {
            let result = pipeline.validate(&request).await;
            in_flight.store(false, Ordering::SeqCst);
            if reply.send(WireReply::from(result)).is_err() {
                debug!("Reply channel closed before the pipeline finished");
            }
        });
        Continuation::Pending
    }
}

/// Serves an inbox of envelopes against a single handler
pub struct Dispatcher<T: Transport + 'static> {
    handler: Handler<T>,
}

impl<T: Transport + 'static> Dispatcher<T> {
    pub fn new(handler: Handler<T>) -> Self {
        Self { handler }
    }

    pub async fn serve(self, mut inbox: mpsc::Receiver<Envelope>) {
        while let Some(envelope) = inbox.recv().await {
            match self.handler.handle(&envelope.message, envelope.reply) {
                Continuation::Ignored => trace!("Dispatch: ignored"),
                Continuation::Replied => trace!("Dispatch: replied synchronously"),
                Continuation::Pending => trace!("Dispatch: reply pending"),
            }
        }
        debug!("Dispatcher inbox closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorConfig;
    use crate::diagnostic::{Diagnostic, Severity};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    /// Transport whose first hop can be held open until released
    struct GatedTransport {
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn get(&self, _url: &str) -> anyhow::Result<String> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok("H".to_string())
        }

        async fn post_html(&self, _url: &str, _ua: &str, _body: &str) -> anyhow::Result<String> {
            Ok(r#"{"messages":[{"type":"error","message":"M"}]}"#.to_string())
        }
    }

    fn handler(gate: Option<Arc<Notify>>) -> Handler<GatedTransport> {
        let pipeline = Pipeline::new(GatedTransport { gate }, &ValidatorConfig::default());
        Handler::new(pipeline)
    }

    #[tokio::test]
    async fn test_fetch_html_replies_exactly_once() {
        let handler = handler(None);
        let (tx, rx) = oneshot::channel();

        let continuation = handler.handle(
            &json!({"type": "FETCH_HTML", "url": "https://example.com"}),
            tx,
        );
        assert_eq!(continuation, Continuation::Pending);

        let reply = rx.await.unwrap();
        assert!(reply.success);
        assert_eq!(reply.data.as_deref(), Some("H"));
        assert_eq!(
            reply.validation.unwrap().messages,
            vec![Diagnostic::new(Severity::Error, "M")]
        );
        assert_eq!(reply.error, None);
    }

    #[tokio::test]
    async fn test_unrecognized_type_sends_no_reply() {
        let handler = handler(None);
        let (tx, rx) = oneshot::channel();

        let continuation = handler.handle(&json!({"type": "OTHER"}), tx);
        assert_eq!(continuation, Continuation::Ignored);

        // the sender was dropped without firing
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_missing_target_replies_synchronously() {
        let handler = handler(None);
        let (tx, mut rx) = oneshot::channel();

        let continuation = handler.handle(&json!({"type": "FETCH_HTML"}), tx);
        assert_eq!(continuation, Continuation::Replied);

        let reply = rx.try_recv().unwrap();
        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("no validation target in message"));
    }

    #[tokio::test]
    async fn test_overlapping_trigger_is_rejected() {
        let gate = Arc::new(Notify::new());
        let handler = handler(Some(gate.clone()));

        let (first_tx, first_rx) = oneshot::channel();
        let continuation = handler.handle(
            &json!({"type": "FETCH_HTML", "url": "https://example.com"}),
            first_tx,
        );
        assert_eq!(continuation, Continuation::Pending);

        // second trigger while the first hop is still blocked on the gate
        let (second_tx, mut second_rx) = oneshot::channel();
        let continuation = handler.handle(
            &json!({"type": "FETCH_HTML", "url": "https://example.com"}),
            second_tx,
        );
        assert_eq!(continuation, Continuation::Replied);
        let busy = second_rx.try_recv().unwrap();
        assert!(!busy.success);
        assert_eq!(busy.error.as_deref(), Some("a validation run is already in flight"));

        // release the first run; it still completes normally
        gate.notify_one();
        let reply = first_rx.await.unwrap();
        assert!(reply.success);
    }

    #[tokio::test]
    async fn test_dispatcher_routes_envelopes() {
        let dispatcher = Dispatcher::new(handler(None));
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(dispatcher.serve(rx));

        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(Envelope {
            message: json!({"type": "FETCH_HTML", "port": 3000}),
            reply: reply_tx,
        })
        .await
        .unwrap();

        let reply = reply_rx.await.unwrap();
        assert!(reply.success);
    }

    #[test]
    fn test_wire_reply_serialization_omits_absent_fields() {
        let reply = WireReply::err("net down");
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json, json!({"success": false, "error": "net down"}));

        let reply = WireReply::ok(Validated {
            html: "H".to_string(),
            diagnostics: vec![Diagnostic::new(Severity::Error, "M")],
        });
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(
            json,
            json!({
                "success": true,
                "data": "H",
                "validation": {"messages": [{"type": "error", "message": "M"}]}
            })
        );
    }
}
