//! Network context and the idempotent installer

use std::sync::Arc;

use tracing::{debug, info};

use crate::session::CaptureSession;

use super::fetch::{FetchPrimitive, FetchRecorder};
use super::xhr::{XhrFactory, XhrPrimitive, XhrRecorder};

/// The request primitives of one monitored context
///
/// Holds the fetch primitive and the XHR instance factory callers go
/// through. `install` swaps both for recording decorators, at most once;
/// a second wrap would double-record every exchange.
pub struct NetworkContext {
    fetch: Arc<dyn FetchPrimitive>,
    xhr: Arc<dyn XhrFactory>,
    installed: bool,
}

impl NetworkContext {
    /// Create a context over the given primitives
    #[must_use]
    pub fn new(fetch: Arc<dyn FetchPrimitive>, xhr: Arc<dyn XhrFactory>) -> Self {
        Self {
            fetch,
            xhr,
            installed: false,
        }
    }

    /// Wire the capture session into this context, at most once
    ///
    /// Safe to call repeatedly: subsequent invocations perform no work.
    pub fn install(&mut self, session: &Arc<CaptureSession>) {
        if self.installed {
            debug!("Capture already installed; primitives left untouched");
            return;
        }
        self.installed = true;

        self.fetch = Arc::new(FetchRecorder::new(
            Arc::clone(&self.fetch),
            Arc::clone(session),
        ));
        self.xhr = Arc::new(RecordingXhrFactory {
            inner: Arc::clone(&self.xhr),
            session: Arc::clone(session),
        });

        info!("Capture installed");
    }

    /// Whether the capture session has been wired in
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// The fetch primitive callers should go through
    #[must_use]
    pub fn fetch(&self) -> Arc<dyn FetchPrimitive> {
        Arc::clone(&self.fetch)
    }

    /// Create a fresh XHR-style instance
    #[must_use]
    pub fn new_xhr(&self) -> Box<dyn XhrPrimitive> {
        self.xhr.create()
    }
}

/// Factory decorator: every created instance records into the session
struct RecordingXhrFactory {
    inner: Arc<dyn XhrFactory>,
    session: Arc<CaptureSession>,
}

impl XhrFactory for RecordingXhrFactory {
    fn create(&self) -> Box<dyn XhrPrimitive> {
        Box::new(XhrRecorder::new(
            self.inner.create(),
            Arc::clone(&self.session),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::fetch::{FetchRequest, FetchResponse};
    use crate::intercept::xhr::{XhrOutcome, XhrResponseType};
    use crate::Result;
    use bytes::Bytes;
    use futures_util::future::BoxFuture;

    struct PlainFetch;

    impl FetchPrimitive for PlainFetch {
        fn call(&self, _request: FetchRequest) -> BoxFuture<'_, Result<FetchResponse>> {
            Box::pin(async move {
                Ok(FetchResponse {
                    status: 200,
                    status_text: "OK".to_string(),
                    headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
                    body: Bytes::from_static(b"ok"),
                })
            })
        }
    }

    struct PlainXhr {
        target: Option<(String, String)>,
    }

    impl XhrPrimitive for PlainXhr {
        fn open(&mut self, method: &str, url: &str) {
            self.target = Some((method.to_string(), url.to_string()));
        }

        fn send(&mut self, _body: Option<Bytes>) -> BoxFuture<'_, XhrOutcome> {
            Box::pin(async move {
                XhrOutcome {
                    status: 200,
                    status_text: "OK".to_string(),
                    raw_headers: "content-type: text/plain\r\n".to_string(),
                    response_type: XhrResponseType::Text,
                    body: Bytes::from_static(b"ok"),
                }
            })
        }
    }

    struct PlainXhrFactory;

    impl XhrFactory for PlainXhrFactory {
        fn create(&self) -> Box<dyn XhrPrimitive> {
            Box::new(PlainXhr { target: None })
        }
    }

    fn context() -> NetworkContext {
        NetworkContext::new(Arc::new(PlainFetch), Arc::new(PlainXhrFactory))
    }

    #[tokio::test]
    async fn test_uninstalled_context_records_nothing() {
        let ctx = context();
        let session = Arc::new(CaptureSession::default());

        ctx.fetch()
            .call(FetchRequest::get("http://example.com/a"))
            .await
            .unwrap();

        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_install_wires_both_adapters() {
        let mut ctx = context();
        let session = Arc::new(CaptureSession::default());
        ctx.install(&session);
        assert!(ctx.is_installed());

        ctx.fetch()
            .call(FetchRequest::get("http://example.com/a"))
            .await
            .unwrap();

        let mut xhr = ctx.new_xhr();
        xhr.open("GET", "http://example.com/b");
        xhr.send(None).await;

        assert_eq!(session.len(), 2);
    }

    #[tokio::test]
    async fn test_double_install_records_once_per_exchange() {
        let mut ctx = context();
        let session = Arc::new(CaptureSession::default());
        ctx.install(&session);
        ctx.install(&session);

        ctx.fetch()
            .call(FetchRequest::get("http://example.com/a"))
            .await
            .unwrap();

        assert_eq!(session.len(), 1);
    }
}
