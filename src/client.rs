use std::fmt;
use std::io::Read;
use std::sync::Arc;

use reqwest::Url;

use crate::{
    wire::force_stream_format, ClickHouseError, ClientOptions, HttpTransport, Iter, Result,
    Statement, Transport,
};

/// Substring a healthy server answers an empty `GET /` with.
const PING_OK: &str = "Ok.";

/// A server endpoint paired with the transport used to reach it.
#[derive(Clone)]
pub struct Conn {
    host: String,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Conn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conn")
            .field("host", &redact_password(&self.host))
            .finish()
    }
}

impl Conn {
    /// Creates a connection over HTTP with default [`ClientOptions`].
    ///
    /// `host` is the server URL, e.g. `http://localhost:8123/`. Settings
    /// such as `database` or `user` may be passed in its query string.
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Self::with_options(host, ClientOptions::default())
    }

    /// Creates a connection over HTTP with custom options.
    pub fn with_options(host: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let transport = HttpTransport::new(options)?;
        Ok(Self::with_transport(host, transport))
    }

    /// Creates a connection over any [`Transport`].
    pub fn with_transport(host: impl Into<String>, transport: impl Transport + 'static) -> Self {
        Self {
            host: host.into(),
            transport: Arc::new(transport),
        }
    }

    /// Creates a connection from environment variables.
    ///
    /// Reads:
    /// - `CLICKHOUSE_URL` — server URL (required)
    /// - `CLICKHOUSE_TIMEOUT_MS` — request timeout in milliseconds (optional)
    pub fn from_env() -> std::result::Result<Self, String> {
        let host = std::env::var("CLICKHOUSE_URL")
            .map_err(|_| "missing CLICKHOUSE_URL environment variable".to_owned())?;
        if host.trim().is_empty() {
            return Err("CLICKHOUSE_URL is set but empty".to_owned());
        }

        let mut options = ClientOptions::default();
        if let Ok(timeout) = std::env::var("CLICKHOUSE_TIMEOUT_MS") {
            options.timeout_ms = timeout
                .trim()
                .parse()
                .map_err(|err| format!("invalid CLICKHOUSE_TIMEOUT_MS '{timeout}': {err}"))?;
        }

        Self::with_options(host.trim(), options).map_err(|err| err.to_string())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Runs a statement and discards the response body.
    pub fn exec(&self, stmt: Statement) -> Result<()> {
        self.transport.exec(&self.host, stmt, false)?;
        Ok(())
    }

    /// Runs a statement and streams its rows.
    ///
    /// Any `FORMAT` clause is replaced with `FORMAT TabSeparatedWithNames`.
    /// Failures are reported through [`Iter::error`].
    pub fn iter(&self, mut stmt: Statement) -> Iter {
        stmt.sql = force_stream_format(&stmt.sql);
        match self.transport.exec(&self.host, stmt, false) {
            Ok(body) => Iter::new(body),
            Err(err) => Iter::failed(err),
        }
    }

    /// Checks that the server is reachable and healthy.
    pub fn ping(&self) -> Result<()> {
        let mut body = self.transport.exec(&self.host, Statement::new("", ()), true)?;
        let mut raw = Vec::new();
        body.read_to_end(&mut raw)?;
        drop(body);
        let response = String::from_utf8_lossy(&raw).into_owned();

        #[cfg(feature = "tracing")]
        tracing::debug!(host = %redact_password(&self.host), %response, "ping response");

        if !response.contains(PING_OK) {
            return Err(ClickHouseError::Ping { response });
        }
        Ok(())
    }
}

fn redact_password(host: &str) -> String {
    match Url::parse(host) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("redacted"));
            url.to_string()
        }
        _ => host.to_owned(),
    }
}
