use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{multipart, Body, Client, RequestBuilder, Response};
use reqwest::{header, Url};

use crate::{
    wire::{decode_error_body, encode_statement},
    BufferPool, ClickHouseError, ClientOptions, Result, Statement,
};

const PLAIN_TEXT: &str = "text/plain";

/// Successful response body, streamed to the caller unread.
pub type ResponseBody = Box<dyn Read + Send>;

/// Sends one statement to a server and returns the raw response body.
///
/// `read_only` statements are sent as `GET` requests, which the server
/// runs with `readonly` semantics.
pub trait Transport: Send + Sync {
    fn exec(&self, host: &str, stmt: Statement, read_only: bool) -> Result<ResponseBody>;
}

/// [`Transport`] over the server's HTTP interface.
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    pool: Arc<BufferPool>,
    options: ClientOptions,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("options", &self.options)
            .finish()
    }
}

impl HttpTransport {
    pub fn new(options: ClientOptions) -> Result<Self> {
        Self::with_pool(options, Arc::new(BufferPool::new()))
    }

    /// Builds a transport sharing `pool` with other transports.
    pub fn with_pool(options: ClientOptions, pool: Arc<BufferPool>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(options.timeout_ms))
            .build()
            .map_err(ClickHouseError::Transport)?;
        Ok(Self {
            http,
            pool,
            options,
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    fn build_request(&self, host: &str, stmt: Statement, read_only: bool) -> Result<RequestBuilder> {
        let sql = encode_statement(&stmt.sql, &stmt.args)?;
        let mut url = Url::parse(host).map_err(|_| ClickHouseError::InvalidHost(host.to_owned()))?;

        if read_only {
            #[cfg(feature = "tracing")]
            tracing::debug!("sending read-only GET request");
            if !sql.is_empty() {
                url.query_pairs_mut().append_pair("query", &sql);
            }
            return Ok(self.http.get(url));
        }

        if !stmt.externals.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                externals = stmt.externals.len(),
                "sending multipart request with external tables"
            );
            let mut form = multipart::Form::new();
            {
                let mut pairs = url.query_pairs_mut();
                if !sql.is_empty() {
                    pairs.append_pair("query", &sql);
                }
                for ext in stmt.externals {
                    pairs.append_pair(&format!("{}_structure", ext.name), &ext.structure);
                    let part = multipart::Part::bytes(ext.data).file_name(ext.name.clone());
                    form = form.part(ext.name, part);
                }
            }
            return Ok(self.http.post(url).multipart(form));
        }

        if let Some(body) = stmt.body {
            #[cfg(feature = "tracing")]
            tracing::debug!("sending request with raw body");
            url.query_pairs_mut().append_pair("query", &sql);
            return Ok(self.http.post(url).body(Body::new(body)));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("sending statement as request body");
        Ok(self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, PLAIN_TEXT)
            .body(sql))
    }

    fn check_status(&self, mut response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut buf = self.pool.get();
        response.read_to_end(&mut buf)?;
        let message = decode_error_body(&buf);

        #[cfg(feature = "tracing")]
        tracing::debug!(status = status.as_u16(), %message, "server returned error status");

        Err(ClickHouseError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

impl Transport for HttpTransport {
    fn exec(&self, host: &str, stmt: Statement, read_only: bool) -> Result<ResponseBody> {
        let response = self
            .build_request(host, stmt, read_only)?
            .send()
            .map_err(ClickHouseError::Transport)?;
        let response = self.check_status(response)?;
        Ok(Box::new(response))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use reqwest::Method;

    use super::HttpTransport;
    use crate::{BufferPool, ClickHouseError, ClientOptions, Statement, Value};

    fn transport() -> HttpTransport {
        HttpTransport::new(ClientOptions::default()).expect("must build transport")
    }

    #[test]
    fn transports_share_one_pool_and_keep_their_options() {
        let pool = Arc::new(BufferPool::new());
        let short = ClientOptions { timeout_ms: 250 };
        let long = ClientOptions { timeout_ms: 60_000 };
        let fast = HttpTransport::with_pool(short, Arc::clone(&pool)).expect("must build transport");
        let slow = HttpTransport::with_pool(long, Arc::clone(&pool)).expect("must build transport");

        assert_eq!(fast.options().timeout_ms, 250);
        assert_eq!(slow.options().timeout_ms, 60_000);
        assert!(Arc::ptr_eq(&fast.pool, &slow.pool));
        assert_eq!(transport().options(), &ClientOptions::default());
    }

    #[test]
    fn read_only_uses_get_with_query_parameter() {
        let req = transport()
            .build_request("http://db:8123/", Statement::new("SELECT ?", [1]), true)
            .expect("build")
            .build()
            .expect("request");

        assert_eq!(req.method(), &Method::GET);
        assert_eq!(req.url().query(), Some("query=SELECT+1"));
        assert!(req.body().is_none());
    }

    #[test]
    fn read_only_empty_statement_has_no_query() {
        let req = transport()
            .build_request("http://db:8123/", Statement::new("", ()), true)
            .expect("build")
            .build()
            .expect("request");

        assert_eq!(req.url().query(), None);
    }

    #[test]
    fn plain_statement_is_sent_as_text_body() {
        let req = transport()
            .build_request(
                "http://db:8123/",
                Statement::new("INSERT INTO t VALUES (?)", [Value::text("a b")]),
                false,
            )
            .expect("build")
            .build()
            .expect("request");

        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.url().query(), None);
        assert_eq!(
            req.headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/plain")
        );
        let body = req.body().and_then(|b| b.as_bytes()).expect("buffered body");
        assert_eq!(body, b"INSERT INTO t VALUES ('a b')");
    }

    #[test]
    fn raw_body_puts_statement_in_query_string() {
        let stmt = Statement::new("INSERT INTO t FORMAT TabSeparated", ())
            .with_body(Cursor::new(b"1\ta\n".to_vec()));
        let req = transport()
            .build_request("http://db:8123/", stmt, false)
            .expect("build")
            .build()
            .expect("request");

        assert_eq!(req.method(), &Method::POST);
        assert_eq!(
            req.url().query(),
            Some("query=INSERT+INTO+t+FORMAT+TabSeparated")
        );
        assert!(req.body().is_some());
    }

    #[test]
    fn externals_add_structure_parameters() {
        let stmt = Statement::new("SELECT * FROM t1", ())
            .with_external("t1", "id UInt8, name String", "1\tkit\n");
        let req = transport()
            .build_request("http://db:8123/", stmt, false)
            .expect("build")
            .build()
            .expect("request");

        assert_eq!(
            req.url().query(),
            Some("query=SELECT+*+FROM+t1&t1_structure=id+UInt8%2C+name+String")
        );
        let content_type = req
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .expect("content type");
        assert!(content_type.starts_with("multipart/form-data; boundary="));
    }

    #[test]
    fn argument_mismatch_fails_before_sending() {
        let err = transport()
            .build_request("http://db:8123/", Statement::new("SELECT ?", ()), false)
            .expect_err("must fail");
        assert!(matches!(err, ClickHouseError::ArgumentCountMismatch { .. }));
    }

    #[test]
    fn invalid_host_is_reported() {
        let err = transport()
            .build_request("not a url", Statement::new("SELECT 1", ()), false)
            .expect_err("must fail");
        assert!(matches!(err, ClickHouseError::InvalidHost(_)));
    }
}
