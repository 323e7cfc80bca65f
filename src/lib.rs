//! `clickhouse-http` is a blocking client for ClickHouse's HTTP interface.
//!
//! Statements are sent with positional `?` arguments rendered as literals.
//! Results are streamed line by line in `TabSeparatedWithNames` format:
//! - [`Conn::exec`] runs a statement and discards its output
//! - [`Conn::iter`] streams rows into typed targets through [`Iter::scan`]
//! - [`Conn::ping`] checks server health
//!
//! ```no_run
//! use clickhouse_http::{Conn, Statement};
//!
//! # fn main() -> clickhouse_http::Result<()> {
//! let conn = Conn::new("http://localhost:8123/")?;
//! let mut iter = conn.iter(Statement::new("SELECT number, toString(number) FROM numbers(?)", [3]));
//! let (mut n, mut s) = (0u64, String::new());
//! while iter.scan(&mut [&mut n, &mut s]) {
//!     println!("{n} {s}");
//! }
//! if let Some(err) = iter.into_error() {
//!     return Err(err);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod decode;
mod error;
mod iter;
mod options;
mod params;
mod pool;
mod transport;
mod value;
mod wire;

pub use client::Conn;
pub use decode::Unmarshal;
pub use error::ClickHouseError;
pub use iter::Iter;
pub use options::ClientOptions;
pub use params::{External, Params, Statement};
pub use pool::{BufferPool, PooledBuffer};
pub use transport::{HttpTransport, ResponseBody, Transport};
pub use value::Value;

pub type Result<T> = std::result::Result<T, ClickHouseError>;
