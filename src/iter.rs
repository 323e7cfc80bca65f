use std::fmt;
use std::io::{BufRead, BufReader};

use crate::{transport::ResponseBody, ClickHouseError, Unmarshal};

const FIELD_SEPARATOR: u8 = b'\t';
const LINE_TERMINATOR: u8 = b'\n';

/// Single-pass reader over a `TabSeparatedWithNames` response.
///
/// The header line is consumed on construction and exposed through
/// [`Iter::columns`]. Each [`Iter::scan`] pulls one line. The response
/// body is released exactly once, by the read that reaches end of stream.
pub struct Iter {
    reader: Option<BufReader<ResponseBody>>,
    err: Option<ClickHouseError>,
    columns: Vec<String>,
}

impl fmt::Debug for Iter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("open", &self.reader.is_some())
            .field("err", &self.err)
            .field("columns", &self.columns)
            .finish()
    }
}

impl Iter {
    pub(crate) fn new(body: ResponseBody) -> Self {
        let mut iter = Self {
            reader: Some(BufReader::new(body)),
            err: None,
            columns: Vec::new(),
        };
        iter.columns = iter
            .fetch_next()
            .iter()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect();
        iter
    }

    pub(crate) fn failed(err: ClickHouseError) -> Self {
        Self {
            reader: None,
            err: Some(err),
            columns: Vec::new(),
        }
    }

    /// Column names from the response header.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Terminal error, if any read or decode failed.
    pub fn error(&self) -> Option<&ClickHouseError> {
        self.err.as_ref()
    }

    /// Consumes the iterator, returning its terminal error.
    pub fn into_error(self) -> Option<ClickHouseError> {
        self.err
    }

    /// Decodes the next row into `targets`, in column order.
    ///
    /// Returns `false` at end of data, after any error (see
    /// [`Iter::error`]), or when the row has fewer fields than `targets`;
    /// in the last case no target is touched. A failed field decode
    /// leaves the remaining targets unchanged.
    pub fn scan(&mut self, targets: &mut [&mut dyn Unmarshal]) -> bool {
        if self.err.is_some() {
            return false;
        }
        let row = self.fetch_next();
        if self.err.is_some() || row.is_empty() || row.len() < targets.len() {
            return false;
        }
        for (target, field) in targets.iter_mut().zip(&row) {
            if let Err(err) = target.unmarshal(field) {
                self.err = Some(err);
                return false;
            }
        }
        true
    }

    /// Returns the next row's fields, still escaped, or `None` at end of
    /// data or after an error. A field that is not valid UTF-8 is a
    /// terminal decode error; scan into `Vec<u8>` to read binary columns.
    pub fn next_row(&mut self) -> Option<Vec<String>> {
        if self.err.is_some() {
            return None;
        }
        let row = self.fetch_next();
        if self.err.is_some() || row.is_empty() {
            return None;
        }
        match row.into_iter().map(String::from_utf8).collect::<Result<Vec<_>, _>>() {
            Ok(fields) => Some(fields),
            Err(err) => {
                self.err = Some(ClickHouseError::Decode(format!(
                    "invalid utf-8 in row field: {err}"
                )));
                None
            }
        }
    }

    /// Reads one line and splits its raw bytes on tabs. An empty result
    /// means end of data; an empty line in the middle of a stream reads
    /// the same way.
    fn fetch_next(&mut self) -> Vec<Vec<u8>> {
        let Some(reader) = self.reader.as_mut() else {
            return Vec::new();
        };

        let mut line = Vec::new();
        let at_end = match reader.read_until(LINE_TERMINATOR, &mut line) {
            Ok(0) => true,
            Ok(_) => line.last() != Some(&LINE_TERMINATOR),
            Err(err) => {
                self.err = Some(ClickHouseError::Io(err));
                self.release();
                return Vec::new();
            }
        };

        if line.last() == Some(&LINE_TERMINATOR) {
            line.pop();
        }
        if at_end {
            self.release();
        }
        if line.is_empty() {
            return Vec::new();
        }

        line.split(|&byte| byte == FIELD_SEPARATOR)
            .map(<[u8]>::to_vec)
            .collect()
    }

    fn release(&mut self) {
        if self.reader.take().is_some() {
            #[cfg(feature = "tracing")]
            tracing::debug!("response stream drained, released");
        }
    }
}
