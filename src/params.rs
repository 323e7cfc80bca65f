use std::fmt;
use std::io::Read;

use crate::{ClickHouseError, Conn, Iter, Result, Value};

/// Positional values mapped to `?` placeholders, in order of appearance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params(pub Vec<Value>);

impl Params {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl<T: Into<Value>> From<Vec<T>> for Params {
    fn from(values: Vec<T>) -> Self {
        Self(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Params {
    fn from(values: [T; N]) -> Self {
        Self(values.into_iter().map(Into::into).collect())
    }
}

/// Ephemeral table uploaded with a statement and dropped by the server
/// once that statement finishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct External {
    /// Table name as referenced from the statement.
    pub name: String,
    /// Column declaration, e.g. `id UInt32, name String`.
    pub structure: String,
    /// Table contents in TabSeparated format.
    pub data: Vec<u8>,
}

/// A statement template plus everything sent along with it.
///
/// Executing a statement consumes it, since a raw body can only be read
/// once. To run the same statement again, copy it first with
/// [`Statement::try_clone`], or build a new one when it carries a body.
pub struct Statement {
    /// SQL text with `?` placeholders.
    pub sql: String,
    pub(crate) args: Params,
    pub(crate) externals: Vec<External>,
    pub(crate) body: Option<Box<dyn Read + Send>>,
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("args", &self.args)
            .field("externals", &self.externals)
            .field("body", &self.body.as_ref().map(|_| "<reader>"))
            .finish()
    }
}

impl Statement {
    pub fn new<P: Into<Params>>(sql: impl Into<String>, args: P) -> Self {
        Self {
            sql: sql.into(),
            args: args.into(),
            externals: Vec::new(),
            body: None,
        }
    }

    /// Attaches an external table available to this statement only.
    pub fn add_external(
        &mut self,
        name: impl Into<String>,
        structure: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) {
        self.externals.push(External {
            name: name.into(),
            structure: structure.into(),
            data: data.into(),
        });
    }

    /// Builder form of [`Statement::add_external`].
    pub fn with_external(
        mut self,
        name: impl Into<String>,
        structure: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.add_external(name, structure, data);
        self
    }

    /// Sends `body` verbatim as the request body, e.g. rows for an
    /// `INSERT ... FORMAT TabSeparated` statement.
    pub fn with_body(mut self, body: impl Read + Send + 'static) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    pub fn args(&self) -> &Params {
        &self.args
    }

    pub fn externals(&self) -> &[External] {
        &self.externals
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Copies the statement for another execution. Returns `None` when a
    /// raw body is attached, because the reader cannot be duplicated.
    pub fn try_clone(&self) -> Option<Self> {
        if self.body.is_some() {
            return None;
        }
        Some(Self {
            sql: self.sql.clone(),
            args: self.args.clone(),
            externals: self.externals.clone(),
            body: None,
        })
    }

    /// Runs the statement and streams its rows.
    ///
    /// Without a connection the returned iterator is already failed with
    /// [`ClickHouseError::NilConnection`].
    pub fn iter(self, conn: Option<&Conn>) -> Iter {
        match conn {
            Some(conn) => conn.iter(self),
            None => Iter::failed(ClickHouseError::NilConnection),
        }
    }

    /// Runs the statement and discards the response body.
    pub fn exec(self, conn: Option<&Conn>) -> Result<()> {
        conn.ok_or(ClickHouseError::NilConnection)?.exec(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::{ClickHouseError, Params, Statement, Value};

    #[test]
    fn params_from_array_and_vec() {
        let params: Params = [1, 2].into();
        assert_eq!(params.0, vec![Value::Int(1), Value::Int(2)]);

        let params: Params = vec![Value::text("kit"), Value::from(1.5)].into();
        assert_eq!(params.len(), 2);

        let params: Params = ().into();
        assert!(params.is_empty());
    }

    #[test]
    fn externals_accumulate_in_order() {
        let stmt = Statement::new("SELECT * FROM t1, t2", ())
            .with_external("t1", "id UInt8", "1\n")
            .with_external("t2", "id UInt8", b"2\n".to_vec());

        let names: Vec<_> = stmt.externals().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["t1", "t2"]);
        assert_eq!(stmt.externals()[0].data, b"1\n");
        assert!(!stmt.has_body());
    }

    #[test]
    fn statement_without_body_can_be_copied_for_rerun() {
        let stmt =
            Statement::new("SELECT ? FROM t", [7]).with_external("t", "id UInt8", "1\n");
        let copy = stmt.try_clone().expect("no body, copyable");
        assert_eq!(copy.sql, stmt.sql);
        assert_eq!(copy.args(), stmt.args());
        assert_eq!(copy.externals(), stmt.externals());

        let with_body = Statement::new("INSERT INTO t FORMAT TabSeparated", ())
            .with_body(std::io::Cursor::new(b"1\n".to_vec()));
        assert!(with_body.try_clone().is_none());
    }

    #[test]
    fn debug_hides_body_reader() {
        let stmt = Statement::new("INSERT INTO t FORMAT TabSeparated", ())
            .with_body(std::io::Cursor::new(b"secret\n".to_vec()));
        let debug = format!("{stmt:?}");
        assert!(debug.contains("<reader>"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn without_connection_fails_explicitly() {
        let err = Statement::new("SELECT 1", ())
            .exec(None)
            .expect_err("must fail");
        assert!(matches!(err, ClickHouseError::NilConnection));

        let mut iter = Statement::new("SELECT 1", ()).iter(None);
        let mut one = 0u8;
        assert!(!iter.scan(&mut [&mut one]));
        assert!(matches!(iter.error(), Some(ClickHouseError::NilConnection)));
        assert!(iter.columns().is_empty());
    }
}
