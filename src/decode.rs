use std::str::FromStr;

use crate::ClickHouseError;

/// Null marker used by the TabSeparated formats.
const NULL_FIELD: &[u8] = b"\\N";

/// A scan target: decodes one raw TabSeparated field into `self`.
///
/// Fields arrive as the exact bytes the server wrote, still escaped.
/// The trait is object safe so heterogeneous targets can be passed to
/// [`Iter::scan`](crate::Iter::scan) as `&mut [&mut dyn Unmarshal]`.
pub trait Unmarshal {
    fn unmarshal(&mut self, field: &[u8]) -> Result<(), ClickHouseError>;
}

impl Unmarshal for String {
    fn unmarshal(&mut self, field: &[u8]) -> Result<(), ClickHouseError> {
        *self = String::from_utf8(unescape(field))
            .map_err(|err| ClickHouseError::Decode(format!("invalid utf-8 in text field: {err}")))?;
        Ok(())
    }
}

impl Unmarshal for Vec<u8> {
    fn unmarshal(&mut self, field: &[u8]) -> Result<(), ClickHouseError> {
        *self = unescape(field);
        Ok(())
    }
}

impl Unmarshal for bool {
    fn unmarshal(&mut self, field: &[u8]) -> Result<(), ClickHouseError> {
        *self = match field {
            b"1" | b"true" => true,
            b"0" | b"false" => false,
            other => {
                return Err(ClickHouseError::Decode(format!(
                    "invalid bool value '{}'",
                    String::from_utf8_lossy(other)
                )))
            }
        };
        Ok(())
    }
}

macro_rules! impl_unmarshal_int {
    ($($ty:ty),*) => {
        $(impl Unmarshal for $ty {
            fn unmarshal(&mut self, field: &[u8]) -> Result<(), ClickHouseError> {
                *self = parse(field, "integer")?;
                Ok(())
            }
        })*
    };
}

impl_unmarshal_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl Unmarshal for f32 {
    fn unmarshal(&mut self, field: &[u8]) -> Result<(), ClickHouseError> {
        *self = parse_float(field)? as f32;
        Ok(())
    }
}

impl Unmarshal for f64 {
    fn unmarshal(&mut self, field: &[u8]) -> Result<(), ClickHouseError> {
        *self = parse_float(field)?;
        Ok(())
    }
}

impl<T: Unmarshal + Default> Unmarshal for Option<T> {
    fn unmarshal(&mut self, field: &[u8]) -> Result<(), ClickHouseError> {
        if field == NULL_FIELD {
            *self = None;
            return Ok(());
        }
        let mut value = T::default();
        value.unmarshal(field)?;
        *self = Some(value);
        Ok(())
    }
}

/// Numeric and boolean fields are plain ASCII; anything else is a decode error.
fn text<'a>(field: &'a [u8], label: &str) -> Result<&'a str, ClickHouseError> {
    std::str::from_utf8(field).map_err(|err| {
        ClickHouseError::Decode(format!("invalid utf-8 in {label} field: {err}"))
    })
}

fn parse<T>(field: &[u8], label: &str) -> Result<T, ClickHouseError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let field = text(field, label)?;
    field
        .parse::<T>()
        .map_err(|err| ClickHouseError::Decode(format!("invalid {label} value '{field}': {err}")))
}

// The server writes non-finite floats as `nan`, `inf` and `-inf`.
fn parse_float(field: &[u8]) -> Result<f64, ClickHouseError> {
    match field {
        b"nan" | b"-nan" => Ok(f64::NAN),
        b"inf" | b"+inf" => Ok(f64::INFINITY),
        b"-inf" => Ok(f64::NEG_INFINITY),
        _ => parse(field, "float"),
    }
}

/// Reverses TabSeparated escaping of a single field.
pub(crate) fn unescape(field: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(field.len());
    let mut bytes = field.iter().copied();
    while let Some(byte) = bytes.next() {
        if byte != b'\\' {
            out.push(byte);
            continue;
        }
        match bytes.next() {
            Some(b't') => out.push(b'\t'),
            Some(b'n') => out.push(b'\n'),
            Some(b'r') => out.push(b'\r'),
            Some(b'0') => out.push(0),
            Some(b'b') => out.push(0x08),
            Some(b'f') => out.push(0x0C),
            Some(other) => out.push(other),
            None => out.push(b'\\'),
        }
    }
    out
}
