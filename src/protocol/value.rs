//! Cell values carried in result-set rows.
//!
//! Each row travels as one [`FieldId::Row`](super::FieldId::Row) parameter
//! whose bytes are the bincode encoding of a `Vec<Value>`.

use std::fmt;

use bincode::{Decode, Encode, config};

use super::FrameError;

/// A single cell of a result-set row.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// UTF-8 string.
    Str(String),
}

/// One row of a result set, ordered as the column names.
pub type Row = Vec<Value>;

fn row_config() -> impl config::Config {
    config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}

/// Encode a row into its parameter bytes.
///
/// # Errors
/// Returns [`FrameError::Row`] if bincode rejects the row.
pub fn encode_row(row: &[Value]) -> Result<Vec<u8>, FrameError> {
    bincode::encode_to_vec(row, row_config()).map_err(|e| FrameError::Row(e.to_string()))
}

/// Decode a row from its parameter bytes.
///
/// # Errors
/// Returns [`FrameError::Row`] if the bytes are not a complete encoded row.
pub fn decode_row(bytes: &[u8]) -> Result<Row, FrameError> {
    let (row, used): (Row, usize) = bincode::decode_from_slice(bytes, row_config())
        .map_err(|e| FrameError::Row(e.to_string()))?;
    if used != bytes.len() {
        return Err(FrameError::Row(format!(
            "{} trailing bytes after row",
            bytes.len() - used
        )));
    }
    Ok(row)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn decodes_mixed_row() {
        let row = vec![
            Value::Str("basketballplayer".to_owned()),
            Value::Int(10),
            Value::Null,
            Value::Bool(true),
        ];
        let bytes = encode_row(&row).expect("encode");
        assert_eq!(decode_row(&bytes).expect("decode"), row);
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::truncated(vec![0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 2])]
    fn rejects_incomplete_rows(#[case] bytes: Vec<u8>) {
        assert!(matches!(decode_row(&bytes), Err(FrameError::Row(_))));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = encode_row(&[Value::Int(1)]).expect("encode");
        bytes.push(0);
        let err = decode_row(&bytes).expect_err("trailing byte must fail");
        assert!(err.to_string().contains("trailing"), "got '{err}'");
    }

    #[rstest]
    #[case(Value::Null, "NULL")]
    #[case(Value::Int(-3), "-3")]
    #[case(Value::Str("Tim".to_owned()), "\"Tim\"")]
    fn displays_cells(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(value.to_string(), expected);
    }
}
