//! RESP reply types and their wire encoding.
//!
//! Requests arrive as arrays of bulk strings and are decoded by the frame
//! reader in [`crate::input`]. Replies are built as [`RespValue`] trees and
//! rendered with [`RespValue::encode`]; every terminator is an exact `\r\n`.

/// A single RESP value.
///
/// `NullBulkString` encodes as `$-1\r\n` and `NullArray` as `*-1\r\n`; both
/// are distinct from an empty bulk string or an empty array.
#[derive(Debug, PartialEq, Clone)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(String),
    NullBulkString,
    Array(Vec<RespValue>),
    NullArray,
}

impl RespValue {
    /// Renders the value as RESP wire bytes.
    pub fn encode(&self) -> String {
        match self {
            RespValue::SimpleString(s) => format!("+{}\r\n", s),
            RespValue::Error(msg) => format!("-{}\r\n", msg),
            RespValue::Integer(n) => format!(":{}\r\n", n),
            RespValue::BulkString(s) => format!("${}\r\n{}\r\n", s.len(), s),
            RespValue::NullBulkString => "$-1\r\n".to_string(),
            RespValue::Array(elements) => {
                let mut encoded = format!("*{}\r\n", elements.len());
                for element in elements {
                    encoded.push_str(&element.encode());
                }
                encoded
            }
            RespValue::NullArray => "*-1\r\n".to_string(),
        }
    }

    /// Encodes a list of strings as an array of bulk strings.
    pub fn encode_array_from_strings(values: Vec<String>) -> String {
        RespValue::Array(values.into_iter().map(RespValue::BulkString).collect()).encode()
    }
}
