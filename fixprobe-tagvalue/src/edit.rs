/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Operator edit expressions.
//!
//! | Expression      | Effect                                      |
//! |-----------------|---------------------------------------------|
//! | `55=TEST`       | set tag 55, appending it before 10 if absent |
//! | `+13:44=70.00`  | insert tag 44 at field index 13             |
//! | `-44`           | remove every tag 44                         |

use crate::codec::WireCodec;
use crate::decoder::parse_tag;
use fixprobe_core::error::DecodeError;
use std::str::FromStr;

/// A single field edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    /// Set or add a field.
    Set {
        /// Tag to set.
        tag: u32,
        /// New value.
        value: String,
    },
    /// Insert a field at a zero-based index.
    Insert {
        /// Target field index.
        position: usize,
        /// Tag to insert.
        tag: u32,
        /// Value to insert.
        value: String,
    },
    /// Remove every occurrence of a tag.
    Remove {
        /// Tag to remove.
        tag: u32,
    },
}

impl EditOp {
    /// Applies the edit to `raw`.
    #[must_use]
    pub fn apply(&self, codec: &WireCodec, raw: &str) -> String {
        match self {
            Self::Set { tag, value } => codec.upsert_field(raw, *tag, value),
            Self::Insert {
                position,
                tag,
                value,
            } => codec.insert_field(raw, *position, *tag, value),
            Self::Remove { tag } => codec.remove_field(raw, *tag),
        }
    }
}

fn tag_of(text: &str, expr: &str) -> Result<u32, DecodeError> {
    parse_tag(text.trim().as_bytes()).ok_or_else(|| DecodeError::InvalidEdit(expr.to_string()))
}

impl FromStr for EditOp {
    type Err = DecodeError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let invalid = || DecodeError::InvalidEdit(expr.to_string());
        if let Some(rest) = expr.strip_prefix('-') {
            return Ok(Self::Remove {
                tag: tag_of(rest, expr)?,
            });
        }
        if let Some(rest) = expr.strip_prefix('+') {
            let (position, field) = rest.split_once(':').ok_or_else(invalid)?;
            let (tag, value) = field.split_once('=').ok_or_else(invalid)?;
            return Ok(Self::Insert {
                position: position.trim().parse().map_err(|_| invalid())?,
                tag: tag_of(tag, expr)?,
                value: value.to_string(),
            });
        }
        let (tag, value) = expr.split_once('=').ok_or_else(invalid)?;
        Ok(Self::Set {
            tag: tag_of(tag, expr)?,
            value: value.to_string(),
        })
    }
}

/// Parses and applies a sequence of edit expressions in order.
///
/// # Errors
/// Returns `DecodeError::InvalidEdit` for the first expression that does not
/// parse; no edits are applied in that case.
pub fn apply_edits<'e>(
    codec: &WireCodec,
    raw: &str,
    exprs: impl IntoIterator<Item = &'e str>,
) -> Result<String, DecodeError> {
    let ops = exprs
        .into_iter()
        .map(str::parse::<EditOp>)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ops
        .iter()
        .fold(raw.to_string(), |message, op| op.apply(codec, &message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit_ops() {
        assert_eq!(
            "55=TEST".parse::<EditOp>().unwrap(),
            EditOp::Set {
                tag: 55,
                value: "TEST".to_string()
            }
        );
        assert_eq!(
            "+13:44=70.00".parse::<EditOp>().unwrap(),
            EditOp::Insert {
                position: 13,
                tag: 44,
                value: "70.00".to_string()
            }
        );
        assert_eq!("-44".parse::<EditOp>().unwrap(), EditOp::Remove { tag: 44 });
    }

    #[test]
    fn test_parse_invalid_edit() {
        for expr in ["55", "+x:44=1", "+3", "-abc", "=1"] {
            assert!(matches!(
                expr.parse::<EditOp>(),
                Err(DecodeError::InvalidEdit(_))
            ));
        }
    }

    #[test]
    fn test_apply_edits_in_order() {
        let codec = WireCodec::default();
        let raw = "8=FIX.4.2|9=5|35=D|44=1|10=000|";
        let edited = apply_edits(&codec, raw, ["55=TEST", "-44", "+3:58=hi"]).unwrap();
        assert_eq!(edited, "8=FIX.4.2|9=5|35=D|58=hi|55=TEST|10=000|");
    }

    #[test]
    fn test_apply_edits_rejects_all_on_error() {
        let codec = WireCodec::default();
        assert!(apply_edits(&codec, "35=D|", ["55=X", "bad"]).is_err());
    }
}
