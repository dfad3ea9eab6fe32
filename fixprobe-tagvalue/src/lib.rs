/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixprobe Tag-Value
//!
//! Raw FIX tag=value handling for the fixprobe toolkit.
//!
//! Unlike a conformant engine codec, everything here tolerates broken input:
//! messages may lack header or trailer fields, carry bogus BodyLength and
//! CheckSum values or use a printable delimiter in place of SOH.
//!
//! ## Features
//!
//! - **Field editing**: get, set, insert, remove and operator edit expressions
//! - **Derived fields**: BodyLength, CheckSum and MsgSeqNum refresh
//! - **Byte safety**: latin-1 conversion so arbitrary bytes round-trip
//! - **Validation**: `memchr`-based decoder with one-shot self-repair

pub mod checksum;
pub mod codec;
pub mod decoder;
pub mod edit;
pub mod encoder;
pub mod encoding;

pub use checksum::{calculate_checksum, compute_checksum, standard_checksum};
pub use codec::{DEFAULT_PRINTABLE_DELIMITER, RawField, RawMessage, SOH_CHAR, WireCodec};
pub use decoder::{DecodedMessage, Decoder, ValidatedMessage, validate};
pub use edit::{EditOp, apply_edits};
pub use encoder::Encoder;
pub use encoding::{bytes_to_ascii, escape_binary, to_wire_bytes, unescape};
