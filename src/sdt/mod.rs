//! Structured-data (SDT) values and their binary container codec
//!
//! An SDT value is a tagged tree of scalars and one level of nested
//! collections. [`dumps`] and [`loads`] are the codec entry points used for
//! message payloads; they are independent of any client or session.

mod codec;
mod value;

pub use codec::{decode, dumps, encode, loads};
pub use value::Value;
