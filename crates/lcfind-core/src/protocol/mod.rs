//! Protocol module containing the typed message kinds and the text codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_message, encode_message, DecodeError};
pub use messages::*;
