//! XML agent sub-protocol: request framing, response trees and
//! classification of what the device sent back.

mod classify;
mod element;
mod request;

pub use classify::classify;
pub use element::Element;
pub use request::{
    COMMENT_MAX_CHARS, CONFIRMED_MAX, CONFIRMED_MIN, CommitOptions, ENVELOPE_CLOSE, ENVELOPE_OPEN,
    RequestKind, RpcRequest, escape_attr, escape_text,
};
