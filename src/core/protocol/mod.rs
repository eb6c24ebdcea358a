// src/core/protocol/mod.rs

//! The RESP wire protocol layer shared by every Redis connection the
//! reconciler opens.

pub mod resp_frame;

pub use resp_frame::{RespCodec, RespFrame};
