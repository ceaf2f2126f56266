// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Symmetric decode/encode of value trees against type descriptors.
//!
//! The decoder walks a descriptor and a byte stream together; the encoder is
//! its exact inverse, with field order re-derived from the descriptor so that
//! round trips are byte-exact even when a tree's node order differs from wire
//! order.

mod decode;
mod encode;

pub use decode::{Decoder, RAW_TYPE, RECORD_TYPE};
pub use encode::Encoder;
