// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Shared data types for devtest.
//!
//! These types are used both by the harness itself and by supervising processes that read
//! `devtest list --message-format json` output or the line-oriented progress protocol.

mod errors;
mod exit_codes;
mod identifier;
mod test_list;

pub use errors::*;
pub use exit_codes::*;
pub use identifier::*;
pub use test_list::*;
