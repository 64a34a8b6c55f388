// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host-side test selection and dispatch for device test modules.
//!
//! `devtest` reads a test universe, selects tests with include and exclude filters, and hands
//! each selected test to an external executor one at a time. Results are reported on stdout
//! using a line-oriented progress protocol, as human-readable status lines, or as JUnit XML.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter};
