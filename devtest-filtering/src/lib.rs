// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Include/exclude filtering for devtest.
//!
//! Filters come in three forms, all of which live in the same [`FilterSet`]:
//!
//! * a fully qualified class name: `com.example.FooTest`
//! * a class and a method: `com.example.FooTest#testBar`
//! * a package name: `com.example`
//!
//! A test's package, class and `class#method` keys are each checked against the set. A key
//! matches an entry if it is equal to it, or if the entry is a prefix of the key and is
//! immediately followed by `_` in the key. The latter supports class names rewritten by jarjar,
//! which get a generated `_`-delimited suffix on their package.
//!
//! Exclusion always wins over inclusion: see [`TestFilter`].

mod args;
pub mod errors;
mod filter;
mod filter_set;

pub use args::*;
pub use filter::*;
pub use filter_set::*;
