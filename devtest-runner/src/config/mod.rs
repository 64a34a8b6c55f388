// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for devtest.
//!
//! Configuration is read in layers: the default config embedded in devtest, then either
//! `.config/devtest.toml` under the root directory (if present) or the file passed in with
//! `--config-file`. Settings are grouped into profiles; named profiles fall back to
//! `[profile.default]` for anything they don't set.

mod executor;
mod imp;
mod junit;

pub use executor::*;
pub use imp::*;
pub use junit::*;
