// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod batch;
pub mod scenario;

pub use batch::analyze_batch;
pub use scenario::analyze;
