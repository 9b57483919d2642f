//! Empty-response detection for finished stream attempts.

pub mod verdict;
