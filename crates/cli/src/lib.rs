//! Library half of the `doc-classifier` binary: upload helpers and text
//! rendering, kept here so they can be tested without a process.
pub mod render;
pub mod uploads;
