//! Terminal front end for the CareHub admin client.
//!
//! - [`render`]: text rendering of list snapshots and records
//! - [`browse`]: interactive paging and filtering of one list
//! - [`edit`]: command-line edits of nested forms

pub mod browse;
pub mod edit;
pub mod render;
