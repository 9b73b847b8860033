//! CareHub domain core.
//!
//! Everything in this crate is pure state and data shaping: no network,
//! no storage, no clocks beyond dates passed in by the caller. The
//! `carehub-client` crate wires these pieces to the REST API.
//!
//! - [`query`] - collection query / page / pagination types.
//! - [`filters`] - filter schemas and the draft/applied filter holder.
//! - [`resources`] - catalogue of list screens and their wire models.
//! - [`forms`] - schema-driven nested form controller.
//! - [`upload`] - per-file upload slot lifecycle.
//! - [`routes`] - admin route table and auth guard.
//! - [`profile`] - profile and password forms.

pub mod error;
pub mod filters;
pub mod forms;
pub mod profile;
pub mod query;
pub mod resources;
pub mod routes;
pub mod types;
pub mod upload;
