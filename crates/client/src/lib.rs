//! I/O layer of the CareHub admin client.
//!
//! Everything that talks to the backend or holds shared state lives here:
//!
//! - [`api`]: REST client over `reqwest`, envelope parsing and uploads
//! - [`fetcher`]: the collection-fetch seam used by list controllers
//! - [`list`]: paginated list controller with draft/applied filters
//! - [`form`]: form sessions that upload files and submit records
//! - [`session`]: authenticated session context and idle logout
//! - [`config`]: environment-driven configuration

pub mod api;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod form;
pub mod list;
pub mod session;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::ClientError;
