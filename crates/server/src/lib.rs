//! HTTP surface of the campus lost & found service.
//!
//! Serves the four page routes (`/`, `/dashboard`, `/report-found`,
//! `/report-lost`) with the session redirect rule, and a JSON API under
//! `/api/v1` for reports, the live item feed, matching, claim
//! verification and the AI callables.
//!
//! Sessions come from HS256 identity tokens. Only campus email accounts
//! are admitted.
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod navigation;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use auth::{AccountRegistry, IdClaims, IdTokenVerifier};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use navigation::{Navigation, Page};
pub use server::{build_router, load_app_config, start_server};
pub use state::ServerState;
