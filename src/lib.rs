//! Client core for the BlueBoxy companion app.
//!
//! Everything the app trusts locally while the backend is slow or
//! unreachable lives here:
//!
//! - [`cache`]: the tiered response cache (memory + disk, with hybrid
//!   promotion)
//! - [`loadable`]: the four-state wrapper every asynchronous fetch is
//!   rendered through
//! - [`session`]: the authenticated-session store, its background
//!   validity monitor, and the login/logout event stream
//! - [`store`]: secure (keychain) and general (SQLite) persistence
//!
//! The app's composition root constructs one [`cache::CacheManager`] and
//! one [`session::SessionStore`] and injects them wherever needed; nothing
//! in this crate is a global.

pub mod cache;
pub mod config;
pub mod error;
pub mod loadable;
pub mod location;
pub mod session;
pub mod store;

pub use error::{Error, Result};
pub use loadable::Loadable;
