//! Session lifecycle: who is logged in, and with what token.
//!
//! [`SessionStore`] owns the five session fields and their persistence,
//! [`SessionMonitor`] runs the periodic refresh-or-logout check, and
//! [`SessionEvents`] broadcasts the two lifecycle transitions the rest of
//! the app reacts to.

mod events;
mod monitor;
mod refresh;
mod store;

pub use events::{SessionEvent, SessionEvents};
pub use monitor::{SessionMonitor, DEFAULT_MONITOR_INTERVAL};
pub use refresh::{HttpTokenRefresher, RefreshedTokens, StaticRefresher, TokenRefresher};
pub use store::{SessionStore, UserProfile, REFRESH_THRESHOLD_SECS, SESSION_SERVICE};
