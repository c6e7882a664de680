//! wrap-proxy: presents several upstream addons to a client as one addon.
//!
//! A client's user data lists its upstreams in order. Ids handed to the
//! client carry the upstream index (see [`id`]); every resource request is
//! decoded, routed to that upstream and relayed back unchanged.

pub mod anilist;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod id;
pub mod manifest;
pub mod proxy;
pub mod resource;
pub mod server;
pub mod stats;
pub mod userdata;

pub use config::ProxyConfig;
pub use error::WrapError;
pub use server::{router, AppState};
