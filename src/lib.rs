//! Reactive state primitives: observable cells, a key/value store and a helper
//! that listens to many cells at once, plus the HTTP glue used to host them.

pub mod global;
pub mod listeners;
pub mod server;
pub mod state;

pub type Result<T> = anyhow::Result<T>;

pub use global::{CONFIG_KEY, GlobalStore, GlobalStoreSnapshot, SharedStore, Value};
pub use listeners::Listeners;
pub use server::{
    GlueServer, Handler, IncomingRequest, PassThrough, ServerConfig, serve,
    serve_requests,
};
pub use state::{Callback, Detach, State, WeakState};
