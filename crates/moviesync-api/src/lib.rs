// moviesync-api: Async Rust client for the movie record server (HTTP + push)

pub mod client;
pub mod error;
pub mod models;
pub mod push;
pub mod transport;

pub use client::MovieClient;
pub use error::Error;
pub use models::{Movie, PushKind, PushMessage};
pub use push::{PushHandle, ReconnectConfig, push_url_for};
pub use transport::{TlsMode, TransportConfig};
