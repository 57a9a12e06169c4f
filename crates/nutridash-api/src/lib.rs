// nutridash-api: Async Rust client for the nutrition platform admin backend

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod request;
pub mod transport;

pub use auth::{MemoryTokenStore, TokenPair, TokenStore};
pub use client::ApiClient;
pub use error::Error;
pub use models::{Envelope, Item, Page};
pub use request::ApiRequest;
pub use transport::{TlsMode, TransportConfig};
