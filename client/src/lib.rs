//! Client library for schema-driven resource stores.
//!
//! The server exposes named entities; this crate logs in, then creates,
//! fetches, edits, deletes and searches their instances, and invokes
//! server-side functions on them. Resource values are JSON objects, so one
//! client works against any schema without code generation.
//!
//! # Design
//! - The core is deterministic: `build_*` methods on [`StoreClient`] turn
//!   configuration into [`HttpRequest`] values and `parse_*` methods turn
//!   [`HttpResponse`] values into results, with no I/O in between.
//! - I/O happens in an injected [`Transport`]; the bundled implementation
//!   for [`reqwest::Client`] covers production, scripted transports cover
//!   tests.
//! - Async operations return a [`RequestHandle`], a future that can be
//!   canceled and then resolves with [`ApiError::Canceled`], exactly once.
//! - Every failure is an [`ApiError`] variant; errors are returned to the
//!   caller, never logged inside the library.
//!
//! # Example
//! ```no_run
//! use store_client::{Credentials, EntityDescriptor, Schema, StoreClient};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::new(vec![
//!     EntityDescriptor::session("Session"),
//!     EntityDescriptor::user("User"),
//!     EntityDescriptor::client("Client"),
//!     EntityDescriptor::resource("Post"),
//! ])?;
//! let client = StoreClient::new(schema, "/login", "/search");
//! client.set_server_address("https://store.example.com");
//! client.set_credentials(Some(Credentials::with_user(1, "abc", "alice", "secret")));
//!
//! let transport = reqwest::Client::new();
//! let session = client.login(&transport).await?;
//! println!("logged in as user {:?}", session.user_id);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod ops;
pub mod schema;
pub mod transport;
pub mod types;

pub use client::StoreClient;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use ops::RequestHandle;
pub use schema::{EntityDescriptor, EntityRole, Schema, SchemaError};
pub use transport::{Transport, TransportError};
pub use types::{Credentials, FunctionResponse, JsonObject, Session, UserCredentials};
