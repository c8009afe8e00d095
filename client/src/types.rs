//! Data types crossing the client's public API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON object, used for resource values, search parameters and function
/// payloads.
pub type JsonObject = serde_json::Map<String, Value>;

/// Username and password for a user login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    pub username: String,
    pub password: String,
}

/// Credentials presented at login.
///
/// The client id and secret identify the application and are always
/// required. User credentials are optional; without them the login yields a
/// client-only session, which servers typically restrict to reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: u64,
    pub client_secret: String,
    pub user: Option<UserCredentials>,
}

impl Credentials {
    /// Credentials for a client-only session.
    pub fn client_only(client_id: u64, client_secret: impl Into<String>) -> Self {
        Self { client_id, client_secret: client_secret.into(), user: None }
    }

    /// Credentials for a user session.
    pub fn with_user(
        client_id: u64,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client_id,
            client_secret: client_secret.into(),
            user: Some(UserCredentials {
                username: username.into(),
                password: password.into(),
            }),
        }
    }
}

/// An authenticated session issued by the server.
///
/// Serializable so callers can persist a session and restore it later with
/// [`crate::StoreClient::set_session`] instead of logging in again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Token to present on authenticated requests.
    pub token: String,
    /// Identifier of the logged-in user, absent for client-only sessions.
    pub user_id: Option<u64>,
}

/// Outcome of a server-side function call.
///
/// Functions define their own status conventions, so the client hands back
/// whatever the server answered instead of mapping the status onto
/// [`crate::ApiError`].
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    /// Raw HTTP status returned by the function.
    pub status: u16,
    /// Response body, if the function returned one.
    pub body: Option<Value>,
}
