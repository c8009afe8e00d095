//! Request construction and response interpretation for the store API.
//!
//! # Design
//! [`StoreClient`] pairs an immutable [`Schema`] and endpoint paths with two
//! small locked cells: the connection configuration and the current session.
//! Every operation is split in half. A `build_*` method snapshots the
//! configuration once and produces an [`HttpRequest`]; a `parse_*` method
//! consumes an [`HttpResponse`] and yields the operation's result. Neither
//! half performs I/O, so both are exercised directly in tests with canned
//! data. The async methods in [`crate::ops`] tie the halves together over an
//! injected transport.

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

use crate::error::{error_message, ApiError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::schema::{EntityRole, Schema};
use crate::types::{Credentials, FunctionResponse, JsonObject, Session};

const AUTHORIZATION: &str = "authorization";
const CONTENT_TYPE: &str = "content-type";
const CONTENT_TYPE_JSON: &str = "application/json";

/// Mutable connection settings, guarded by one lock so every request is
/// built from a single consistent snapshot.
#[derive(Debug, Clone, Default)]
struct ClientConfig {
    server_address: Option<String>,
    credentials: Option<Credentials>,
    pretty_print: bool,
}

/// Everything a resource request needs, captured in one read of the
/// configuration and one read of the session cell.
struct RequestContext {
    base_url: String,
    pretty_print: bool,
    token: Option<String>,
}

impl RequestContext {
    fn headers(&self, has_body: bool) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(token) = &self.token {
            headers.push((AUTHORIZATION.to_string(), format!("Bearer {token}")));
        }
        if has_body {
            headers.push((CONTENT_TYPE.to_string(), CONTENT_TYPE_JSON.to_string()));
        }
        headers
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    #[serde(rename = "clientID")]
    client_id: u64,
    #[serde(rename = "clientSecret")]
    client_secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    resource: &'a str,
    parameters: &'a JsonObject,
}

/// A client for a schema-driven resource store.
///
/// The client is cheap to share behind a reference: all methods take
/// `&self`, and configuration changes from one thread are picked up by
/// requests built on another. The session established by a successful login
/// is stored on the client and attached as a bearer token to every
/// subsequent request.
pub struct StoreClient {
    schema: Schema,
    login_path: String,
    search_path: String,
    config: RwLock<ClientConfig>,
    session: RwLock<Option<Session>>,
}

impl StoreClient {
    /// Creates a client for the given schema. `login_path` and `search_path`
    /// locate the two non-resource endpoints on the server.
    pub fn new(
        schema: Schema,
        login_path: impl Into<String>,
        search_path: impl Into<String>,
    ) -> Self {
        Self {
            schema,
            login_path: login_path.into(),
            search_path: search_path.into(),
            config: RwLock::new(ClientConfig::default()),
            session: RwLock::new(None),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn search_path(&self) -> &str {
        &self.search_path
    }

    pub fn server_address(&self) -> Option<String> {
        self.config.read().server_address.clone()
    }

    /// Sets the base URL of the server, e.g. `http://localhost:3000`.
    pub fn set_server_address(&self, address: impl Into<String>) {
        self.config.write().server_address = Some(address.into());
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.config.read().credentials.clone()
    }

    pub fn set_credentials(&self, credentials: Option<Credentials>) {
        self.config.write().credentials = credentials;
    }

    pub fn pretty_print(&self) -> bool {
        self.config.read().pretty_print
    }

    /// When set, request bodies are encoded with indentation. Useful when
    /// inspecting traffic; the wire semantics are unchanged.
    pub fn set_pretty_print(&self, pretty_print: bool) {
        self.config.write().pretty_print = pretty_print;
    }

    /// The current session, if any.
    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// Replaces the session in one step. Passing a previously persisted
    /// session restores it without a new login; passing `None` logs out
    /// locally.
    pub fn set_session(&self, session: Option<Session>) {
        *self.session.write() = session;
    }

    /// Builds the login request from the configured credentials.
    ///
    /// Login is the one request that never carries a session token.
    pub fn build_login(&self) -> Result<HttpRequest, ApiError> {
        self.login_parts().map(|(request, _)| request)
    }

    /// Builds the login request and remembers, from the same configuration
    /// snapshot, whether the response must name a user.
    pub(crate) fn login_parts(&self) -> Result<(HttpRequest, bool), ApiError> {
        let config = self.config.read();
        let address = config
            .server_address
            .as_deref()
            .ok_or(ApiError::MissingConfiguration("server address"))?;
        let credentials = config
            .credentials
            .as_ref()
            .ok_or(ApiError::MissingConfiguration("credentials"))?;
        let body = LoginBody {
            client_id: credentials.client_id,
            client_secret: &credentials.client_secret,
            username: credentials.user.as_ref().map(|user| user.username.as_str()),
            password: credentials.user.as_ref().map(|user| user.password.as_str()),
        };
        let expects_user_id = credentials.user.is_some();
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: join_url(address, &self.login_path),
            headers: vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_JSON.to_string())],
            body: Some(encode(&body, config.pretty_print)?),
        };
        Ok((request, expects_user_id))
    }

    /// Interprets a login response. `expects_user_id` is the flag returned
    /// by [`login_parts`](Self::login_parts): when user credentials were
    /// sent, the response must name the user's resource id.
    ///
    /// The session is not stored here; parsing is pure. Store the result
    /// with [`set_session`](Self::set_session) once the whole exchange
    /// succeeded.
    pub fn parse_login(
        &self,
        response: HttpResponse,
        expects_user_id: bool,
    ) -> Result<Session, ApiError> {
        check_login_status(&response)?;
        let value: Value = serde_json::from_str(&response.body).map_err(|err| {
            ApiError::InvalidServerResponse(format!("login response is not valid JSON: {err}"))
        })?;
        let token = value
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ApiError::InvalidServerResponse(
                    "login response is missing the session token".to_string(),
                )
            })?
            .to_string();
        let user_id = if expects_user_id {
            let id = value.get("userID").and_then(Value::as_u64).ok_or_else(|| {
                ApiError::InvalidServerResponse(
                    "login response is missing the user resource id".to_string(),
                )
            })?;
            Some(id)
        } else {
            None
        };
        Ok(Session { token, user_id })
    }

    /// Builds a search for instances of `resource` matching `parameters`.
    ///
    /// Entities the schema marks unsearchable are rejected locally, as is
    /// the session entity. Names the schema does not know are forwarded
    /// unchanged; the server is the authority on what exists.
    pub fn build_search(
        &self,
        resource: &str,
        parameters: &JsonObject,
    ) -> Result<HttpRequest, ApiError> {
        if let Some(entity) = self.schema.entity(resource) {
            if entity.role() == Some(EntityRole::Session) {
                return Err(ApiError::InvalidRequest(format!(
                    "the session entity {resource:?} cannot be searched"
                )));
            }
            if !entity.searchable() {
                return Err(ApiError::InvalidRequest(format!(
                    "entity {resource:?} does not support search"
                )));
            }
        }
        let ctx = self.request_context()?;
        let body = SearchBody { resource, parameters };
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: join_url(&ctx.base_url, &self.search_path),
            headers: ctx.headers(true),
            body: Some(encode(&body, ctx.pretty_print)?),
        })
    }

    /// Interprets a search response: a JSON array of matches, in the order
    /// the server returned them.
    pub fn parse_search(&self, response: HttpResponse) -> Result<Vec<Value>, ApiError> {
        check_status(&response)?;
        serde_json::from_str(&response.body).map_err(|err| {
            ApiError::InvalidServerResponse(format!("search response is not a JSON array: {err}"))
        })
    }

    /// Builds a fetch of one resource instance.
    pub fn build_get(&self, resource: &str, id: u64) -> Result<HttpRequest, ApiError> {
        let ctx = self.request_context()?;
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/{resource}/{id}", ctx.base_url),
            headers: ctx.headers(false),
            body: None,
        })
    }

    /// Interprets a fetch response: the instance's values as a JSON object.
    pub fn parse_get(&self, response: HttpResponse) -> Result<JsonObject, ApiError> {
        check_status(&response)?;
        serde_json::from_str(&response.body).map_err(|err| {
            ApiError::InvalidServerResponse(format!(
                "resource representation is not a JSON object: {err}"
            ))
        })
    }

    /// Builds an edit applying `changes` to one resource instance.
    pub fn build_edit(
        &self,
        resource: &str,
        id: u64,
        changes: &JsonObject,
    ) -> Result<HttpRequest, ApiError> {
        let ctx = self.request_context()?;
        Ok(HttpRequest {
            method: HttpMethod::Put,
            url: format!("{}/{resource}/{id}", ctx.base_url),
            headers: ctx.headers(true),
            body: Some(encode(changes, ctx.pretty_print)?),
        })
    }

    /// Interprets an edit response. The body, if any, is ignored; success
    /// means the changes were applied.
    pub fn parse_edit(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    /// Builds a deletion of one resource instance.
    pub fn build_delete(&self, resource: &str, id: u64) -> Result<HttpRequest, ApiError> {
        let ctx = self.request_context()?;
        Ok(HttpRequest {
            method: HttpMethod::Delete,
            url: format!("{}/{resource}/{id}", ctx.base_url),
            headers: ctx.headers(false),
            body: None,
        })
    }

    /// Interprets a deletion response. Deleting an already-deleted instance
    /// surfaces as [`ApiError::NotFound`].
    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    /// Builds a creation of a new `resource` instance with `initial_values`.
    pub fn build_create(
        &self,
        resource: &str,
        initial_values: &JsonObject,
    ) -> Result<HttpRequest, ApiError> {
        let ctx = self.request_context()?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/{resource}", ctx.base_url),
            headers: ctx.headers(true),
            body: Some(encode(initial_values, ctx.pretty_print)?),
        })
    }

    /// Interprets a creation response: the id assigned to the new instance.
    pub fn parse_create(&self, response: HttpResponse) -> Result<u64, ApiError> {
        check_status(&response)?;
        let value: Value = serde_json::from_str(&response.body).map_err(|err| {
            ApiError::InvalidServerResponse(format!("create response is not valid JSON: {err}"))
        })?;
        value.get("id").and_then(Value::as_u64).ok_or_else(|| {
            ApiError::InvalidServerResponse(
                "create response is missing the new resource id".to_string(),
            )
        })
    }

    /// Builds an invocation of a named server-side function on one resource
    /// instance, with an optional JSON payload.
    pub fn build_function(
        &self,
        resource: &str,
        id: u64,
        function: &str,
        payload: Option<&JsonObject>,
    ) -> Result<HttpRequest, ApiError> {
        let ctx = self.request_context()?;
        let body = payload
            .map(|payload| encode(payload, ctx.pretty_print))
            .transpose()?;
        let has_body = body.is_some();
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/{resource}/{id}/{function}", ctx.base_url),
            headers: ctx.headers(has_body),
            body,
        })
    }

    /// Interprets a function response. The status is handed back untouched;
    /// only an unparseable body is an error.
    pub fn parse_function(&self, response: HttpResponse) -> Result<FunctionResponse, ApiError> {
        let body = if response.body.trim().is_empty() {
            None
        } else {
            let value = serde_json::from_str(&response.body).map_err(|err| {
                ApiError::InvalidServerResponse(format!(
                    "function response is not valid JSON: {err}"
                ))
            })?;
            Some(value)
        };
        Ok(FunctionResponse { status: response.status, body })
    }

    fn request_context(&self) -> Result<RequestContext, ApiError> {
        let (base_url, pretty_print) = {
            let config = self.config.read();
            let address = config
                .server_address
                .as_deref()
                .ok_or(ApiError::MissingConfiguration("server address"))?;
            (address.trim_end_matches('/').to_string(), config.pretty_print)
        };
        let token = self.session.read().as_ref().map(|session| session.token.clone());
        Ok(RequestContext { base_url, pretty_print, token })
    }
}

fn join_url(address: &str, path: &str) -> String {
    format!(
        "{}/{}",
        address.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn encode<T: Serialize>(body: &T, pretty_print: bool) -> Result<String, ApiError> {
    let encoded = if pretty_print {
        serde_json::to_string_pretty(body)
    } else {
        serde_json::to_string(body)
    };
    encoded.map_err(ApiError::Serialization)
}

fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(status_error(response))
    }
}

/// Login gets its own status mapping: the server answers 401 or 403 for bad
/// credentials, and neither should surface as a session problem.
fn check_login_status(response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        _ if response.is_success() => Ok(()),
        401 | 403 => Err(ApiError::LoginFailed),
        _ => Err(status_error(response)),
    }
}

fn status_error(response: &HttpResponse) -> ApiError {
    let message = error_message(&response.body);
    match response.status {
        401 => ApiError::Unauthorized,
        403 => ApiError::Forbidden,
        404 => ApiError::NotFound,
        status @ 400..=499 => ApiError::BadRequest { status, message },
        status @ 500..=599 => ApiError::ServerInternalError { status, message },
        status => {
            ApiError::InvalidServerResponse(format!("unexpected status {status}"))
        }
    }
}
