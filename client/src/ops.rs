//! Async operation surface tying request construction to a transport.
//!
//! # Design
//! Every operation builds its request eagerly from the current
//! configuration, then returns a [`RequestHandle`] that owns the rest of the
//! exchange: deliver the request over the injected transport, interpret the
//! response, and in the case of login commit the session. The handle doubles
//! as the cancellation point. Operations on one client are independent;
//! nothing here serializes them.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{self, AbortHandle, Aborted, BoxFuture};
use futures::FutureExt;
use serde_json::Value;

use crate::client::StoreClient;
use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::{FunctionResponse, JsonObject, Session};

/// A one-shot, cancellable operation.
///
/// Awaiting the handle yields the operation's result. Aborting it, from the
/// handle itself or from a detached [`AbortHandle`], resolves the operation
/// with [`ApiError::Canceled`] instead. Either way the handle completes
/// exactly once, so a canceled await never hangs.
pub struct RequestHandle<'a, T> {
    future: BoxFuture<'a, Result<Result<T, ApiError>, Aborted>>,
    abort: AbortHandle,
}

impl<'a, T> RequestHandle<'a, T> {
    fn new<F>(operation: F) -> Self
    where
        F: Future<Output = Result<T, ApiError>> + Send + 'a,
    {
        let (abortable, abort) = future::abortable(operation);
        Self { future: abortable.boxed(), abort }
    }

    /// A detached handle for canceling this operation from elsewhere, e.g.
    /// a UI callback that outlives the awaiting task.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Cancels the operation. The pending await resolves with
    /// [`ApiError::Canceled`]. Canceling an already finished operation has
    /// no effect.
    pub fn cancel(&self) {
        self.abort.abort();
    }
}

impl<'a, T> Future for RequestHandle<'a, T> {
    type Output = Result<T, ApiError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut().future.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(Aborted)) => Poll::Ready(Err(ApiError::Canceled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl StoreClient {
    /// Logs in with the configured credentials.
    ///
    /// On success the session is stored on the client in one step and every
    /// later operation picks it up. On any failure the previously stored
    /// session, if one exists, is left untouched.
    pub fn login<'a>(&'a self, transport: &'a dyn Transport) -> RequestHandle<'a, Session> {
        let parts = self.login_parts();
        RequestHandle::new(async move {
            let (request, expects_user_id) = parts?;
            let response = transport.execute(request).await?;
            let session = self.parse_login(response, expects_user_id)?;
            self.set_session(Some(session.clone()));
            Ok(session)
        })
    }

    /// Searches for instances of `resource` matching `parameters`, yielding
    /// matches in server order.
    pub fn search<'a>(
        &'a self,
        transport: &'a dyn Transport,
        resource: &str,
        parameters: &JsonObject,
    ) -> RequestHandle<'a, Vec<Value>> {
        let built = self.build_search(resource, parameters);
        RequestHandle::new(async move {
            let response = transport.execute(built?).await?;
            self.parse_search(response)
        })
    }

    /// Fetches the values of one resource instance.
    pub fn get<'a>(
        &'a self,
        transport: &'a dyn Transport,
        resource: &str,
        id: u64,
    ) -> RequestHandle<'a, JsonObject> {
        let built = self.build_get(resource, id);
        RequestHandle::new(async move {
            let response = transport.execute(built?).await?;
            self.parse_get(response)
        })
    }

    /// Applies `changes` to one resource instance.
    pub fn edit<'a>(
        &'a self,
        transport: &'a dyn Transport,
        resource: &str,
        id: u64,
        changes: &JsonObject,
    ) -> RequestHandle<'a, ()> {
        let built = self.build_edit(resource, id, changes);
        RequestHandle::new(async move {
            let response = transport.execute(built?).await?;
            self.parse_edit(response)
        })
    }

    /// Deletes one resource instance.
    pub fn delete<'a>(
        &'a self,
        transport: &'a dyn Transport,
        resource: &str,
        id: u64,
    ) -> RequestHandle<'a, ()> {
        let built = self.build_delete(resource, id);
        RequestHandle::new(async move {
            let response = transport.execute(built?).await?;
            self.parse_delete(response)
        })
    }

    /// Creates a new `resource` instance and yields its server-assigned id.
    pub fn create<'a>(
        &'a self,
        transport: &'a dyn Transport,
        resource: &str,
        initial_values: &JsonObject,
    ) -> RequestHandle<'a, u64> {
        let built = self.build_create(resource, initial_values);
        RequestHandle::new(async move {
            let response = transport.execute(built?).await?;
            self.parse_create(response)
        })
    }

    /// Invokes a named server-side function on one resource instance. The
    /// server's status and body are handed back as-is.
    pub fn perform_function<'a>(
        &'a self,
        transport: &'a dyn Transport,
        resource: &str,
        id: u64,
        function: &str,
        payload: Option<&JsonObject>,
    ) -> RequestHandle<'a, FunctionResponse> {
        let built = self.build_function(resource, id, function, payload);
        RequestHandle::new(async move {
            let response = transport.execute(built?).await?;
            self.parse_function(response)
        })
    }
}
