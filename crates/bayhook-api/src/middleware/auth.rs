//! Authentication middleware for the webhook routes.
//!
//! Runs the deployment's `Authenticator` against each request and either
//! short-circuits with the mapped error response or passes the request on
//! with an `Authorized` extension.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};

use crate::{
    auth::{AuthError, Authorized},
    AppState,
};

/// Axum middleware that authenticates webhook callers.
///
/// The peer address is read from `ConnectInfo` when the server was started
/// with connection info; it is only consulted by the `ip` strategy when
/// `X-Forwarded-For` is absent.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let peer = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0);

    let authorized: Authorized = match state.authenticator.authorize(req.headers(), peer) {
        Ok(authorized) => authorized,
        Err(err @ AuthError::MissingSecret { .. }) => {
            error!(strategy = %state.authenticator.strategy(), "{}", err);
            return Err(err);
        },
        Err(err) => {
            warn!(strategy = %state.authenticator.strategy(), "{}", err);
            return Err(err);
        },
    };

    debug!(principal = %authorized.principal, "Request authorized");
    req.extensions_mut().insert(authorized);

    Ok(next.run(req).await)
}
