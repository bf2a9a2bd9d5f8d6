use axum::{
    Router,
    extract::{DefaultBodyLimit, Query, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::Deserialize;

use std::{net::SocketAddr, sync::Arc};

use crate::{ServerError, attachments, auth::verify_token, campaigns, dashboard, donations};
use engine::Engine;

/// Five files of 5MB plus the form fields.
const DEFAULT_MAX_BODY_BYTES: usize = 30 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// HS256 secret shared with the login service.
    pub jwt_secret: String,
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub jwt_secret: Arc<str>,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(Authorization(bearer))) = auth_header else {
        return Err(ServerError::Unauthorized("missing bearer token".to_string()));
    };

    let actor = verify_token(&state.jwt_secret, bearer.token())?;
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// Same as [`auth`], but links opened straight from the browser may carry the
/// token in the `token` query parameter instead.
async fn download_auth(
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    Query(query): Query<TokenQuery>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let token = match (&auth_header, query.token.as_deref()) {
        (Some(TypedHeader(Authorization(bearer))), _) => bearer.token().to_string(),
        (None, Some(token)) if !token.is_empty() => token.to_string(),
        _ => return Err(ServerError::Unauthorized("missing bearer token".to_string())),
    };

    let actor = verify_token(&state.jwt_secret, &token)?;
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// Build the application router around `engine`.
pub fn router(engine: Arc<Engine>, config: &ServerConfig) -> Router {
    let state = ServerState {
        engine,
        jwt_secret: Arc::from(config.jwt_secret.as_str()),
    };

    let api = Router::new()
        .route("/donations", post(donations::create).get(donations::list))
        .route("/donations/stats/summary", get(dashboard::donation_summary))
        .route(
            "/donations/{id}",
            get(donations::get)
                .put(donations::update)
                .delete(donations::delete),
        )
        .route("/campaigns", post(campaigns::create).get(campaigns::list))
        .route("/campaigns/reconcile", post(campaigns::reconcile_all))
        .route(
            "/campaigns/{id}",
            get(campaigns::get)
                .put(campaigns::update)
                .delete(campaigns::delete),
        )
        .route("/campaigns/{id}/reconcile", post(campaigns::reconcile))
        .route("/dashboard/overview", get(dashboard::overview))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    let downloads = Router::new()
        .route("/attachments/{id}", get(attachments::download))
        .route_layer(middleware::from_fn_with_state(state.clone(), download_auth));

    api.merge(downloads)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(state)
}

pub async fn run(engine: Engine, config: ServerConfig, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, config, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    config: ServerConfig,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(Arc::new(engine), &config)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    config: ServerConfig,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, config, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
