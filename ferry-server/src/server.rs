use crate::config::Config;
use axum::{
    Json, Router, async_trait,
    extract::{ConnectInfo, DefaultBodyLimit, FromRequest, Request, State},
    http::{StatusCode, header::CONTENT_LENGTH},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use ferry_core::{
    AUTH_HEADER, AddressRegistry, FerryError, FetchOutcome, MAX_CONTENT_BYTES, RemoveOutcome,
    RequestGate, Result, SlotStore, TransferHandshake,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Leaves room for JSON escaping of content that is right at the limit.
const MAX_REQUEST_BODY_BYTES: usize = MAX_CONTENT_BYTES * 6 + 64 * 1024;

const REQUEST_FIELDS: &[&str] = &["file", "fileName"];
const CONTENT_FIELDS: &[&str] = &["content", "code", "fileName"];

pub struct ServerState {
    pub gate: RequestGate,
    pub registry: AddressRegistry,
    pub handshake: TransferHandshake,
}

impl ServerState {
    pub fn new(gate: RequestGate, store: Arc<dyn SlotStore>) -> Self {
        Self {
            gate,
            registry: AddressRegistry::new(store.clone()),
            handshake: TransferHandshake::new(store),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

#[derive(Debug, Serialize)]
struct AddAddrResponse {
    status: &'static str,
    added: bool,
}

#[derive(Debug, Serialize)]
struct RemoveAddrResponse {
    status: &'static str,
    addr: String,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ServerSendResponse {
    status: &'static str,
    size: usize,
}

#[derive(Debug, Serialize)]
struct ClientRequestResponse {
    status: &'static str,
    file: String,
}

#[derive(Debug, Serialize)]
struct FileResponse {
    file: String,
}

#[derive(Debug, Serialize)]
struct ContentResponse {
    content: String,
}

struct ApiError(FerryError);

impl From<FerryError> for ApiError {
    fn from(error: FerryError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FerryError::Unauthorized => StatusCode::FORBIDDEN,
            FerryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            FerryError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            FerryError::NotFound(_) => StatusCode::NOT_FOUND,
            FerryError::Storage(_) | FerryError::Config(_) | FerryError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }

        error_response(status, self.0.to_string())
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    let resp = ErrorResponse {
        success: false,
        error,
    };
    (status, Json(resp)).into_response()
}

/// Raw request body whose extraction failures are reported as JSON errors.
struct RequestBody(Bytes);

#[async_trait]
impl<S> FromRequest<S> for RequestBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let declared_len = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok());

        match Bytes::from_request(req, state).await {
            Ok(bytes) => Ok(RequestBody(bytes)),
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                // Without a declared length the body is at least one byte over.
                let size = declared_len.unwrap_or(MAX_REQUEST_BODY_BYTES + 1);
                Err(FerryError::PayloadTooLarge {
                    size,
                    limit: MAX_REQUEST_BODY_BYTES,
                }
                .into())
            }
            Err(rejection) => Err(FerryError::InvalidInput(rejection.body_text()).into()),
        }
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

pub async fn run_server(config: Config) -> Result<()> {
    let gate = RequestGate::new(config.secret()?)?;
    let store = config.slot_store_builder().build().await?;
    tracing::info!("Using {} slot store", store.backend_name());

    let state = Arc::new(ServerState::new(gate, store));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .map_err(|e| {
            FerryError::Config(format!(
                "failed to bind {}: {}",
                config.server.bind_addr, e
            ))
        })?;
    tracing::info!("Server listening on {}", config.server.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| FerryError::Internal(e.to_string()))?;

    Ok(())
}

pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(
            "/addrs-add",
            get(add_addr).post(add_addr).fallback(method_not_allowed),
        )
        .route(
            "/addrs-remove",
            get(remove_addr).post(remove_addr).fallback(method_not_allowed),
        )
        .route(
            "/clear-index",
            get(clear_index).post(clear_index).fallback(method_not_allowed),
        )
        .route("/addrs", get(list_addrs).fallback(method_not_allowed))
        .route(
            "/client-request",
            post(client_request).fallback(method_not_allowed),
        )
        .route("/client-get", get(client_get).fallback(method_not_allowed))
        .route(
            "/server-get-file",
            get(server_get_file).fallback(method_not_allowed),
        )
        .route("/server-send", post(server_send).fallback(method_not_allowed))
        .fallback(unknown_route)
        .layer(middleware::from_fn_with_state(state.clone(), require_auth_key))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn method_not_allowed(request: Request) -> Response {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        format!(
            "method {} is not allowed on {}",
            request.method(),
            request.uri().path()
        ),
    )
}

async fn unknown_route(request: Request) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("no route for {}", request.uri().path()),
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn require_auth_key(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Response {
    let key = request
        .headers()
        .get(AUTH_HEADER)
        .and_then(|value| value.to_str().ok());

    if let Err(e) = state.gate.check(key) {
        tracing::warn!(
            "Rejected {} {}: missing or invalid {}",
            request.method(),
            request.uri().path(),
            AUTH_HEADER
        );
        return ApiError(e).into_response();
    }

    next.run(request).await
}

/// The caller's IP, without port. IPv4-mapped IPv6 peers are reported as IPv4.
fn peer_addr(peer: SocketAddr) -> String {
    peer.ip().to_canonical().to_string()
}

async fn add_addr(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<AddAddrResponse>> {
    let outcome = state.registry.add(&peer_addr(peer)).await?;

    let status = if outcome.added() { "Added" } else { "AlreadyOnline" };
    Ok(Json(AddAddrResponse {
        status,
        added: outcome.added(),
    }))
}

async fn remove_addr(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<RemoveAddrResponse>> {
    let addr = peer_addr(peer);
    let outcome = state.registry.remove(&addr).await?;

    let status = match outcome {
        RemoveOutcome::Removed => "Removed",
        RemoveOutcome::NotFound => "NotFound",
    };
    Ok(Json(RemoveAddrResponse { status, addr }))
}

async fn clear_index(State(state): State<Arc<ServerState>>) -> ApiResult<Json<StatusResponse>> {
    state.registry.clear().await?;
    Ok(Json(StatusResponse { status: "Cleared" }))
}

async fn list_addrs(State(state): State<Arc<ServerState>>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.registry.list().await?))
}

async fn client_request(
    State(state): State<Arc<ServerState>>,
    RequestBody(body): RequestBody,
) -> ApiResult<(StatusCode, Json<ClientRequestResponse>)> {
    let fields = parse_json_object(&body)?;
    let file_name = string_field(&fields, REQUEST_FIELDS)?;

    let ack = state.handshake.submit_request(file_name).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ClientRequestResponse {
            status: "Request sent... Awaiting response",
            file: ack.file_name,
        }),
    ))
}

async fn client_get(State(state): State<Arc<ServerState>>) -> ApiResult<Json<ContentResponse>> {
    match state.handshake.fetch_content().await? {
        FetchOutcome::Found(content) => Ok(Json(ContentResponse { content })),
        FetchOutcome::NotFound => Err(FerryError::NotFound(
            "no content has been uploaded".to_string(),
        )
        .into()),
    }
}

async fn server_get_file(State(state): State<Arc<ServerState>>) -> ApiResult<Json<FileResponse>> {
    match state.handshake.fetch_request().await? {
        FetchOutcome::Found(file) => Ok(Json(FileResponse { file })),
        FetchOutcome::NotFound => Err(FerryError::NotFound(
            "no file has been requested".to_string(),
        )
        .into()),
    }
}

async fn server_send(
    State(state): State<Arc<ServerState>>,
    RequestBody(body): RequestBody,
) -> ApiResult<Json<ServerSendResponse>> {
    let fields = parse_json_object(&body)?;
    let content = string_field(&fields, CONTENT_FIELDS)?;

    let ack = state.handshake.submit_content(content).await?;

    Ok(Json(ServerSendResponse {
        status: "Success",
        size: ack.size,
    }))
}

fn parse_json_object(body: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(FerryError::InvalidInput(
            "request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(FerryError::InvalidInput(format!(
            "request body is not valid JSON: {}",
            e
        ))),
    }
}

/// First non-null field among `names`, which must be a string.
fn string_field<'a>(fields: &'a Map<String, Value>, names: &[&str]) -> Result<&'a str> {
    for name in names {
        match fields.get(*name) {
            None | Some(Value::Null) => continue,
            Some(Value::String(value)) => return Ok(value.as_str()),
            Some(_) => {
                return Err(FerryError::InvalidInput(format!(
                    "field '{}' must be a string",
                    name
                )));
            }
        }
    }

    Err(FerryError::InvalidInput(format!(
        "missing field: expected one of {}",
        names.join(", ")
    )))
}
