/**
 * WebSocket Transport
 *
 * Upgrades `/ws` and `/ws/{namespace}` to a socket and pumps frames
 * between the wire and a `Session`.
 *
 * # Frame Format
 *
 * Inbound and outbound frames are JSON text:
 *
 * ```text
 * client → server: {"event": "board:join", "data": {...}}
 * server → client: {"event": "board:state", "data": {...}, "timestamp": "..."}
 * ```
 *
 * A refused handshake receives a single `connect_error` frame followed by a
 * close frame.
 */
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, Path, Query, State,
    },
    http::HeaderMap,
    response::Response,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::backend::auth::Handshake;
use crate::backend::error::BackendError;
use crate::backend::middleware::handshake_from_parts;
use crate::backend::namespaces::{NamespaceController, Session};
use crate::backend::realtime::Namespace;
use crate::backend::server::state::AppState;
use crate::shared::ServerEvent;

/// `GET /ws` - default namespace
pub async fn ws_root(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
) -> Result<Response, BackendError> {
    upgrade(ws, state, Namespace::Root, query, &headers, connect_info)
}

/// `GET /ws/{namespace}` - named namespace
pub async fn ws_namespace(
    ws: WebSocketUpgrade,
    Path(namespace): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
) -> Result<Response, BackendError> {
    let namespace = Namespace::from_str(&namespace).map_err(|_| BackendError::not_found("Namespace"))?;
    upgrade(ws, state, namespace, query, &headers, connect_info)
}

fn upgrade(
    ws: WebSocketUpgrade,
    state: AppState,
    namespace: Namespace,
    query: HashMap<String, String>,
    headers: &HeaderMap,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
) -> Result<Response, BackendError> {
    let controller = state
        .controllers
        .get(namespace)
        .ok_or_else(|| BackendError::not_found("Namespace"))?;
    let remote_addr = connect_info.map(|Extension(ConnectInfo(addr))| addr);
    let handshake = handshake_from_parts(headers, query, remote_addr);

    tracing::debug!("[Socket] Upgrade requested for {} from {:?}", namespace, remote_addr);
    Ok(ws.on_upgrade(move |socket| run_socket(socket, state, controller, handshake)))
}

async fn send_event(sink: &mut futures_util::stream::SplitSink<WebSocket, Message>, event: &ServerEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(text) => sink.send(Message::Text(text.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("[Socket] Failed to serialize {}: {}", event.event, e);
            true
        }
    }
}

async fn run_socket(
    socket: WebSocket,
    state: AppState,
    controller: Arc<dyn NamespaceController>,
    handshake: Handshake,
) {
    let (mut sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<ServerEvent>();

    let mut session = match Session::establish(&state.services, controller, &handshake, tx).await {
        Ok(session) => session,
        Err(e) => {
            let refusal = ServerEvent::connect_error(e.code(), &e.message());
            send_event(&mut sink, &refusal).await;
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };

    // Ends once the registry drops the sender on disconnect
    let writer = tokio::spawn(async move {
        let mut outbound = UnboundedReceiverStream::new(rx);
        while let Some(event) = outbound.next().await {
            if !send_event(&mut sink, &event).await {
                break;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => session.handle_text(text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("[Socket] Read error on {}: {}", session.context().socket_id, e);
                break;
            }
        }
    }

    session.close().await;
    if let Err(e) = writer.await {
        tracing::debug!("[Socket] Writer task ended abnormally: {}", e);
    }
}
