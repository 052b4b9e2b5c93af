//! Per-connection handler: authenticate, establish the pairing, then relay.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use duet_common::{PairingError, PairingId, UserId};
use duet_pairing::{Connection, Outbound};

use crate::protocol::{ClientHello, ControlRequest, ServerFrame};
use crate::server::RelayState;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = SplitStream<WebSocketStream<TcpStream>>;

/// Why the relay loop ended. Every variant runs the same cleanup; the
/// close frame sent to the client differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Teardown {
    ClientClosed,
    IdleTimeout,
    Evicted,
    ProtocolViolation,
    TransportError,
}

/// Handle a single WebSocket connection for its whole lifetime.
pub async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    state: Arc<RelayState>,
) {
    let (mut sink, mut stream) = ws.split();

    // 1. Hello, within the handshake window.
    let hello = match read_hello(&mut stream, &mut sink, addr, &state).await {
        Some(hello) => hello,
        None => return,
    };

    // 2. The token is the only identity source; registries are keyed by
    // the user id it verifies to, never by anything the client typed.
    let user = match state.gate.verify(hello.token()) {
        Ok(user) => user,
        Err(e) => {
            warn!(peer = %addr, error = %e, "hello token rejected");
            reject(&mut sink, "unauthenticated").await;
            return;
        }
    };

    // 3. Create, join, or attach.
    let (pairing, ready) = match establish(&state, &user, hello).await {
        Ok(v) => v,
        Err(e) => {
            info!(peer = %addr, user_id = %user, error = %e, "pairing operation failed");
            reject(&mut sink, e.wire_name()).await;
            return;
        }
    };

    // 4. Register, then confirm. A second login for the same user evicts
    // this connection through its outbound channel.
    let (tx, mut rx) = mpsc::channel::<Outbound>(state.config.outbound_buffer);
    let conn = state.connections.register(&user, &pairing, tx).await;

    info!(
        peer = %addr,
        user_id = %user,
        session_id = %pairing,
        connection_id = %conn.id,
        "client registered"
    );

    if send_frame(&mut sink, &ready).await.is_err() {
        state.connections.unregister(&conn.id).await;
        return;
    }

    // 5. If the partner is already online, both sides hear it now.
    if let Some(partner) = state.connections.partner_connection_of(&conn.id).await {
        let _ = send_frame(&mut sink, &ServerFrame::PeerConnected).await;
        let _ = partner
            .sender
            .try_send(Outbound::Frame(ServerFrame::PeerConnected.to_json()));
    }

    // 6. Relay until something ends the connection.
    let teardown = relay_loop(&mut sink, &mut stream, &mut rx, &conn, &state).await;

    // 7. Cleanup, identical on every path: resolve the partner before the
    // maps forget this connection, then unregister. An evicted connection
    // is already absent from the maps, so its partner (who still sees the
    // newer connection) gets no spurious disconnect notice.
    let partner = state.connections.partner_connection_of(&conn.id).await;
    state.connections.unregister(&conn.id).await;
    if let Some(partner) = partner {
        let _ = partner
            .sender
            .try_send(Outbound::Frame(ServerFrame::PeerDisconnected.to_json()));
    }

    let close = match teardown {
        Teardown::ClientClosed => Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        }),
        Teardown::IdleTimeout => Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "idle timeout".into(),
        }),
        Teardown::Evicted => Some(CloseFrame {
            code: CloseCode::Policy,
            reason: "signed in on another connection".into(),
        }),
        Teardown::ProtocolViolation => Some(CloseFrame {
            code: CloseCode::Unsupported,
            reason: "text frames only".into(),
        }),
        Teardown::TransportError => None,
    };
    if let Some(frame) = close {
        let _ = sink.send(Message::Close(Some(frame))).await;
    }

    info!(
        peer = %addr,
        user_id = %user,
        connection_id = %conn.id,
        reason = ?teardown,
        "client disconnected"
    );
}

/// Run the requested pairing operation and build the confirmation frame.
async fn establish(
    state: &RelayState,
    user: &UserId,
    hello: ClientHello,
) -> Result<(PairingId, ServerFrame), PairingError> {
    match hello {
        ClientHello::CreatePairing { .. } => {
            let session = state.pairings.create(user).await?;
            let frame = ServerFrame::PairingCreated {
                session_id: session.id.to_string(),
                code: session.code.clone(),
            };
            Ok((session.id, frame))
        }
        ClientHello::JoinPairing { code, .. } => {
            let session = state.pairings.join(&code, user).await?;
            let frame = ServerFrame::SessionReady {
                session_id: session.id.to_string(),
            };
            Ok((session.id, frame))
        }
        ClientHello::Attach { session_id, .. } => {
            let id = PairingId::from(session_id);
            let session = state.pairings.member_session(&id, user).await?;
            let frame = ServerFrame::SessionReady {
                session_id: session.id.to_string(),
            };
            Ok((session.id, frame))
        }
    }
}

/// The steady-state loop: outbound channel and inbound frames, with an
/// idle timer that any activity in either direction resets.
async fn relay_loop(
    sink: &mut WsSink,
    stream: &mut WsStream,
    rx: &mut mpsc::Receiver<Outbound>,
    conn: &Connection,
    state: &RelayState,
) -> Teardown {
    loop {
        tokio::select! {
            out = rx.recv() => match out {
                Some(Outbound::Frame(json)) => {
                    if sink.send(Message::Text(json.into())).await.is_err() {
                        return Teardown::TransportError;
                    }
                }
                Some(Outbound::Evict) | None => return Teardown::Evicted,
            },

            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    // Control frames first; everything else is relay
                    // traffic and gets routed verbatim.
                    if let Ok(ctrl) = serde_json::from_str::<ControlRequest>(&text) {
                        let reply = control_reply(state, conn, ctrl).await;
                        if send_frame(sink, &reply).await.is_err() {
                            return Teardown::TransportError;
                        }
                    } else {
                        state.router.route(&conn.id, &text).await;
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = sink.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => return Teardown::ClientClosed,
                Some(Ok(_)) => {
                    warn!(connection_id = %conn.id, "binary frame on relay transport");
                    return Teardown::ProtocolViolation;
                }
                Some(Err(e)) => {
                    debug!(connection_id = %conn.id, error = %e, "transport error");
                    return Teardown::TransportError;
                }
            },

            _ = tokio::time::sleep(state.config.idle_timeout) => {
                info!(connection_id = %conn.id, "idle timeout");
                return Teardown::IdleTimeout;
            }
        }
    }
}

async fn control_reply(state: &RelayState, conn: &Connection, ctrl: ControlRequest) -> ServerFrame {
    match ctrl {
        ControlRequest::Status => match state.pairings.status(&conn.pairing).await {
            Ok(status) => ServerFrame::Status {
                paired: status.paired,
                partner_present: status.partner_present,
            },
            Err(e) => ServerFrame::Error {
                reason: e.wire_name().to_string(),
            },
        },
    }
}

/// Read and parse the first frame as a [`ClientHello`].
async fn read_hello(
    stream: &mut WsStream,
    sink: &mut WsSink,
    addr: SocketAddr,
    state: &RelayState,
) -> Option<ClientHello> {
    let frame = tokio::time::timeout(state.config.handshake_timeout, stream.next()).await;

    match frame {
        Ok(Some(Ok(Message::Text(text)))) => match serde_json::from_str::<ClientHello>(&text) {
            Ok(hello) => Some(hello),
            Err(e) => {
                warn!(peer = %addr, error = %e, "malformed hello");
                reject(sink, "malformed hello").await;
                None
            }
        },
        Ok(Some(Ok(_))) => {
            warn!(peer = %addr, "expected text hello");
            reject(sink, "malformed hello").await;
            None
        }
        Ok(Some(Err(e))) => {
            warn!(peer = %addr, error = %e, "transport error during hello");
            None
        }
        Ok(None) => {
            debug!(peer = %addr, "connection closed before hello");
            None
        }
        Err(_) => {
            warn!(peer = %addr, "hello timeout");
            None
        }
    }
}

/// Send an error frame, then close. Used for every pre-registration
/// failure; cleanup after registration goes through the relay loop.
async fn reject(sink: &mut WsSink, reason: &str) {
    let _ = send_frame(
        sink,
        &ServerFrame::Error {
            reason: reason.to_string(),
        },
    )
    .await;
    let _ = sink
        .send(Message::Close(Some(CloseFrame {
            code: CloseCode::Policy,
            reason: "".into(),
        })))
        .await;
}

async fn send_frame(
    sink: &mut WsSink,
    frame: &ServerFrame,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    sink.send(Message::Text(frame.to_json().into())).await
}
