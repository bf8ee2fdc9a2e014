//! Connection multiplexer
//!
//! Owns the listening socket and admits connections against the
//! allow-list. Each admitted connection gets its own task that reads
//! bytes, feeds the session state machine, and executes the actions it
//! returns; protocol steps within a connection stay strictly ordered,
//! while a slow client never holds up the others. A connection task
//! failure disconnects only that client and never aborts the accept
//! loop.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use wicket_core::session::{PROMPT_USERNAME, WELCOME};
use wicket_core::{Action, PasswdStore, Session, SessionEvent};

use crate::allowlist::AllowList;
use crate::audit::{AuditEvent, AuditLog};
use crate::error::Result;

/// Sent to peers the allow-list rejects, before closing on them
const NOT_AUTHORIZED: &str = "Not Authorized To Log into System\n";

/// The TCP server
pub struct Server {
    listener: TcpListener,
    store: Arc<PasswdStore>,
    allowlist: Arc<AllowList>,
    audit: Arc<AuditLog>,
}

impl Server {
    /// Bind the listening socket.
    pub async fn bind(
        addr: SocketAddr,
        store: Arc<PasswdStore>,
        allowlist: Arc<AllowList>,
        audit: Arc<AuditLog>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            store,
            allowlist,
            audit,
        })
    }

    /// The bound address (useful when binding port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve connections until the task is dropped.
    pub async fn run(&self) -> Result<()> {
        info!("Listening on {}", self.listener.local_addr()?);

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    if let Err(e) = self.admit(stream, peer).await {
                        error!(%peer, "Admission error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }

    /// Allow-list check; rejected peers are notified and closed without
    /// ever reaching a session.
    async fn admit(&self, mut stream: TcpStream, peer: SocketAddr) -> Result<()> {
        let peer_ip = peer.ip().to_string();

        if !self.allowlist.permits(&peer.ip()) {
            warn!(%peer, "Connection rejected by allow-list");
            self.audit
                .record(&AuditEvent::ConnectionRejected { peer: peer_ip })?;
            let _ = stream.write_all(NOT_AUTHORIZED.as_bytes()).await;
            return Ok(());
        }

        info!(%peer, "Connection admitted");
        self.audit
            .record(&AuditEvent::ConnectionAccepted { peer: peer_ip })?;

        let store = Arc::clone(&self.store);
        let audit = Arc::clone(&self.audit);
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, peer, store, audit).await {
                error!(%peer, "Connection error: {}", e);
            }
        });

        Ok(())
    }
}

/// Drive one connection's session until it disconnects.
async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    store: Arc<PasswdStore>,
    audit: Arc<AuditLog>,
) -> Result<()> {
    stream.write_all(WELCOME.as_bytes()).await?;
    stream.write_all(PROMPT_USERNAME.as_bytes()).await?;

    let mut session = Session::new();
    let mut read_buf = [0u8; 1024];

    loop {
        // Drain every complete line already buffered before reading more.
        loop {
            match session.advance(&store) {
                Ok(Action::NeedMoreData) => break,
                Ok(Action::Send { reply, event }) => {
                    stream.write_all(&reply).await?;
                    if let Some(event) = event {
                        audit.record(&session_audit(event, peer))?;
                    }
                }
                Ok(Action::Disconnect { reply, event }) => {
                    stream.write_all(&reply).await?;
                    if let Some(event) = event {
                        audit.record(&session_audit(event, peer))?;
                    }
                    record_disconnect(&audit, &session, peer)?;
                    debug!(%peer, "Session ended");
                    return Ok(());
                }
                Err(e) => {
                    // Store failure is fatal to this connection only
                    error!(%peer, "Store error, disconnecting: {}", e);
                    record_disconnect(&audit, &session, peer)?;
                    return Err(e.into());
                }
            }
        }

        let n = stream.read(&mut read_buf).await?;
        if n == 0 {
            debug!(%peer, "Client closed the connection");
            record_disconnect(&audit, &session, peer)?;
            return Ok(());
        }
        session.push_bytes(&read_buf[..n]);
    }
}

fn record_disconnect(audit: &AuditLog, session: &Session, peer: SocketAddr) -> Result<()> {
    audit.record(&AuditEvent::Disconnected {
        username: session.username().to_string(),
        peer: peer.ip().to_string(),
    })
}

/// Attach the peer address to a session event for the audit log.
fn session_audit(event: SessionEvent, peer: SocketAddr) -> AuditEvent {
    let peer = peer.ip().to_string();
    match event {
        SessionEvent::UnknownUsername { username } => {
            AuditEvent::UnknownUsername { username, peer }
        }
        SessionEvent::PasswordFailedTwice { username } => {
            AuditEvent::PasswordFailedTwice { username, peer }
        }
        SessionEvent::LoginSucceeded { username } => {
            AuditEvent::LoginSucceeded { username, peer }
        }
    }
}
