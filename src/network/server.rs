//! WebSocket Leaderboard Server
//!
//! Async WebSocket host for the leaderboard wire contract. Connections join
//! a post, then submit round scores or fetch standings; every connection on
//! a post hears about new best scores.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::network::leaderboard::{LeaderboardError, LeaderboardStore};
use crate::network::protocol::{
    ClientMessage, ErrorCode, JoinResult, LeaderboardResponse, LeaderboardUpdate, RequestError,
    ServerError, ServerMessage,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Idle time after which a connection is dropped.
    pub idle_timeout: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().expect("static addr parses"),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Build a config from environment variables, falling back to defaults.
    ///
    /// Recognized: `BULLSEYE_BIND_ADDR`, `BULLSEYE_MAX_CONNECTIONS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("BULLSEYE_BIND_ADDR") {
            match addr.parse() {
                Ok(parsed) => config.bind_addr = parsed,
                Err(err) => warn!("ignoring BULLSEYE_BIND_ADDR {:?}: {}", addr, err),
            }
        }
        if let Ok(max) = std::env::var("BULLSEYE_MAX_CONNECTIONS") {
            match max.parse() {
                Ok(parsed) => config.max_connections = parsed,
                Err(err) => warn!("ignoring BULLSEYE_MAX_CONNECTIONS {:?}: {}", max, err),
            }
        }
        config
    }
}

/// Leaderboard server errors.
#[derive(Debug, thiserror::Error)]
pub enum LeaderboardServerError {
    /// Failed to bind to address.
    #[error("failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// Connection identifier (for logs).
    conn_id: Uuid,
    /// Post this connection is bound to (after Join).
    post_id: Option<String>,
    /// Player on this connection (after Join).
    user_id: Option<String>,
    /// Last activity.
    last_activity: Instant,
    /// Message sender (for direct messaging to client).
    sender: mpsc::Sender<ServerMessage>,
}

type ClientMap = Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>;

/// The leaderboard server.
pub struct LeaderboardServer {
    /// Server configuration.
    config: ServerConfig,
    /// Ranking service shared by every connection.
    leaderboard: Arc<LeaderboardStore>,
    /// Connected clients.
    clients: ClientMap,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl LeaderboardServer {
    /// Create a new server over the given leaderboard.
    pub fn new(config: ServerConfig, leaderboard: Arc<LeaderboardStore>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            leaderboard,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Run the server until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), LeaderboardServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("leaderboard server listening on {}", self.config.bind_addr);

        // Spawn idle-connection cleanup task
        let cleanup_clients = self.clients.clone();
        let idle_timeout = self.config.idle_timeout;
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_clients, idle_timeout).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            debug!("new connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();
        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let leaderboard = self.leaderboard.clone();
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("websocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);
            let conn_id = Uuid::new_v4();

            // Register client
            {
                let mut clients = clients.write().await;
                clients.insert(
                    addr,
                    ConnectedClient {
                        conn_id,
                        post_id: None,
                        user_id: None,
                        last_activity: Instant::now(),
                        sender: msg_tx.clone(),
                    },
                );
            }

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("invalid message from {} ({}): {}", addr, conn_id, e);
                                        let _ = msg_tx.send(ServerMessage::Error(ServerError {
                                            code: ErrorCode::InvalidInput,
                                            message: "invalid message format".to_string(),
                                        })).await;
                                        continue;
                                    }
                                };

                                // Update activity
                                {
                                    let mut clients = clients.write().await;
                                    if let Some(client) = clients.get_mut(&addr) {
                                        client.last_activity = Instant::now();
                                    }
                                }

                                Self::handle_client_message(
                                    addr,
                                    client_msg,
                                    &clients,
                                    &leaderboard,
                                    &config,
                                    &msg_tx,
                                ).await;
                            }
                            Some(Ok(Message::Ping(_))) => {
                                let _ = msg_tx.send(ServerMessage::Pong {
                                    timestamp: 0,
                                    server_time: now_ms(),
                                }).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("client {} ({}) disconnected", addr, conn_id);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("websocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Cleanup
            sender_task.abort();
            clients.write().await.remove(&addr);
            debug!("client {} ({}) cleaned up", addr, conn_id);
        });
    }

    /// Dispatch one parsed client message.
    async fn handle_client_message(
        addr: SocketAddr,
        msg: ClientMessage,
        clients: &ClientMap,
        leaderboard: &Arc<LeaderboardStore>,
        config: &ServerConfig,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        match msg {
            ClientMessage::Join(req) => {
                if let Err(err) = req.validate() {
                    Self::send_request_error(sender, &err).await;
                    return;
                }

                {
                    let mut clients = clients.write().await;
                    if let Some(client) = clients.get_mut(&addr) {
                        client.post_id = Some(req.post_id.clone());
                        client.user_id = Some(req.user_id.clone());
                    }
                }

                let _ = sender
                    .send(ServerMessage::JoinResult(JoinResult {
                        success: true,
                        post_id: req.post_id.clone(),
                        server_version: config.version.clone(),
                    }))
                    .await;

                // Current standings right away, so the HUD has something
                // before the first throw lands
                match Self::build_response(
                    leaderboard,
                    &req.post_id,
                    &req.user_id,
                    crate::network::protocol::DEFAULT_LIMIT,
                )
                .await
                {
                    Ok(response) => {
                        let _ = sender.send(ServerMessage::Leaderboard(response)).await;
                    }
                    Err(err) => Self::send_store_error(sender, &err).await,
                }

                debug!("client {} joined post {}", addr, req.post_id);
            }

            ClientMessage::SubmitScore(req) => {
                let post_id = match Self::joined_post(addr, clients).await {
                    Some(post_id) => post_id,
                    None => {
                        Self::send_not_joined(sender).await;
                        return;
                    }
                };

                let valid = match req.validate() {
                    Ok(valid) => valid,
                    Err(err) => {
                        Self::send_request_error(sender, &err).await;
                        return;
                    }
                };

                let outcome = match leaderboard
                    .upsert_score(&post_id, &valid.user_id, valid.score, valid.metadata)
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        Self::send_store_error(sender, &err).await;
                        return;
                    }
                };

                match Self::build_response(leaderboard, &post_id, &valid.user_id, valid.limit)
                    .await
                {
                    Ok(response) => {
                        let _ = sender.send(ServerMessage::Leaderboard(response)).await;
                    }
                    Err(err) => Self::send_store_error(sender, &err).await,
                }

                // A new best changes what everyone else sees
                if outcome.improved {
                    info!(
                        "new best {} by {} on {}",
                        outcome.score, outcome.user_id, post_id
                    );
                    Self::broadcast_update(addr, clients, leaderboard, &post_id, &outcome.user_id)
                        .await;
                }
            }

            ClientMessage::FetchLeaderboard(req) => {
                let post_id = match Self::joined_post(addr, clients).await {
                    Some(post_id) => post_id,
                    None => {
                        Self::send_not_joined(sender).await;
                        return;
                    }
                };

                let valid = match req.validate() {
                    Ok(valid) => valid,
                    Err(err) => {
                        Self::send_request_error(sender, &err).await;
                        return;
                    }
                };

                match Self::build_response(leaderboard, &post_id, &valid.user_id, valid.limit)
                    .await
                {
                    Ok(response) => {
                        let _ = sender.send(ServerMessage::Leaderboard(response)).await;
                    }
                    Err(err) => Self::send_store_error(sender, &err).await,
                }
            }

            ClientMessage::Ping { timestamp } => {
                let _ = sender
                    .send(ServerMessage::Pong {
                        timestamp,
                        server_time: now_ms(),
                    })
                    .await;
            }

            ClientMessage::Leave => {
                let mut clients = clients.write().await;
                if let Some(client) = clients.get_mut(&addr) {
                    client.post_id = None;
                    client.user_id = None;
                }
            }
        }
    }

    /// Fetch standings plus the caller's rank. The two reads are
    /// independent and commutative, so they run concurrently.
    async fn build_response(
        leaderboard: &Arc<LeaderboardStore>,
        post_id: &str,
        user_id: &str,
        limit: u64,
    ) -> Result<LeaderboardResponse, LeaderboardError> {
        let (top, caller_rank) = tokio::try_join!(
            leaderboard.fetch_top_n(post_id, limit),
            leaderboard.rank_for_user(post_id, user_id),
        )?;
        Ok(LeaderboardResponse { top, caller_rank })
    }

    /// Push refreshed standings to every other connection on the post.
    async fn broadcast_update(
        from_addr: SocketAddr,
        clients: &ClientMap,
        leaderboard: &Arc<LeaderboardStore>,
        post_id: &str,
        user_id: &str,
    ) {
        let top = match leaderboard
            .fetch_top_n(post_id, crate::network::protocol::DEFAULT_LIMIT)
            .await
        {
            Ok(top) => top,
            Err(err) => {
                warn!("skipping broadcast for {}: {}", post_id, err);
                return;
            }
        };

        let update = ServerMessage::LeaderboardUpdate(LeaderboardUpdate {
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            top,
        });

        let clients = clients.read().await;
        for (addr, client) in clients.iter() {
            if *addr == from_addr {
                continue; // submitter already got the full response
            }
            if client.post_id.as_deref() == Some(post_id) {
                let _ = client.sender.send(update.clone()).await;
            }
        }
    }

    /// Post this connection joined, if any.
    async fn joined_post(addr: SocketAddr, clients: &ClientMap) -> Option<String> {
        let clients = clients.read().await;
        clients.get(&addr).and_then(|c| c.post_id.clone())
    }

    async fn send_request_error(sender: &mpsc::Sender<ServerMessage>, err: &RequestError) {
        let _ = sender
            .send(ServerMessage::Error(ServerError {
                code: ErrorCode::InvalidInput,
                message: err.to_string(),
            }))
            .await;
    }

    async fn send_store_error(sender: &mpsc::Sender<ServerMessage>, err: &LeaderboardError) {
        let _ = sender
            .send(ServerMessage::Error(ServerError {
                code: ErrorCode::StoreUnavailable,
                message: err.to_string(),
            }))
            .await;
    }

    async fn send_not_joined(sender: &mpsc::Sender<ServerMessage>) {
        let _ = sender
            .send(ServerMessage::Error(ServerError {
                code: ErrorCode::NotJoined,
                message: "join a post before submitting or fetching".to_string(),
            }))
            .await;
    }

    /// Drop connections idle longer than the timeout.
    async fn run_cleanup_loop(clients: ClientMap, idle_timeout: Duration) {
        let mut interval = interval(Duration::from_secs(60));

        loop {
            interval.tick().await;

            let now = Instant::now();
            let to_remove: Vec<_> = {
                let clients = clients.read().await;
                clients
                    .iter()
                    .filter(|(_, c)| now.duration_since(c.last_activity) > idle_timeout)
                    .map(|(addr, _)| *addr)
                    .collect()
            };

            for addr in to_remove {
                let mut clients = clients.write().await;
                if let Some(client) = clients.remove(&addr) {
                    info!(
                        "removed idle client {} ({}, user {:?})",
                        addr, client.conn_id, client.user_id
                    );
                }
            }
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

/// Server wall clock in epoch milliseconds.
fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::{FetchLeaderboardRequest, JoinRequest, SubmitScoreRequest};
    use crate::network::store::MemoryStore;

    fn test_server() -> LeaderboardServer {
        let store = Arc::new(MemoryStore::new());
        let leaderboard = Arc::new(LeaderboardStore::new(store));
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        LeaderboardServer::new(config, leaderboard)
    }

    async fn register_test_client(
        server: &LeaderboardServer,
        addr: SocketAddr,
    ) -> mpsc::Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(16);
        server.clients.write().await.insert(
            addr,
            ConnectedClient {
                conn_id: Uuid::new_v4(),
                post_id: None,
                user_id: None,
                last_activity: Instant::now(),
                sender: tx,
            },
        );
        rx
    }

    async fn dispatch(server: &LeaderboardServer, addr: SocketAddr, msg: ClientMessage) {
        let sender = server
            .clients
            .read()
            .await
            .get(&addr)
            .map(|c| c.sender.clone())
            .unwrap();
        LeaderboardServer::handle_client_message(
            addr,
            msg,
            &server.clients,
            &server.leaderboard,
            &server.config,
            &sender,
        )
        .await;
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_server_creation_and_shutdown() {
        let server = test_server();
        assert_eq!(server.connection_count().await, 0);
        server.shutdown();
        // Should not panic
    }

    #[tokio::test]
    async fn test_submit_before_join_is_rejected() {
        let server = test_server();
        let addr: SocketAddr = "127.0.0.1:40001".parse().unwrap();
        let mut rx = register_test_client(&server, addr).await;

        dispatch(
            &server,
            addr,
            ClientMessage::SubmitScore(SubmitScoreRequest {
                user_id: "t2_alice".to_string(),
                score: 100.0,
                limit: None,
                metadata: None,
            }),
        )
        .await;

        match rx.recv().await.unwrap() {
            ServerMessage::Error(err) => assert_eq!(err.code, ErrorCode::NotJoined),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_join_then_submit_returns_standings() {
        let server = test_server();
        let addr: SocketAddr = "127.0.0.1:40002".parse().unwrap();
        let mut rx = register_test_client(&server, addr).await;

        dispatch(
            &server,
            addr,
            ClientMessage::Join(JoinRequest {
                post_id: "t3_post".to_string(),
                user_id: "t2_alice".to_string(),
            }),
        )
        .await;

        // JoinResult then the initial (empty) standings
        assert!(matches!(
            rx.recv().await.unwrap(),
            ServerMessage::JoinResult(JoinResult { success: true, .. })
        ));
        match rx.recv().await.unwrap() {
            ServerMessage::Leaderboard(resp) => {
                assert!(resp.top.is_empty());
                assert_eq!(resp.caller_rank, None);
            }
            other => panic!("expected standings, got {:?}", other),
        }

        dispatch(
            &server,
            addr,
            ClientMessage::SubmitScore(SubmitScoreRequest {
                user_id: "t2_alice".to_string(),
                score: 180.0,
                limit: None,
                metadata: None,
            }),
        )
        .await;

        match rx.recv().await.unwrap() {
            ServerMessage::Leaderboard(resp) => {
                assert_eq!(resp.top.len(), 1);
                assert_eq!(resp.top[0].score, 180);
                assert_eq!(resp.caller_rank, Some(1));
            }
            other => panic!("expected standings, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_submit_is_rejected_at_boundary() {
        let server = test_server();
        let addr: SocketAddr = "127.0.0.1:40003".parse().unwrap();
        let mut rx = register_test_client(&server, addr).await;

        dispatch(
            &server,
            addr,
            ClientMessage::Join(JoinRequest {
                post_id: "t3_post".to_string(),
                user_id: "t2_alice".to_string(),
            }),
        )
        .await;
        rx.recv().await.unwrap(); // JoinResult
        rx.recv().await.unwrap(); // initial standings

        dispatch(
            &server,
            addr,
            ClientMessage::SubmitScore(SubmitScoreRequest {
                user_id: "t2_alice".to_string(),
                score: f64::NAN,
                limit: None,
                metadata: None,
            }),
        )
        .await;

        match rx.recv().await.unwrap() {
            ServerMessage::Error(err) => assert_eq!(err.code, ErrorCode::InvalidInput),
            other => panic!("expected error, got {:?}", other),
        }

        // Nothing was persisted
        let top = server.leaderboard.fetch_top_n("t3_post", 10).await.unwrap();
        assert!(top.is_empty());
    }

    #[tokio::test]
    async fn test_new_best_broadcasts_to_post_peers() {
        let server = test_server();
        let alice_addr: SocketAddr = "127.0.0.1:40004".parse().unwrap();
        let bob_addr: SocketAddr = "127.0.0.1:40005".parse().unwrap();
        let outsider_addr: SocketAddr = "127.0.0.1:40006".parse().unwrap();

        let mut alice_rx = register_test_client(&server, alice_addr).await;
        let mut bob_rx = register_test_client(&server, bob_addr).await;
        let mut outsider_rx = register_test_client(&server, outsider_addr).await;

        for (addr, user, post) in [
            (alice_addr, "t2_alice", "t3_post"),
            (bob_addr, "t2_bob", "t3_post"),
            (outsider_addr, "t2_carol", "t3_other"),
        ] {
            dispatch(
                &server,
                addr,
                ClientMessage::Join(JoinRequest {
                    post_id: post.to_string(),
                    user_id: user.to_string(),
                }),
            )
            .await;
        }
        // Drain join traffic
        for rx in [&mut alice_rx, &mut bob_rx, &mut outsider_rx] {
            rx.recv().await.unwrap();
            rx.recv().await.unwrap();
        }

        dispatch(
            &server,
            alice_addr,
            ClientMessage::SubmitScore(SubmitScoreRequest {
                user_id: "t2_alice".to_string(),
                score: 140.0,
                limit: None,
                metadata: None,
            }),
        )
        .await;

        // Bob (same post) hears the update
        match bob_rx.recv().await.unwrap() {
            ServerMessage::LeaderboardUpdate(update) => {
                assert_eq!(update.post_id, "t3_post");
                assert_eq!(update.user_id, "t2_alice");
                assert_eq!(update.top[0].score, 140);
            }
            other => panic!("expected update, got {:?}", other),
        }

        // Carol (different post) hears nothing
        assert!(outsider_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fetch_reflects_other_submissions() {
        let server = test_server();
        server
            .leaderboard
            .upsert_score("t3_post", "t2_bob", 200, Default::default())
            .await
            .unwrap();

        let addr: SocketAddr = "127.0.0.1:40007".parse().unwrap();
        let mut rx = register_test_client(&server, addr).await;
        dispatch(
            &server,
            addr,
            ClientMessage::Join(JoinRequest {
                post_id: "t3_post".to_string(),
                user_id: "t2_alice".to_string(),
            }),
        )
        .await;
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();

        dispatch(
            &server,
            addr,
            ClientMessage::FetchLeaderboard(FetchLeaderboardRequest {
                user_id: "t2_alice".to_string(),
                limit: Some(5),
            }),
        )
        .await;

        match rx.recv().await.unwrap() {
            ServerMessage::Leaderboard(resp) => {
                assert_eq!(resp.top.len(), 1);
                assert_eq!(resp.top[0].user_id, "t2_bob");
                assert_eq!(resp.caller_rank, None); // alice has no entry yet
            }
            other => panic!("expected standings, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let server = test_server();
        let addr: SocketAddr = "127.0.0.1:40008".parse().unwrap();
        let mut rx = register_test_client(&server, addr).await;

        dispatch(&server, addr, ClientMessage::Ping { timestamp: 777 }).await;
        match rx.recv().await.unwrap() {
            ServerMessage::Pong { timestamp, server_time } => {
                assert_eq!(timestamp, 777);
                assert!(server_time > 0);
            }
            other => panic!("expected pong, got {:?}", other),
        }
    }
}
