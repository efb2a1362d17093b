//! WebSocket Reward Server
//!
//! Async WebSocket endpoint where clients authenticate and claim race
//! rewards. Each connection runs on its own task; the reward service is
//! shared.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::Instant;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::network::protocol::{
    AuthRequest, AuthResult, ClientMessage, ErrorCode, ServerError, ServerMessage,
};
use crate::reward::claim::{now_ms, ClaimRequest};
use crate::reward::minter::TokenMinter;
use crate::reward::service::RewardService;
use crate::reward::wallet::{WalletAddress, WalletDirectory};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Authenticated sessions expire after this much inactivity.
    pub idle_timeout: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            version: crate::VERSION.to_string(),
        }
    }
}

/// Reward server errors.
#[derive(Debug, thiserror::Error)]
pub enum RewardServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// Wallet resolved at auth.
    wallet: Option<WalletAddress>,
    /// Last activity.
    last_activity: Instant,
}

type Clients = Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>;

/// The reward server.
pub struct RewardServer<M: TokenMinter, D: WalletDirectory> {
    /// Server configuration.
    config: ServerConfig,
    /// Claim verification and minting.
    service: Arc<RewardService<M>>,
    /// Token-to-wallet lookup.
    directory: Arc<D>,
    /// Connected clients.
    clients: Clients,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl<M, D> RewardServer<M, D>
where
    M: TokenMinter + 'static,
    D: WalletDirectory + 'static,
{
    /// Create a new reward server.
    pub fn new(config: ServerConfig, service: RewardService<M>, directory: D) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            service: Arc::new(service),
            directory: Arc::new(directory),
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Bind the configured address and run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), RewardServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.run_on(listener).await
    }

    /// Run the server on an already-bound listener.
    pub async fn run_on(&self, listener: TcpListener) -> Result<(), RewardServerError> {
        info!("Reward server listening on {}", listener.local_addr()?);

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
                                warn!("Connection limit reached, rejecting {}", addr);
                                Self::reject_overloaded(stream, addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();
        Ok(())
    }

    /// Periodically forget sessions that have gone idle.
    ///
    /// Sweeps twice per `idle_timeout`, so a session is forgotten at most
    /// one and a half timeouts after its last message.
    async fn run_cleanup_loop(clients: Clients, idle_timeout: Duration) {
        let sweep = (idle_timeout / 2).max(Duration::from_millis(100));
        let mut interval = tokio::time::interval(sweep);

        loop {
            interval.tick().await;
            let now = Instant::now();

            let mut clients = clients.write().await;
            for (addr, client) in clients.iter_mut() {
                let idle = now.duration_since(client.last_activity);
                if client.wallet.is_some() && idle > idle_timeout {
                    client.wallet = None;
                    info!("Expired idle session for {}", addr);
                }
            }
        }
    }

    /// Tell a client over the connection limit to go away.
    fn reject_overloaded(stream: TcpStream, addr: SocketAddr) {
        tokio::spawn(async move {
            let mut ws = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    debug!("Handshake with rejected client {} failed: {}", addr, e);
                    return;
                }
            };

            let reply = ServerMessage::Error(ServerError::new(
                ErrorCode::ServerOverloaded,
                "Connection limit reached",
            ));
            if let Ok(text) = reply.to_json() {
                let _ = ws.send(Message::Text(text)).await;
            }
            let _ = ws.close(None).await;
        });
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let service = self.service.clone();
        let directory = self.directory.clone();
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            // Register client
            clients.write().await.insert(addr, ConnectedClient {
                wallet: None,
                last_activity: Instant::now(),
            });

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
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
                        let parsed = match msg {
                            Some(Ok(Message::Text(text))) => ClientMessage::from_json(&text),
                            Some(Ok(Message::Binary(data))) => ClientMessage::from_slice(&data),
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => continue,
                        };

                        let client_msg = match parsed {
                            Ok(m) => m,
                            Err(e) => {
                                debug!("Invalid message from {}: {}", addr, e);
                                let _ = msg_tx.send(ServerMessage::Error(ServerError::new(
                                    ErrorCode::InvalidInput,
                                    "Invalid message format",
                                ))).await;
                                continue;
                            }
                        };

                        if let Some(client) = clients.write().await.get_mut(&addr) {
                            client.last_activity = Instant::now();
                        }

                        let reply = Self::handle_client_message(
                            addr,
                            client_msg,
                            &clients,
                            &service,
                            &directory,
                            &config,
                        ).await;
                        if msg_tx.send(reply).await.is_err() {
                            break;
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued replies flush before tearing down
            drop(msg_tx);
            let _ = sender_task.await;

            clients.write().await.remove(&addr);
            info!("Client {} cleaned up", addr);
        });
    }

    /// Handle a client message and produce the reply.
    async fn handle_client_message(
        addr: SocketAddr,
        msg: ClientMessage,
        clients: &Clients,
        service: &RewardService<M>,
        directory: &D,
        config: &ServerConfig,
    ) -> ServerMessage {
        match msg {
            ClientMessage::Auth(auth) => {
                Self::handle_auth(addr, auth, clients, directory, config).await
            }
            ClientMessage::ClaimRewards(claim) => {
                Self::handle_claim(addr, claim, clients, service).await
            }
            ClientMessage::Ping { timestamp } => ServerMessage::Pong {
                timestamp,
                server_time: now_ms().max(0) as u64,
            },
        }
    }

    /// Resolve the session token to a wallet.
    async fn handle_auth(
        addr: SocketAddr,
        auth: AuthRequest,
        clients: &Clients,
        directory: &D,
        config: &ServerConfig,
    ) -> ServerMessage {
        let wallet = directory.resolve(&auth.token).await;

        if let Some(client) = clients.write().await.get_mut(&addr) {
            client.wallet = wallet;
        }

        match wallet {
            Some(wallet) => {
                info!(
                    "Client {} authenticated as {} (client version {:?})",
                    addr,
                    wallet.short(),
                    auth.client_version
                );
                ServerMessage::AuthResult(AuthResult {
                    success: true,
                    wallet: Some(wallet),
                    server_version: config.version.clone(),
                    error: None,
                })
            }
            None => {
                warn!("Client {} sent an unknown token", addr);
                ServerMessage::AuthResult(AuthResult {
                    success: false,
                    wallet: None,
                    server_version: config.version.clone(),
                    error: Some("Unknown session token".to_string()),
                })
            }
        }
    }

    /// Verify and mint a claim for the authenticated wallet.
    async fn handle_claim(
        addr: SocketAddr,
        claim: ClaimRequest,
        clients: &Clients,
        service: &RewardService<M>,
    ) -> ServerMessage {
        let wallet = clients.read().await.get(&addr).and_then(|c| c.wallet);
        let Some(wallet) = wallet else {
            return ServerMessage::Error(ServerError::new(
                ErrorCode::Unauthorized,
                "Not authenticated",
            ));
        };

        match service.claim(wallet, &claim, now_ms()).await {
            Ok(receipt) => ServerMessage::RewardClaimed(receipt),
            Err(e) => ServerMessage::Error(ServerError::from(&e)),
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

    /// The shared reward service.
    pub fn service(&self) -> &RewardService<M> {
        &self.service
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThirdwebConfig;
    use crate::reward::claim::GameStats;
    use crate::reward::minter::DryRunMinter;
    use crate::reward::wallet::InMemoryWalletDirectory;
    use std::time::Duration;
    use tokio_tungstenite::connect_async;

    const WALLET: &str = "0x2222222222222222222222222222222222222222";

    type TestServer = RewardServer<DryRunMinter, InMemoryWalletDirectory>;

    async fn test_server(config: ServerConfig) -> TestServer {
        let directory = InMemoryWalletDirectory::new();
        directory.insert("good-token", WALLET.parse().unwrap()).await;

        let service =
            RewardService::new(DryRunMinter::new(), ThirdwebConfig::default(), 86_400_000);
        RewardServer::new(config, service, directory)
    }

    async fn start_server() -> (Arc<TestServer>, SocketAddr) {
        start_server_with(ServerConfig::default()).await
    }

    async fn start_server_with(config: ServerConfig) -> (Arc<TestServer>, SocketAddr) {
        let server = Arc::new(test_server(config).await);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let runner = server.clone();
        tokio::spawn(async move { runner.run_on(listener).await });

        (server, addr)
    }

    fn claim(timestamp: i64) -> ClaimRequest {
        ClaimRequest {
            amount: 2,
            game_stats: GameStats { best_time: Some(20_000.0), total_races: 1 },
            timestamp,
        }
    }

    fn claim_json(timestamp: i64) -> String {
        ClientMessage::ClaimRewards(claim(timestamp)).to_json().unwrap()
    }

    async fn next_reply<S>(stream: &mut S) -> ServerMessage
    where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        let msg = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        ServerMessage::from_json(msg.to_text().unwrap()).unwrap()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let service = RewardService::new(DryRunMinter::new(), ThirdwebConfig::default(), 1);
        let server =
            RewardServer::new(ServerConfig::default(), service, InMemoryWalletDirectory::new());
        assert_eq!(server.connection_count().await, 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_claim_requires_auth() {
        let (server, addr) = start_server().await;
        let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();

        ws.send(Message::Text(claim_json(now_ms()))).await.unwrap();
        match next_reply(&mut ws).await {
            ServerMessage::Error(e) => assert_eq!(e.code, ErrorCode::Unauthorized),
            other => panic!("unexpected reply: {other:?}"),
        }
        assert!(server.service().minter().calls().await.is_empty());

        server.shutdown();
    }

    #[tokio::test]
    async fn test_auth_then_claim() {
        let (server, addr) = start_server().await;
        let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();

        ws.send(Message::Text(r#"{"type":"auth","token":"good-token"}"#.to_string()))
            .await
            .unwrap();
        match next_reply(&mut ws).await {
            ServerMessage::AuthResult(result) => {
                assert!(result.success);
                assert_eq!(result.wallet, Some(WALLET.parse::<WalletAddress>().unwrap()));
            }
            other => panic!("unexpected reply: {other:?}"),
        }

        ws.send(Message::Text(claim_json(now_ms()))).await.unwrap();
        match next_reply(&mut ws).await {
            ServerMessage::RewardClaimed(receipt) => assert_eq!(receipt.amount, 2),
            other => panic!("unexpected reply: {other:?}"),
        }
        assert_eq!(server.service().minter().calls().await.len(), 1);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_stale_claim_over_wire() {
        let (server, addr) = start_server().await;
        let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();

        ws.send(Message::Text(r#"{"type":"auth","token":"good-token"}"#.to_string()))
            .await
            .unwrap();
        next_reply(&mut ws).await;

        let stale = now_ms() - 2 * 86_400_000;
        ws.send(Message::Text(claim_json(stale))).await.unwrap();
        match next_reply(&mut ws).await {
            ServerMessage::Error(e) => assert_eq!(e.code, ErrorCode::VerificationFailed),
            other => panic!("unexpected reply: {other:?}"),
        }
        assert!(server.service().minter().calls().await.is_empty());

        server.shutdown();
    }

    #[tokio::test]
    async fn test_bad_token_and_garbage() {
        let (server, addr) = start_server().await;
        let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();

        ws.send(Message::Text(r#"{"type":"auth","token":"nope"}"#.to_string()))
            .await
            .unwrap();
        match next_reply(&mut ws).await {
            ServerMessage::AuthResult(result) => assert!(!result.success),
            other => panic!("unexpected reply: {other:?}"),
        }

        ws.send(Message::Text("not json".to_string())).await.unwrap();
        match next_reply(&mut ws).await {
            ServerMessage::Error(e) => assert_eq!(e.code, ErrorCode::InvalidInput),
            other => panic!("unexpected reply: {other:?}"),
        }

        ws.send(Message::Binary(br#"{"type":"ping","timestamp":7}"#.to_vec())).await.unwrap();
        match next_reply(&mut ws).await {
            ServerMessage::Pong { timestamp, .. } => assert_eq!(timestamp, 7),
            other => panic!("unexpected reply: {other:?}"),
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn test_connection_limit_sends_overloaded() {
        let config = ServerConfig {
            max_connections: 0,
            ..ServerConfig::default()
        };
        let (server, addr) = start_server_with(config).await;
        let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();

        match next_reply(&mut ws).await {
            ServerMessage::Error(e) => assert_eq!(e.code, ErrorCode::ServerOverloaded),
            other => panic!("unexpected reply: {other:?}"),
        }
        assert_eq!(server.connection_count().await, 0);

        server.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_expires() {
        let idle_timeout = Duration::from_secs(10);
        let server = test_server(ServerConfig {
            idle_timeout,
            ..ServerConfig::default()
        })
        .await;
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        server.clients.write().await.insert(addr, ConnectedClient {
            wallet: None,
            last_activity: Instant::now(),
        });

        let auth = AuthRequest {
            token: "good-token".to_string(),
            client_version: "1.0.0".to_string(),
        };
        let reply =
            TestServer::handle_auth(addr, auth, &server.clients, &server.directory, &server.config)
                .await;
        assert!(matches!(reply, ServerMessage::AuthResult(AuthResult { success: true, .. })));

        let sweeper =
            tokio::spawn(TestServer::run_cleanup_loop(server.clients.clone(), idle_timeout));

        // Still inside the timeout
        tokio::time::sleep(idle_timeout / 2).await;
        assert!(server.clients.read().await[&addr].wallet.is_some());

        tokio::time::sleep(idle_timeout * 2).await;
        assert!(server.clients.read().await[&addr].wallet.is_none());

        let reply =
            TestServer::handle_claim(addr, claim(now_ms()), &server.clients, &server.service)
                .await;
        match reply {
            ServerMessage::Error(e) => assert_eq!(e.code, ErrorCode::Unauthorized),
            other => panic!("unexpected reply: {other:?}"),
        }
        assert!(server.service.minter().calls().await.is_empty());

        sweeper.abort();
    }
}
