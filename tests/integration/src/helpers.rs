//! Test helpers for integration tests
//!
//! Provides a relay server bound to an ephemeral port and a small WebSocket client
//! that speaks the relay's JSON frames.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use relay_common::RelaySettings;
use relay_gateway::protocol::{Message, OnlineUser};
use relay_gateway::{create_app, GatewayState};
use reqwest::{Client, StatusCode};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{self, Message as Frame};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Upper bound for any single wait in a test
pub const WAIT: Duration = Duration::from_secs(2);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with default settings
    pub async fn start() -> Result<Self> {
        Self::start_with_settings(RelaySettings::default()).await
    }

    /// Start a test server with custom relay settings
    pub async fn start_with_settings(settings: RelaySettings) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = create_app(GatewayState::new(&settings));

        let handle = tokio::spawn(async move {
            relay_gateway::server::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(WAIT).build()?;

        Ok(Self {
            addr,
            client,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket URL for a username
    pub fn ws_url(&self, username: &str) -> String {
        format!("ws://{}/ws?username={}", self.addr, username)
    }

    /// Open a WebSocket connection and wait until the relay has announced it
    ///
    /// The announcing presence list is consumed and kept in `TestClient::roster`.
    pub async fn connect(&self, username: &str) -> Result<TestClient> {
        let mut client = self.connect_raw(username).await?;
        client.roster = client.wait_for_presence_containing(username).await?;
        Ok(client)
    }

    /// Open a WebSocket connection without waiting for anything
    pub async fn connect_raw(&self, username: &str) -> Result<TestClient> {
        let (socket, _) = connect_async(self.ws_url(username)).await?;
        Ok(TestClient {
            username: username.to_string(),
            roster: Vec::new(),
            socket,
        })
    }

    /// Attempt a handshake expected to be refused; returns the HTTP status
    pub async fn connect_rejected(&self, username: &str) -> Result<StatusCode> {
        match connect_async(self.ws_url(username)).await {
            Ok(_) => bail!("handshake for {username:?} unexpectedly succeeded"),
            Err(tungstenite::Error::Http(response)) => {
                Ok(StatusCode::from_u16(response.status().as_u16())?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Query the online users
    pub async fn online_users(&self) -> Result<Vec<OnlineUser>> {
        let response = self
            .client
            .get(format!("{}/users", self.base_url()))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            bail!("Expected status 200, got {}", response.status());
        }

        Ok(response.json().await?)
    }

    /// Poll the presence query until it matches `expected` or the wait runs out
    pub async fn wait_for_online(&self, expected: &[&str]) -> Result<()> {
        let expected: Vec<OnlineUser> = expected.iter().map(|u| OnlineUser::new(*u)).collect();

        timeout(WAIT, async {
            loop {
                if self.online_users().await? == expected {
                    return Ok::<_, anyhow::Error>(());
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .with_context(|| format!("online users never became {expected:?}"))?
    }
}

/// A connected WebSocket client
pub struct TestClient {
    pub username: String,
    /// Presence list that announced this client, empty for raw connections
    pub roster: Vec<String>,
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Send a raw text frame
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.socket.send(Frame::Text(text.into())).await?;
        Ok(())
    }

    /// Send a chat message
    pub async fn send_chat(&mut self, to: &str, content: &str) -> Result<()> {
        let text = serde_json::json!({ "to": to, "content": content }).to_string();
        self.send_text(text).await
    }

    /// Ask the relay to log this client out
    pub async fn logout(&mut self) -> Result<()> {
        let text = Message::logout(self.username.clone()).to_json()?;
        self.send_text(text).await
    }

    /// Receive the next relay message
    pub async fn next_message(&mut self) -> Result<Message> {
        loop {
            let frame = timeout(WAIT, self.socket.next())
                .await
                .context("timed out waiting for a frame")?
                .context("connection closed")??;

            match frame {
                Frame::Text(text) => return Ok(Message::from_json(&text)?),
                Frame::Close(_) => bail!("connection closed by relay"),
                _ => continue,
            }
        }
    }

    /// Receive messages until a chat message arrives
    pub async fn next_chat(&mut self) -> Result<Message> {
        loop {
            let message = self.next_message().await?;
            if matches!(message, Message::Chat { .. }) {
                return Ok(message);
            }
        }
    }

    /// Receive messages until a presence list containing `username` arrives
    pub async fn wait_for_presence_containing(&mut self, username: &str) -> Result<Vec<String>> {
        loop {
            if let Message::PresenceList { users } = self.next_message().await? {
                if users.iter().any(|u| u == username) {
                    return Ok(users);
                }
            }
        }
    }

    /// Receive messages until a presence list equal to `expected` arrives
    pub async fn wait_for_presence(&mut self, expected: &[&str]) -> Result<()> {
        loop {
            if let Message::PresenceList { users } = self.next_message().await? {
                if users == expected {
                    return Ok(());
                }
            }
        }
    }

    /// Wait until the relay closes this connection
    pub async fn wait_for_close(&mut self) -> Result<()> {
        timeout(WAIT, async {
            while let Some(frame) = self.socket.next().await {
                if frame.is_err() || matches!(frame, Ok(Frame::Close(_))) {
                    break;
                }
            }
        })
        .await
        .context("relay never closed the connection")
    }

    /// Close the connection from the client side
    pub async fn close(mut self) -> Result<()> {
        self.socket.close(None).await?;
        Ok(())
    }

    /// Drop the TCP connection without a close handshake
    pub fn abort(self) {
        drop(self.socket);
    }
}
