//! Text protocol server.
//!
//! Exposes a [`Device`] over any [`Transport`]: pushed commits go out as
//! `<path> <args>` lines, inbound set lines are delivered into the tree, and
//! `?get` / `?namespace` requests are answered.
//!
//! The server is registered on the device as a [`Protocol`], so the device
//! keeps it alive. [`TextServer::run`] detaches it when the loop ends;
//! call [`TextServer::detach`] yourself if you never run it.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::text::{self, TextMessage};
use super::transport::{Transport, UdpTransport};
use super::wire;
use super::{Commit, Origin, Protocol, ProtocolId};
use crate::net::Device;
use crate::{Error, Result};

pub struct TextServer {
    name: String,
    device: Device,
    outbound: mpsc::UnboundedSender<Bytes>,
    id: OnceLock<ProtocolId>,
}

impl std::fmt::Debug for TextServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextServer").field("name", &self.name).field("id", &self.id.get()).finish()
    }
}

impl TextServer {
    /// Register a new server on `device`. The receiver yields the encoded
    /// commits to send; hand it to [`TextServer::run`].
    pub fn expose(device: &Device, name: impl Into<String>) -> (Arc<Self>, mpsc::UnboundedReceiver<Bytes>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let server = Arc::new(Self { name: name.into(), device: device.clone(), outbound, id: OnceLock::new() });
        let id = device.expose_to(server.clone());
        // Freshly created, so the cell is empty.
        let _ = server.id.set(id);
        (server, rx)
    }

    /// Expose `device` over UDP and spawn the server loop.
    pub async fn bind(
        device: &Device,
        name: impl Into<String>,
        local: SocketAddr,
        peer: SocketAddr,
    ) -> Result<(Arc<Self>, JoinHandle<Result<()>>)> {
        let transport = Arc::new(UdpTransport::bind(local, peer).await?);
        let (server, outbound) = Self::expose(device, name);
        let handle = tokio::spawn(server.clone().run(transport, outbound));
        Ok((server, handle))
    }

    pub fn id(&self) -> Option<ProtocolId> {
        self.id.get().copied()
    }

    fn origin(&self) -> Origin {
        self.id().map_or(Origin::Local, Origin::Remote)
    }

    /// Remove the server from its device. Returns `false` if it was not
    /// registered.
    pub fn detach(&self) -> bool {
        self.id().is_some_and(|id| self.device.remove_protocol(id))
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Apply one inbound message; returns the reply, if any.
    pub fn handle(&self, message: TextMessage) -> Option<TextMessage> {
        match message {
            TextMessage::Set { path, args } | TextMessage::GetReply { path, args } => {
                match self.device.deliver(&path, &args, self.origin()) {
                    Ok(outcome) => debug!(server = %self.name, path = %path, ?outcome, "delivered"),
                    Err(Error::PathNotFound(_)) => warn!(server = %self.name, path = %path, "set on unknown path"),
                    Err(e) => debug!(server = %self.name, path = %path, error = %e, "set rejected"),
                }
                None
            }
            TextMessage::Get { path } => match self.device.resolve(&path) {
                Some(address) => {
                    let args = wire::encode(&address.fetch_value()).into_vec();
                    Some(TextMessage::GetReply { path, args })
                }
                None => {
                    warn!(server = %self.name, path = %path, "get on unknown path");
                    None
                }
            },
            TextMessage::Namespace { path } => match self.device.find_node(&path) {
                Some(node) => {
                    let children = self.device.child_names(node);
                    Some(TextMessage::NamespaceReply { path, children })
                }
                None => {
                    warn!(server = %self.name, path = %path, "namespace on unknown path");
                    None
                }
            },
            TextMessage::NamespaceReply { path, children } => {
                debug!(server = %self.name, path = %path, count = children.len(), "namespace reply ignored");
                None
            }
        }
    }

    /// Parse and apply every line of a packet; returns the replies in order.
    pub fn handle_packet(&self, packet: &[u8]) -> Vec<TextMessage> {
        let Ok(text) = std::str::from_utf8(packet) else {
            warn!(server = %self.name, len = packet.len(), "dropping non-utf8 packet");
            return Vec::new();
        };
        text::parse_packet(text)
            .into_iter()
            .filter_map(|parsed| match parsed {
                Ok(message) => self.handle(message),
                Err(e) => {
                    debug!(server = %self.name, error = %e, "malformed line");
                    None
                }
            })
            .collect()
    }

    // ========================================================================
    // Loop
    // ========================================================================

    /// Pump both directions until the transport ends or fails.
    pub async fn run<T>(self: Arc<Self>, transport: Arc<T>, mut outbound: mpsc::UnboundedReceiver<Bytes>) -> Result<()>
    where
        T: Transport + ?Sized,
    {
        info!(server = %self.name, id = ?self.id(), "text server started");
        let result = loop {
            tokio::select! {
                inbound = transport.recv() => match inbound {
                    Ok(Some(packet)) => {
                        let mut failed = None;
                        for reply in self.handle_packet(&packet) {
                            if let Err(e) = transport.send(Bytes::from(reply.to_string())).await {
                                failed = Some(e);
                                break;
                            }
                        }
                        if let Some(e) = failed {
                            break Err(e);
                        }
                    }
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e),
                },
                Some(packet) = outbound.recv() => {
                    if let Err(e) = transport.send(packet).await {
                        break Err(e);
                    }
                }
            }
        };
        self.detach();
        match &result {
            Ok(()) => info!(server = %self.name, "text server stopped"),
            Err(e) => warn!(server = %self.name, error = %e, "text server failed"),
        }
        result
    }
}

impl Protocol for TextServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_commit(&self, commit: &Commit<'_>) -> Result<()> {
        if commit.origin == self.origin() && commit.origin != Origin::Local {
            return Ok(());
        }
        let line = TextMessage::Set { path: commit.path.to_owned(), args: commit.arguments.to_vec() };
        self.outbound
            .send(Bytes::from(line.to_string()))
            .map_err(|_| Error::Protocol(format!("{} is not running", self.name)))
    }
}
