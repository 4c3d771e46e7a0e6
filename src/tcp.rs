//! The TCP module serves the MATH program to RPC clients.
//!
//! [`MathTcpListener`] owns the listening socket. Each accepted connection
//! gets its own task that reassembles RPC records, queues them for ordered
//! processing and writes the replies back. The listener either runs in the
//! caller's task ([`MathTcp::handle_forever`], [`MathTcpListener::handle_until`])
//! or in the background behind a [`ServerHandle`] that stops it.

use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info};

use crate::protocol::rpc;
use crate::service::MathService;

/// TCP listener serving the MATH program with a [`MathService`] implementation.
pub struct MathTcpListener<T: MathService + Send + Sync + 'static> {
    /// TCP Listener for accepting incoming connections
    listener: TcpListener,
    /// Address the listener is bound to
    local_addr: SocketAddr,
    /// Service answering the calls
    service: Arc<T>,
}

/// Serves one client connection until it closes or fails.
///
/// Socket bytes are pushed into the connection's [`rpc::SocketMessageHandler`];
/// replies coming out of it are written back as record-marked fragments.
async fn process_socket(
    mut socket: TcpStream,
    context: rpc::Context,
) -> Result<(), anyhow::Error> {
    let (mut message_handler, mut socksend, mut msgrecvchan) =
        rpc::SocketMessageHandler::new(&context);
    let _ = socket.set_nodelay(true);

    let reader = tokio::spawn(async move {
        loop {
            if let Err(e) = message_handler.read().await {
                debug!("Message loop broken due to {:?}", e);
                break;
            }
        }
    });
    let result = loop {
        tokio::select! {
            _ = socket.readable() => {
                let mut buf = [0; 16_384];

                match socket.try_read(&mut buf) {
                    Ok(0) => break Ok(()),
                    Ok(n) => {
                        if socksend.write_all(&buf[..n]).await.is_err() {
                            break Err(anyhow::anyhow!("RPC record reader stopped"));
                        }
                    }
                    Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {}
                    Err(e) => break Err(e.into()),
                }
            },
            reply = msgrecvchan.recv() => {
                match reply {
                    Some(Ok(msg)) => {
                        if let Err(e) = rpc::write_fragment(&mut socket, &msg).await {
                            error!("Write error {:?}", e);
                            break Err(e.into());
                        }
                    }
                    Some(Err(e)) => break Err(e),
                    None => break Err(anyhow::anyhow!("Unexpected socket context termination")),
                }
            }
        }
    };
    reader.abort();
    result
}

/// Common operations of a MATH TCP server.
#[async_trait]
pub trait MathTcp: Send + Sync {
    /// Returns the port the server is listening on.
    ///
    /// Useful after binding port 0 to learn which port the OS assigned.
    fn get_listen_port(&self) -> u16;

    /// Returns the IP address the server is listening on.
    fn get_listen_ip(&self) -> IpAddr;

    /// Accepts and serves connections until the listener itself fails.
    async fn handle_forever(&self) -> io::Result<()>;
}

impl<T: MathService + Send + Sync + 'static> MathTcpListener<T> {
    /// Binds a listener to `ipstr` ("IP:PORT" or "host:PORT").
    ///
    /// Port 0 lets the OS pick a free port; see [`MathTcp::get_listen_port`].
    pub async fn bind(ipstr: &str, service: T) -> io::Result<MathTcpListener<T>> {
        let listener = TcpListener::bind(ipstr).await?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {:?}", local_addr);

        Ok(MathTcpListener { listener, local_addr, service: Arc::new(service) })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts and serves connections until `shutdown` resolves.
    ///
    /// Connections still open at that point are closed before returning.
    pub async fn handle_until<F>(&self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let mut connections = JoinSet::new();
        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopped accepting connections on {:?}", self.local_addr);
                    break Ok(());
                }
                accepted = self.listener.accept() => {
                    let (socket, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => break Err(e),
                    };
                    let context = rpc::Context {
                        client_addr: peer.to_string(),
                        service: self.service.clone(),
                    };
                    info!("Accepting connection from {}", context.client_addr);
                    connections.spawn(async move {
                        if let Err(e) = process_socket(socket, context).await {
                            debug!("Connection closed with error: {:?}", e);
                        }
                    });
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        };
        connections.shutdown().await;
        result
    }

    /// Runs the listener on a background task.
    ///
    /// The server keeps running until [`ServerHandle::stop`] is called or
    /// the handle is dropped.
    pub fn spawn(self) -> ServerHandle {
        let (shutdown, signal) = oneshot::channel::<()>();
        let local_addr = self.local_addr;
        let task = tokio::spawn(async move {
            self.handle_until(async move {
                let _ = signal.await;
            })
            .await
        });
        ServerHandle { local_addr, shutdown, task }
    }
}

#[async_trait]
impl<T: MathService + Send + Sync + 'static> MathTcp for MathTcpListener<T> {
    fn get_listen_port(&self) -> u16 {
        self.local_addr.port()
    }

    fn get_listen_ip(&self) -> IpAddr {
        self.local_addr.ip()
    }

    async fn handle_forever(&self) -> io::Result<()> {
        self.handle_until(std::future::pending()).await
    }
}

/// Owned handle to a server started with [`MathTcpListener::spawn`].
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    /// Returns the address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections, closes the open ones and waits for the
    /// server task to finish.
    pub async fn stop(self) -> io::Result<()> {
        let _ = self.shutdown.send(());
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(io::Error::other(e)),
        }
    }
}
