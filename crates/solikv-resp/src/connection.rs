use std::io;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::codec::{RespCodec, RespFrame};
use crate::parser::Command;

/// A client connection to a Redis-compatible server.
///
/// Every network step (connect, send, receive) is bounded by `timeout`.
/// The socket is closed when the connection is dropped.
#[derive(Debug)]
pub struct Connection {
    framed: Framed<TcpStream, RespCodec>,
    peer: String,
    timeout: Duration,
}

impl Connection {
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> io::Result<Self> {
        let peer = format!("{}:{}", host, port);
        let socket = bounded(timeout, &peer, TcpStream::connect((host, port))).await??;
        let _ = socket.set_nodelay(true);
        tracing::trace!(peer = %peer, "connected");
        Ok(Self {
            framed: Framed::new(socket, RespCodec::new()),
            peer,
            timeout,
        })
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Send one command and wait for its reply.
    pub async fn request(&mut self, cmd: Command) -> io::Result<RespFrame> {
        let name = cmd.name.clone();
        bounded(self.timeout, &self.peer, self.framed.send(cmd.into_frame())).await??;
        let reply = bounded(self.timeout, &self.peer, self.framed.next()).await?;
        match reply {
            Some(frame) => {
                let frame = frame?;
                tracing::trace!(peer = %self.peer, command = %name, reply = ?frame, "reply");
                Ok(frame)
            }
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} closed the connection during {}", self.peer, name),
            )),
        }
    }
}

async fn bounded<F: std::future::Future>(timeout: Duration, peer: &str, fut: F) -> io::Result<F::Output> {
    tokio::time::timeout(timeout, fut).await.map_err(|_| {
        io::Error::new(
            io::ErrorKind::TimedOut,
            format!("{} did not answer within {:?}", peer, timeout),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn one_shot_server(reply: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = BytesMut::with_capacity(1024);
            let _ = socket.read_buf(&mut buf).await;
            let _ = socket.write_all(reply).await;
        });
        port
    }

    #[tokio::test]
    async fn test_request_reply() {
        let port = one_shot_server(b"+PONG\r\n").await;
        let mut conn = Connection::connect("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap();
        let reply = conn.request(Command::ping()).await.unwrap();
        assert_eq!(reply.text().as_deref(), Some("PONG"));
        assert_eq!(conn.peer(), format!("127.0.0.1:{}", port));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(Connection::connect("127.0.0.1", port, Duration::from_secs(1))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let mut conn = Connection::connect("127.0.0.1", port, Duration::from_millis(100))
            .await
            .unwrap();
        let err = conn.request(Command::ping()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn test_closed_connection_is_eof() {
        let port = one_shot_server(b"").await;
        let mut conn = Connection::connect("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap();
        let err = conn.request(Command::ping()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
