use anyhow::{anyhow, Context, Result};
use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::chord::peer::PeerAddress;

/// Connection to a peer's command socket
///
/// Sends one request line at a time and waits for the single response line.
pub struct RingClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl RingClient {
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))
            .await
            .with_context(|| format!("Failed to connect to peer {}:{}", host, port))?;
        let (reader, writer) = stream.into_split();
        Ok(RingClient {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    /// Sends `request` and returns the response line without its terminator
    pub async fn send(&mut self, request: &str) -> Result<String> {
        self.write_line(request).await?;
        let response = self
            .lines
            .next_line()
            .await?
            .ok_or_else(|| anyhow!("Connection closed by peer"))?;
        debug!("{} -> {}", request, response);
        Ok(response)
    }

    pub async fn store(&mut self, filename: &str) -> Result<String> {
        self.send(&format!("STORE {}", filename)).await
    }

    pub async fn retrieve(&mut self, filename: &str) -> Result<String> {
        self.send(&format!("RETRIEVE {}", filename)).await
    }

    pub async fn display(&mut self) -> Result<String> {
        self.send("DISPLAY").await
    }

    /// Asks the peer to splice `address` into its ring
    pub async fn connect_peer(&mut self, address: &PeerAddress) -> Result<String> {
        self.send(&format!("CONNECT {}", address)).await
    }

    /// Ends the session; the peer closes the connection without answering
    pub async fn exit(mut self) -> Result<()> {
        self.write_line("EXIT").await?;
        self.writer.shutdown().await?;
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}
