//! Text command protocol spoken by clients and joining peers
//!
//! Every request and every response is a single line terminated by `\n`:
//!
//! | Request               | Response                                            |
//! |-----------------------|-----------------------------------------------------|
//! | `CONNECT <host:port>` | `OK`                                                |
//! | `STORE <filename>`    | `File stored successfully.`                         |
//! | `RETRIEVE <filename>` | `File found: <filename>` or `File not found.`       |
//! | `DISPLAY`             | `PeerID: <id>, Successor: <id>, Predecessor: <id>`  |
//! | `EXIT`                | connection closes, no reply                         |
//! | anything else         | `Unknown command.`                                  |
//!
//! Malformed requests (missing filename, `CONNECT` without a valid `host:port`)
//! are answered like unknown ones and the connection stays open.

use std::fmt;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::chord::peer::PeerAddress;
use crate::chord::{Chord, RingView};

/// One parsed request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect(PeerAddress),
    Store(String),
    Retrieve(String),
    Display,
    Exit,
    Unknown,
}

impl Command {
    /// Parses a request line
    ///
    /// The verb is the first word and is case sensitive.
    /// Filenames are the rest of the line, so they may contain spaces.
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        let (verb, argument) = match line.split_once(char::is_whitespace) {
            Some((verb, argument)) => (verb, argument.trim()),
            None => (line, ""),
        };
        match verb {
            "CONNECT" => {
                if argument.contains(char::is_whitespace) {
                    return Command::Unknown;
                }
                match argument.parse() {
                    Ok(address) => Command::Connect(address),
                    Err(e) => {
                        debug!("Malformed CONNECT request: {}", e);
                        Command::Unknown
                    }
                }
            }
            "STORE" if !argument.is_empty() => Command::Store(argument.to_owned()),
            "RETRIEVE" if !argument.is_empty() => Command::Retrieve(argument.to_owned()),
            "DISPLAY" => Command::Display,
            "EXIT" => Command::Exit,
            _ => Command::Unknown,
        }
    }

    /// Applies the command to the ring
    ///
    /// Returns `None` for `EXIT`, which is not answered.
    pub fn execute(self, chord: &Chord) -> Option<Response> {
        let response = match self {
            Command::Connect(address) => {
                chord.connect(address);
                Response::Ok
            }
            Command::Store(filename) => {
                chord.store(&filename);
                Response::Stored
            }
            Command::Retrieve(filename) => match chord.retrieve(&filename) {
                Some(filename) => Response::Found(filename),
                None => Response::NotFound,
            },
            Command::Display => Response::Display(chord.display()),
            Command::Exit => return None,
            Command::Unknown => Response::Unknown,
        };
        Some(response)
    }
}

/// One response line, rendered through [`fmt::Display`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok,
    Stored,
    Found(String),
    NotFound,
    Display(RingView),
    Unknown,
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => write!(f, "OK"),
            Response::Stored => write!(f, "File stored successfully."),
            Response::Found(filename) => write!(f, "File found: {}", filename),
            Response::NotFound => write!(f, "File not found."),
            Response::Display(view) => write!(
                f,
                "PeerID: {}, Successor: {}, Predecessor: {}",
                view.id, view.successor, view.predecessor
            ),
            Response::Unknown => write!(f, "Unknown command."),
        }
    }
}

/// Answers commands read from `reader` until `EXIT` or end of stream
///
/// A line that is not valid UTF-8 is answered like an unknown command.
/// Only I/O errors end the session early.
pub(crate) async fn process_commands<R, W>(
    chord: &Chord,
    mut reader: R,
    mut writer: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        let command = match std::str::from_utf8(&line) {
            Ok(line) => Command::parse(line),
            Err(e) => {
                debug!("Request is not valid UTF-8: {}", e);
                Command::Unknown
            }
        };
        debug!("Received command: {:?}", command);
        match command.execute(chord) {
            Some(response) => {
                writer
                    .write_all(format!("{}\n", response).as_bytes())
                    .await?;
                writer.flush().await?;
            }
            None => break,
        }
    }
    Ok(())
}

async fn handle_connection(chord: Chord, stream: TcpStream) -> Result<()> {
    let (reader, writer) = stream.into_split();
    process_commands(&chord, BufReader::new(reader), writer).await
}

/// Binds the command socket and accepts connections until the token is cancelled
///
/// Returns the accept loop and the address actually bound, which differs from
/// `api_address` when port 0 is requested.
/// Every connection is handled by its own task.
/// Connections that are already open are not interrupted by the cancellation.
pub(crate) async fn start_api_server(
    chord: Chord,
    api_address: SocketAddr,
    cancellation_token: CancellationToken,
) -> Result<(JoinHandle<()>, SocketAddr)> {
    let api_listener = TcpListener::bind(api_address)
        .await
        .with_context(|| format!("Failed to start server on {}", api_address))?;
    let api_address = api_listener.local_addr()?;

    // Open channel for inter thread communication
    let (thread_start_tx, mut thread_start_rx) = mpsc::channel(1);

    info!("Server started on {}", api_address);
    let handle = tokio::spawn(async move {
        // Send signal that we are running
        let _ = thread_start_tx.send(()).await;

        loop {
            tokio::select! {
                result = api_listener.accept() => {
                    match result {
                        Ok((stream, remote_address)) => {
                            debug!("Accepted connection from {}", remote_address);
                            let chord = chord.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(chord, stream).await {
                                    warn!("Error in connection from {}: {}", remote_address, e);
                                }
                            });
                        }
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = cancellation_token.cancelled() => {
                    info!("{}: Stopped accepting new connections.", api_address);
                    break;
                }
            }
        }
    });
    // Await thread spawn, so callers can connect right away
    thread_start_rx.recv().await;

    Ok((handle, api_address))
}
