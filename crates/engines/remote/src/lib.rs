//! Remote Controller
//!
//! Delegates every decision to an external decision service. The protocol is
//! one JSON object per line in each direction:
//!
//! ```text
//! -> {"player":"LLM(1)-Burn","turn":3,"life":17,"opponents":[...],"hand":[...]}
//! <- {"choice":2}
//! ```
//!
//! A `null` choice passes the turn. Connection problems after the initial
//! connect are reported as recoverable faults so a tournament can retry the
//! game instead of aborting the run; the next decision opens a fresh
//! connection.

use serde::Deserialize;
use sim_core::{Controller, DecisionView, GameFault};
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;


#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("invalid decision service endpoint `{0}`")]
    InvalidEndpoint(String),
    #[error("could not connect to decision service at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
}

/// Timeouts for talking to the decision service
#[derive(Debug, Clone, Copy)]
pub struct RemoteOptions {
    /// Upper bound on establishing the connection
    pub connect_timeout: Duration,
    /// Upper bound on waiting for a single decision
    pub decision_timeout: Duration,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            decision_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DecisionResponse {
    choice: Option<usize>,
}

/// One open line-protocol session with the decision service
struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Connection {
    fn open(addr: &SocketAddr, options: &RemoteOptions) -> io::Result<Self> {
        let stream = TcpStream::connect_timeout(addr, options.connect_timeout)?;
        stream.set_read_timeout(Some(options.decision_timeout))?;
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            reader,
            writer: stream,
        })
    }

    fn exchange(&mut self, view: &DecisionView) -> io::Result<String> {
        let mut request = serde_json::to_string(view)?;
        request.push('\n');
        self.writer.write_all(request.as_bytes())?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "decision service closed the connection",
            ));
        }
        Ok(line)
    }
}

pub struct RemoteController {
    name: String,
    endpoint: String,
    addrs: Vec<SocketAddr>,
    options: RemoteOptions,
    /// `None` after an I/O failure; the next decision reconnects.
    connection: Option<Connection>,
}

impl RemoteController {
    /// Connect to the decision service at `endpoint` (`host:port`, an optional
    /// `http://` prefix is ignored).
    ///
    /// Never blocks longer than `options.connect_timeout` per resolved address.
    pub fn connect(
        name: impl Into<String>,
        endpoint: &str,
        options: RemoteOptions,
    ) -> Result<Self, RemoteError> {
        let endpoint = normalize_endpoint(endpoint);
        let addrs: Vec<SocketAddr> = endpoint
            .to_socket_addrs()
            .map_err(|_| RemoteError::InvalidEndpoint(endpoint.clone()))?
            .collect();
        if addrs.is_empty() {
            return Err(RemoteError::InvalidEndpoint(endpoint));
        }

        let mut controller = Self {
            name: name.into(),
            endpoint,
            addrs,
            options,
            connection: None,
        };
        match controller.open() {
            Ok(connection) => {
                controller.connection = Some(connection);
                Ok(controller)
            }
            Err(source) => Err(RemoteError::Connect {
                endpoint: controller.endpoint,
                source,
            }),
        }
    }

    fn open(&self) -> io::Result<Connection> {
        let mut last_error = io::Error::other("no address tried");
        for addr in &self.addrs {
            match Connection::open(addr, &self.options) {
                Ok(connection) => {
                    debug!(player = %self.name, %addr, "connected to decision service");
                    return Ok(connection);
                }
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }

    /// A reply that arrives after a timeout would answer the wrong request, so
    /// any I/O failure discards the connection.
    fn exchange(&mut self, view: &DecisionView) -> io::Result<String> {
        let mut connection = match self.connection.take() {
            Some(connection) => connection,
            None => self.open()?,
        };
        let line = connection.exchange(view)?;
        self.connection = Some(connection);
        Ok(line)
    }
}

impl Controller for RemoteController {
    fn choose(&mut self, view: &DecisionView) -> Result<Option<usize>, GameFault> {
        let line = self.exchange(view).map_err(|e| {
            GameFault::Recoverable(format!("decision service {}: {}", self.endpoint, e))
        })?;
        let response: DecisionResponse = serde_json::from_str(line.trim()).map_err(|e| {
            GameFault::Recoverable(format!("malformed decision `{}`: {}", line.trim(), e))
        })?;
        Ok(response.choice)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// `http://localhost:7861/` -> `localhost:7861`
pub fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    let without_scheme = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("tcp://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_string()
}
