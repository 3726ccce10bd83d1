use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BusError;

/// Directory holding IPC sockets addressed by bare name.
pub const IPC_DIR: &str = "/tmp/edgekb";

/// Transport layer for ZeroMQ connections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "address")]
pub enum Transport {
    /// Inter-process communication via Unix domain sockets.
    ///
    /// A bare name maps to `/tmp/edgekb/<name>.sock`; a value starting with
    /// `/` is used as the socket path as-is.
    Ipc(String),

    /// TCP transport, for nodes talking across hosts and for tests.
    Tcp { host: String, port: u16 },
}

impl Transport {
    /// Create an IPC transport with the given socket name or absolute path.
    pub fn ipc(name: &str) -> Self {
        Self::Ipc(name.to_string())
    }

    /// Create a TCP transport with the given host and port.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Parse an endpoint like `ipc:///tmp/edgekb/kb.sock` or `tcp://host:port`.
    pub fn parse(endpoint: &str) -> Result<Self, BusError> {
        if let Some(path) = endpoint.strip_prefix("ipc://") {
            if path.is_empty() {
                return Err(BusError::Config(format!("empty IPC path in `{endpoint}`")));
            }
            let in_default_dir = Path::new(path).parent() == Some(Path::new(IPC_DIR));
            match Path::new(path).file_stem().and_then(|s| s.to_str()) {
                Some(name) if in_default_dir && path.ends_with(".sock") => Ok(Self::ipc(name)),
                _ => Ok(Self::ipc(path)),
            }
        } else if let Some(addr) = endpoint.strip_prefix("tcp://") {
            let (host, port) = addr
                .rsplit_once(':')
                .ok_or_else(|| BusError::Config(format!("missing port in `{endpoint}`")))?;
            let port = port
                .parse::<u16>()
                .map_err(|_| BusError::Config(format!("invalid port in `{endpoint}`")))?;
            if host.is_empty() {
                return Err(BusError::Config(format!("missing host in `{endpoint}`")));
            }
            Ok(Self::tcp(host, port))
        } else {
            Err(BusError::Config(format!(
                "unsupported endpoint `{endpoint}` (expected ipc:// or tcp://)"
            )))
        }
    }

    /// Generate the ZeroMQ endpoint address string.
    pub fn endpoint(&self) -> String {
        match self {
            Self::Ipc(path) if path.starts_with('/') => format!("ipc://{path}"),
            Self::Ipc(name) => format!("ipc://{IPC_DIR}/{name}.sock"),
            Self::Tcp { host, port } => format!("tcp://{host}:{port}"),
        }
    }

    fn ipc_path(&self) -> Option<String> {
        match self {
            Self::Ipc(_) => {
                let endpoint = self.endpoint();
                endpoint.strip_prefix("ipc://").map(str::to_string)
            }
            Self::Tcp { .. } => None,
        }
    }

    /// For IPC transports, ensure the parent directory exists.
    ///
    /// ZeroMQ requires the directory to exist before binding an IPC socket.
    /// This is a no-op for TCP transports.
    pub fn ensure_ipc_dir(&self) -> std::io::Result<()> {
        if let Some(path) = self.ipc_path() {
            if let Some(parent) = Path::new(&path).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Remove a stale IPC socket file left over from a previous run.
    ///
    /// If the process exits without cleanup the `.sock` file persists and
    /// the next bind fails with `EADDRINUSE`. No-op for TCP or a missing file.
    pub fn remove_stale_socket(&self) -> std::io::Result<()> {
        if let Some(path) = self.ipc_path() {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(path, "removed stale IPC socket");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Prepare a bind: create the IPC directory and clear a stale socket.
    pub(crate) fn prepare_bind(&self) -> Result<(), BusError> {
        self.ensure_ipc_dir()
            .map_err(|e| BusError::Transport(e.to_string()))?;
        self.remove_stale_socket()
            .map_err(|e| BusError::Transport(e.to_string()))
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipc_endpoint() {
        let t = Transport::ipc("kb");
        assert_eq!(t.endpoint(), "ipc:///tmp/edgekb/kb.sock");
    }

    #[test]
    fn ipc_absolute_path() {
        let t = Transport::ipc("/run/edgekb/event.sock");
        assert_eq!(t.endpoint(), "ipc:///run/edgekb/event.sock");
    }

    #[test]
    fn tcp_endpoint() {
        let t = Transport::tcp("127.0.0.1", 5555);
        assert_eq!(t.endpoint(), "tcp://127.0.0.1:5555");
    }

    #[test]
    fn display_matches_endpoint() {
        let t = Transport::tcp("localhost", 9090);
        assert_eq!(t.to_string(), t.endpoint());
    }

    #[test]
    fn parse_round_trips_endpoints() {
        for ep in [
            "ipc:///tmp/edgekb/kb.sock",
            "ipc:///var/run/kb.sock",
            "tcp://10.0.0.2:7000",
        ] {
            assert_eq!(Transport::parse(ep).unwrap().endpoint(), ep);
        }
        assert_eq!(Transport::parse("ipc:///tmp/edgekb/kb.sock").unwrap(), Transport::ipc("kb"));
    }

    #[test]
    fn parse_rejects_bad_endpoints() {
        for ep in ["udp://x:1", "tcp://host", "tcp://host:notaport", "tcp://:80", "ipc://"] {
            assert!(matches!(Transport::parse(ep), Err(BusError::Config(_))), "{ep}");
        }
    }
}
