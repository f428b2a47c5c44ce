/// Crate-wide error type. Binaries match on this to pick a process exit code;
/// sessions return it through `JoinHandle::join` so the orchestrator can tell
/// a transient per-session failure from a local, unrecoverable one.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session exceeded its retransmission budget without completing")]
    SessionTimedOut,

    #[error("peer reported an error and closed the session")]
    PeerError,

    #[error("requested file was not found in the working directory")]
    FileNotFound,

    #[error("all servers in the list failed")]
    AllServersFailed,

    #[error("server-info.txt contained no usable entries")]
    EmptyServerList,

    #[error("malformed server-info.txt line: {0:?}")]
    MalformedServerLine(String),

    #[error("invalid connection count: {0}")]
    InvalidConnCount(String),

    #[error("{label} listener failed to bind port {port}: {source}")]
    BindFailed {
        label: &'static str,
        port: u16,
        #[source]
        source: std::io::Error,
    },
}
