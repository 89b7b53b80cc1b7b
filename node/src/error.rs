use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] poap_store_lmdb::LmdbError),

    #[error("identity error: {0}")]
    Identity(#[from] poap_identity::IdentityError),

    #[error("badge gateway error: {0}")]
    Badge(#[from] poap_badge::BadgeError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("HTTP server error: {0}")]
    Rpc(#[from] poap_rpc::RpcError),

    #[error("logging already initialised: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shutdown timeout")]
    ShutdownTimeout,
}
