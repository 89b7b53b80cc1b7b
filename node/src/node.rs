//! The attendance node: opens storage, wires the services, serves the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use poap_attendance::{AttendanceLedger, ValidationWorkflow};
use poap_badge::{DisabledBadgeGateway, HttpBadgeGateway, MintClient, SharedBadgeGateway};
use poap_identity::{Ed25519Oracle, IdentityResolver, SessionKeys};
use poap_registry::EnrollmentRegistry;
use poap_rpc::{AppState, RpcMetrics, RpcServer};
use poap_store_lmdb::environment::DEFAULT_MAX_DBS;
use poap_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment};
use poap_types::{Clock, IdentityAddress, SystemClock};

use crate::config::{AdminEntry, NodeConfig};
use crate::error::NodeError;
use crate::shutdown::ShutdownController;

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
/// Pause between attempts to reach a badge issuer that was down at start.
const ISSUER_RECONNECT_INTERVAL: Duration = Duration::from_secs(30);

/// A running attendance node.
pub struct AttendanceNode {
    pub config: NodeConfig,
    pub environment: Arc<LmdbEnvironment>,
    pub state: AppState,
    pub mint_client: Option<Arc<MintClient>>,
    pub shutdown: Arc<ShutdownController>,
    task_handles: Vec<JoinHandle<()>>,
}

impl AttendanceNode {
    /// Open storage, provision configured administrators and wire every
    /// service. Does not bind any socket.
    pub async fn new(config: NodeConfig) -> Result<Self, NodeError> {
        Self::with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Self, NodeError> {
        let secret = config
            .session_secret
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| NodeError::Config("session_secret is required".into()))?;

        check_data_dir(&config.data_dir).map_err(NodeError::Config)?;
        let environment = Arc::new(LmdbEnvironment::open(
            &config.data_dir,
            DEFAULT_MAX_DBS,
            config.map_size_bytes(),
        )?);
        let report = check_integrity(environment.env())?;
        if !report.is_healthy() {
            for error in &report.errors {
                tracing::error!(error = %error, "integrity check");
            }
            return Err(NodeError::Config(format!(
                "storage at {} failed its integrity check",
                config.data_dir.display()
            )));
        }
        tracing::info!(
            databases = report.databases_checked,
            entries = report.total_entries,
            "storage integrity verified"
        );

        let identities = Arc::new(IdentityResolver::new(
            Arc::new(environment.identity_store()),
            clock.clone(),
        ));
        bootstrap_admins(&identities, &config.bootstrap_admins)?;

        let sessions = Arc::new(SessionKeys::new(
            secret.as_bytes(),
            config.session_ttl_secs,
            clock.clone(),
        )?);
        let registry = Arc::new(EnrollmentRegistry::new(
            Arc::new(environment.class_store()),
            identities.clone(),
            clock.clone(),
        ));
        let ledger = Arc::new(AttendanceLedger::new(
            Arc::new(environment.attendance_store()),
            registry.clone(),
        ));

        let (badges, mint_client) = badge_gateway(&config).await?;
        let workflow = Arc::new(
            ValidationWorkflow::new(ledger.clone(), badges, clock.clone(), config.validation_policy)
                .with_badge_timeout(Duration::from_secs(config.badge_timeout_secs)),
        );

        let state = AppState {
            identities,
            sessions,
            oracle: Arc::new(Ed25519Oracle),
            registry,
            ledger,
            workflow,
            metrics: Arc::new(RpcMetrics::new()?),
            clock,
            secure_cookies: config.secure_cookies,
        };

        Ok(Self {
            config,
            environment,
            state,
            mint_client,
            shutdown: Arc::new(ShutdownController::new()),
            task_handles: Vec::new(),
        })
    }

    pub fn rpc_addr(&self) -> Result<SocketAddr, NodeError> {
        format!("{}:{}", self.config.bind_address, self.config.rpc_port)
            .parse()
            .map_err(|e| {
                NodeError::Config(format!(
                    "invalid bind address {}:{}: {e}",
                    self.config.bind_address, self.config.rpc_port
                ))
            })
    }

    /// Serve the API and wait for a shutdown signal.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        let addr = self.rpc_addr()?;
        tracing::info!(
            addr = %addr,
            data_dir = %self.config.data_dir.display(),
            policy = %self.config.validation_policy,
            badge_endpoint = self.config.badge_endpoint.as_deref().unwrap_or("disabled"),
            "attendance node starting"
        );

        let mut server = RpcServer::new(addr, self.state.clone());
        if let Some(origin) = self.config.cors_origin.as_deref() {
            server = server.with_cors_origin(origin);
        }
        let mut shutdown_rx_rpc = self.shutdown.subscribe();
        let shutdown = self.shutdown.clone();
        self.task_handles.push(tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shutdown_rx_rpc.recv() => {
                    tracing::info!("HTTP API shutting down");
                }
                result = server.start() => {
                    match result {
                        Ok(()) => tracing::info!("HTTP API exited"),
                        Err(e) => tracing::error!(error = %e, "HTTP API failed"),
                    }
                    shutdown.shutdown();
                }
            }
        }));

        if let Some(client) = self.mint_client.clone().filter(|c| !c.is_connected()) {
            let mut shutdown_rx_issuer = self.shutdown.subscribe();
            self.task_handles.push(tokio::spawn(async move {
                let mut interval = tokio::time::interval(ISSUER_RECONNECT_INTERVAL);
                interval.tick().await;
                loop {
                    tokio::select! {
                        _ = shutdown_rx_issuer.recv() => break,
                        _ = interval.tick() => {
                            match client.connect().await {
                                Ok(()) => break,
                                Err(e) => tracing::debug!(error = %e, "badge issuer still unreachable"),
                            }
                        }
                    }
                }
            }));
        }

        tracing::info!("attendance node started");
        self.shutdown.wait_for_signal().await;
        Ok(())
    }

    /// Signal every task, flush storage, and wait for tasks to finish.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("attendance node stopping");
        self.shutdown.shutdown();

        if let Some(client) = &self.mint_client {
            client.disconnect();
        }
        if let Err(e) = self.environment.force_sync() {
            tracing::warn!(error = %e, "failed to flush storage");
        }

        let handles = std::mem::take(&mut self.task_handles);
        let joined = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "background task ended abnormally");
                }
            }
        })
        .await;
        if joined.is_err() {
            tracing::warn!("background tasks did not stop in time");
            return Err(NodeError::ShutdownTimeout);
        }

        tracing::info!("attendance node stopped");
        Ok(())
    }
}

fn bootstrap_admins(
    identities: &IdentityResolver,
    admins: &[AdminEntry],
) -> Result<(), NodeError> {
    for entry in admins {
        let address = IdentityAddress::parse(&entry.address).map_err(|e| {
            NodeError::Config(format!("bootstrap admin {}: {e}", entry.address))
        })?;
        identities.bootstrap_admin(&address, &entry.name)?;
    }
    Ok(())
}

/// Build the badge gateway. A configured issuer that cannot be reached now
/// is logged; validations keep committing and report badges as pending.
async fn badge_gateway(
    config: &NodeConfig,
) -> Result<(SharedBadgeGateway, Option<Arc<MintClient>>), NodeError> {
    let Some(endpoint) = config.badge_endpoint.as_deref() else {
        tracing::warn!("no badge endpoint configured, badge issuance disabled");
        return Ok((Arc::new(DisabledBadgeGateway), None));
    };

    let client = Arc::new(MintClient::new(
        endpoint,
        Duration::from_secs(config.badge_timeout_secs),
    )?);
    if let Err(e) = client.connect().await {
        tracing::warn!(endpoint = %endpoint, error = %e, "badge issuer unreachable at start");
    }
    Ok((Arc::new(HttpBadgeGateway::new(client.clone())), Some(client)))
}
