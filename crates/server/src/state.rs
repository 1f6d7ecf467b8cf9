use crate::auth::{AccountRegistry, IdTokenVerifier};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use dashmap::DashMap;
use lostfound::{LostFound, LostFoundConfig, QueryGuard};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<ServerConfig>,

    pub service: Arc<LostFound>,

    pub verifier: Arc<IdTokenVerifier>,

    pub accounts: Arc<AccountRegistry>,

    /// Rate limit tracking: uid -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, Instant)>>,

    /// Last-write-wins guard for each user's match queries.
    pub match_guards: Arc<DashMap<String, Arc<QueryGuard>>>,

    pub metrics: Option<PrometheusHandle>,

    pub started_at: Instant,
}

impl ServerState {
    /// Assemble the service from its YAML configuration.
    pub fn new(config: ServerConfig, app: LostFoundConfig) -> ServerResult<Self> {
        let secret = app.auth.token_secret.clone().ok_or_else(|| {
            ServerError::Config(format!(
                "auth.token_secret is required; set {}",
                lostfound::TOKEN_SECRET_ENV
            ))
        })?;
        let verifier = IdTokenVerifier::new(&secret, app.auth.token_ttl_secs)?;
        let service = LostFound::from_config(app)?;
        Self::with_service(config, service, verifier)
    }

    /// Wrap an already assembled service.
    pub fn with_service(
        config: ServerConfig,
        service: LostFound,
        verifier: IdTokenVerifier,
    ) -> ServerResult<Self> {
        let verification = service.claims().config().verification_timeout;
        if verification >= config.timeout() {
            return Err(ServerError::Config(format!(
                "claims verification timeout ({verification:?}) must be below the request timeout ({:?})",
                config.timeout()
            )));
        }

        let metrics = if config.metrics_enabled {
            Some(crate::telemetry::install()?)
        } else {
            None
        };

        Ok(Self {
            accounts: Arc::new(AccountRegistry::new(service.policy().clone())),
            config: Arc::new(config),
            service: Arc::new(service),
            verifier: Arc::new(verifier),
            rate_limiter: Arc::new(DashMap::new()),
            match_guards: Arc::new(DashMap::new()),
            metrics,
            started_at: Instant::now(),
        })
    }

    /// Check rate limit for a signed-in user
    pub fn check_rate_limit(&self, uid: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(uid.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }

    pub fn match_guard(&self, uid: &str) -> Arc<QueryGuard> {
        self.match_guards
            .entry(uid.to_string())
            .or_default()
            .value()
            .clone()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
