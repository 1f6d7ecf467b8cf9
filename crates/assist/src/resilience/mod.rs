//! Retry with backoff and a circuit breaker around provider calls.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use retry::{retry_transient, RetryConfig};
