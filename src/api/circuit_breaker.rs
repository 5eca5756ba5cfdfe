use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Copy, Clone)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: usize,
    pub opened_at: Option<Instant>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: usize,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Error returned when the breaker refuses a request.
#[derive(Debug)]
pub enum CircuitBreakerError {
    CircuitOpen,
}

impl std::fmt::Display for CircuitBreakerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitBreakerError::CircuitOpen => write!(f, "LMS circuit breaker is open"),
        }
    }
}

impl std::error::Error for CircuitBreakerError {}

/// Closed/Open/Half-Open breaker shared by every request a session sends to
/// the LMS. While half-open a single probe request is let through.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    failure_threshold: usize,
    cooldown: Duration,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(30))
    }
}

impl CircuitBreaker {
    pub fn new(failure_threshold: usize, cooldown: Duration) -> Self {
        let cooldown = if cooldown.is_zero() {
            Duration::from_secs(1)
        } else {
            cooldown
        };

        Self {
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
            failure_threshold: failure_threshold.max(1),
            cooldown,
        }
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let guard = self.lock();
        CircuitBreakerSnapshot {
            state: guard.state,
            consecutive_failures: guard.consecutive_failures,
            opened_at: guard.opened_at,
        }
    }

    /// Checks whether a request may be sent, reserving the half-open probe slot
    /// when the cooldown has elapsed.
    pub fn before_request(&self) -> Result<CircuitState, CircuitBreakerError> {
        let mut state = self.lock();

        if state.state == CircuitState::Open {
            let cooled_down = state
                .opened_at
                .is_some_and(|opened_at| opened_at.elapsed() >= self.cooldown);
            if !cooled_down {
                return Err(CircuitBreakerError::CircuitOpen);
            }
            Self::transition(&mut state, CircuitState::HalfOpen);
            state.probe_in_flight = false;
        }

        if state.state == CircuitState::HalfOpen {
            if state.probe_in_flight {
                return Err(CircuitBreakerError::CircuitOpen);
            }
            state.probe_in_flight = true;
        }

        Ok(state.state)
    }

    pub fn record_success(&self) {
        let mut state = self.lock();
        state.probe_in_flight = false;
        state.consecutive_failures = 0;

        if state.state == CircuitState::HalfOpen {
            state.opened_at = None;
            Self::transition(&mut state, CircuitState::Closed);
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.probe_in_flight = false;
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);

        let trip = match state.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => state.consecutive_failures >= self.failure_threshold,
            CircuitState::Open => false,
        };
        if trip {
            state.opened_at = Some(Instant::now());
            Self::transition(&mut state, CircuitState::Open);
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().expect("circuit breaker mutex poisoned")
    }

    fn transition(state: &mut BreakerState, next: CircuitState) {
        if state.state != next {
            tracing::warn!(
                previous = ?state.state,
                next = ?next,
                consecutive_failures = state.consecutive_failures,
                "LMS circuit breaker state changed"
            );
            state.state = next;
        }
    }
}
