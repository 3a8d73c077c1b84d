use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
enum Circuit {
    Closed { consecutive_failures: u32 },
    Open { since: Instant },
    HalfOpen { probe_started: Instant },
}

impl Default for Circuit {
    fn default() -> Self {
        Circuit::Closed {
            consecutive_failures: 0,
        }
    }
}

/// 每個 command 各自一組斷路狀態。
///
/// 連續失敗達到門檻後開啟；開啟期間不呼叫下游。經過 `reset_timeout`
/// 後放行一次探測，成功則關閉，失敗則重新開啟。
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    circuits: Mutex<HashMap<String, Circuit>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: Mutex::new(HashMap::new()),
        }
    }

    fn with_circuit<R>(&self, command: &str, f: impl FnOnce(&mut Circuit) -> R) -> R {
        let mut circuits = self
            .circuits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let circuit = circuits.entry(command.to_string()).or_default();
        f(circuit)
    }

    /// 是否允許這次呼叫；Open 逾期時轉為 HalfOpen 並放行一次探測
    pub fn try_acquire(&self, command: &str) -> bool {
        let reset_timeout = self.config.reset_timeout;
        self.with_circuit(command, |circuit| match *circuit {
            Circuit::Closed { .. } => true,
            Circuit::Open { since } if since.elapsed() >= reset_timeout => {
                tracing::info!("🔌 Circuit for {} half-open, sending probe", command);
                *circuit = Circuit::HalfOpen {
                    probe_started: Instant::now(),
                };
                true
            }
            Circuit::Open { .. } => false,
            // 探測被取消時不會回報結果，逾期後允許下一次探測
            Circuit::HalfOpen { probe_started } if probe_started.elapsed() >= reset_timeout => {
                *circuit = Circuit::HalfOpen {
                    probe_started: Instant::now(),
                };
                true
            }
            Circuit::HalfOpen { .. } => false,
        })
    }

    pub fn record_success(&self, command: &str) {
        self.with_circuit(command, |circuit| {
            if !matches!(circuit, Circuit::Closed { .. }) {
                tracing::info!("🔌 Circuit for {} closed", command);
            }
            *circuit = Circuit::default();
        });
    }

    pub fn record_failure(&self, command: &str) {
        let threshold = self.config.failure_threshold;
        self.with_circuit(command, |circuit| match *circuit {
            Circuit::Closed {
                consecutive_failures,
            } => {
                let failures = consecutive_failures + 1;
                if failures >= threshold {
                    tracing::warn!(
                        "🔌 Circuit for {} opened after {} consecutive failures",
                        command,
                        failures
                    );
                    *circuit = Circuit::Open {
                        since: Instant::now(),
                    };
                } else {
                    *circuit = Circuit::Closed {
                        consecutive_failures: failures,
                    };
                }
            }
            Circuit::HalfOpen { .. } => {
                tracing::warn!("🔌 Probe for {} failed, circuit re-opened", command);
                *circuit = Circuit::Open {
                    since: Instant::now(),
                };
            }
            Circuit::Open { .. } => {}
        });
    }

    pub fn state(&self, command: &str) -> CircuitState {
        self.with_circuit(command, |circuit| match circuit {
            Circuit::Closed { .. } => CircuitState::Closed,
            Circuit::Open { .. } => CircuitState::Open,
            Circuit::HalfOpen { .. } => CircuitState::HalfOpen,
        })
    }
}
