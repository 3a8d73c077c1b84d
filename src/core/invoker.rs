use crate::core::breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::core::Result;
use crate::utils::error::GatewayError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommandStats {
    pub successes: u64,
    pub degradations: u64,
    pub short_circuits: u64,
}

/// 各 command 的成功與降級次數，只增不減
#[derive(Debug, Default)]
pub struct DegradationMetrics {
    stats: Mutex<HashMap<String, CommandStats>>,
}

impl DegradationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, command: &str, f: impl FnOnce(&mut CommandStats)) {
        let mut stats = self
            .stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(stats.entry(command.to_string()).or_default());
    }

    pub fn record_success(&self, command: &str) {
        self.update(command, |stats| stats.successes += 1);
    }

    pub fn record_degradation(&self, command: &str, cause: &GatewayError) {
        let short_circuited = matches!(cause, GatewayError::CircuitOpen { .. });
        self.update(command, |stats| {
            stats.degradations += 1;
            if short_circuited {
                stats.short_circuits += 1;
            }
        });
    }

    pub fn get(&self, command: &str) -> CommandStats {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(command)
            .copied()
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> BTreeMap<String, CommandStats> {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(command, stats)| (command.clone(), *stats))
            .collect()
    }
}

/// 一次受保護呼叫的結果：ATTEMPTING 之後只會落在這兩個終態之一
#[derive(Debug)]
pub enum InvocationOutcome<T> {
    Succeeded(T),
    Degraded { value: T, cause: GatewayError },
}

impl<T> InvocationOutcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, InvocationOutcome::Degraded { .. })
    }

    pub fn into_value(self) -> T {
        match self {
            InvocationOutcome::Succeeded(value) => value,
            InvocationOutcome::Degraded { value, .. } => value,
        }
    }
}

/// 以逾時與 fallback 包住下游呼叫，下游錯誤不會往外傳。
///
/// 每次呼叫各自套用自己的時間預算；逾時只會取消該次呼叫的 future。
/// 可選的斷路器會在持續失敗時直接走 fallback。
#[derive(Debug)]
pub struct ResilientInvoker {
    default_timeout: Duration,
    timeouts: HashMap<String, Duration>,
    breaker: Option<CircuitBreaker>,
    metrics: Arc<DegradationMetrics>,
}

impl ResilientInvoker {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            default_timeout,
            timeouts: HashMap::new(),
            breaker: None,
            metrics: Arc::new(DegradationMetrics::new()),
        }
    }

    pub fn with_timeout(mut self, command: &str, timeout: Duration) -> Self {
        self.timeouts.insert(command.to_string(), timeout);
        self
    }

    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker = Some(CircuitBreaker::new(config));
        self
    }

    pub fn metrics(&self) -> Arc<DegradationMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn timeout_for(&self, command: &str) -> Duration {
        self.timeouts
            .get(command)
            .copied()
            .unwrap_or(self.default_timeout)
    }

    pub fn circuit_state(&self, command: &str) -> Option<CircuitState> {
        self.breaker.as_ref().map(|breaker| breaker.state(command))
    }

    pub async fn execute<T, Op, Fut, Fb>(
        &self,
        command: &str,
        operation: Op,
        fallback: Fb,
    ) -> InvocationOutcome<T>
    where
        Op: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
        Fb: FnOnce() -> T,
    {
        if let Some(breaker) = &self.breaker {
            if !breaker.try_acquire(command) {
                let cause = GatewayError::CircuitOpen {
                    service: command.to_string(),
                };
                return self.degrade(command, cause, fallback);
            }
        }

        let budget = self.timeout_for(command);
        let result = match tokio::time::timeout(budget, operation()).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::TimeoutError {
                service: command.to_string(),
                timeout_ms: budget.as_millis() as u64,
            }),
        };

        match result {
            Ok(value) => {
                if let Some(breaker) = &self.breaker {
                    breaker.record_success(command);
                }
                self.metrics.record_success(command);
                InvocationOutcome::Succeeded(value)
            }
            Err(cause) => {
                if let Some(breaker) = &self.breaker {
                    breaker.record_failure(command);
                }
                self.degrade(command, cause, fallback)
            }
        }
    }

    /// 執行 `operation`；任何失敗都改用 `fallback` 的值
    pub async fn protect<T, Op, Fut, Fb>(&self, command: &str, operation: Op, fallback: Fb) -> T
    where
        Op: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
        Fb: FnOnce() -> T,
    {
        self.execute(command, operation, fallback)
            .await
            .into_value()
    }

    fn degrade<T, Fb>(&self, command: &str, cause: GatewayError, fallback: Fb) -> InvocationOutcome<T>
    where
        Fb: FnOnce() -> T,
    {
        tracing::warn!(
            command = command,
            cause = cause.kind(),
            "⚠️ {} degraded, using fallback: {}",
            command,
            cause
        );
        self.metrics.record_degradation(command, &cause);

        InvocationOutcome::Degraded {
            value: fallback(),
            cause,
        }
    }
}
