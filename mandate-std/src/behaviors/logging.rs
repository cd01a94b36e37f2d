//! Request logging.

use crate::meta::type_info;
use mandate_core::{
    BoxError, CancellationToken, Command, CommandBehavior, Next, Query, QueryBehavior,
};
use std::{fmt::Debug, time::Instant};
use tracing::Level;

macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        if $level == Level::ERROR {
            tracing::error!($($arg)+)
        } else if $level == Level::WARN {
            tracing::warn!($($arg)+)
        } else if $level == Level::INFO {
            tracing::info!($($arg)+)
        } else if $level == Level::DEBUG {
            tracing::debug!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    };
}

/// Logs each request on entry and its outcome on exit.
///
/// Successful requests are logged at the configured level, failures at
/// `WARN`.
#[derive(Debug, Clone, Copy)]
pub struct LoggingBehavior {
    level: Level,
    order: Option<i32>,
}

impl Default for LoggingBehavior {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBehavior {
    /// Log at `INFO`, outermost.
    pub fn new() -> Self {
        Self {
            level: Level::INFO,
            order: Some(i32::MIN),
        }
    }

    /// Log at `level`.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the precedence key.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    async fn observe<R: Debug + 'static, T>(
        &self,
        request: &R,
        next: Next<'_, R, T>,
    ) -> Result<T, BoxError> {
        let name = type_info::<R>();
        log_at!(self.level, request = %name, ?request, "handling request");
        let started = Instant::now();
        let result = next.run().await;
        let elapsed = started.elapsed();
        match &result {
            Ok(_) => log_at!(self.level, request = %name, ?elapsed, "request handled"),
            Err(err) => tracing::warn!(request = %name, ?elapsed, error = %err, "request failed"),
        }
        result
    }
}

impl<C: Command + Debug> CommandBehavior<C> for LoggingBehavior {
    fn order(&self) -> Option<i32> {
        self.order
    }

    async fn handle(
        &self,
        command: &C,
        next: Next<'_, C, ()>,
        _cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        self.observe(command, next).await
    }
}

impl<Q: Query + Debug> QueryBehavior<Q> for LoggingBehavior {
    fn order(&self) -> Option<i32> {
        self.order
    }

    async fn handle(
        &self,
        query: &Q,
        next: Next<'_, Q, Q::Response>,
        _cancel: &CancellationToken,
    ) -> Result<Q::Response, BoxError> {
        self.observe(query, next).await
    }
}
