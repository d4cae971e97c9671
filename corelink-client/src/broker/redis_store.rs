//! Redis implementation of the broker gateway
//!
//! Non-blocking commands share one lazily opened multiplexed connection.
//! Blocking pops open a connection of their own for the duration of the
//! wait, so concurrent waiters never queue behind each other's blocking
//! reads.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use super::{BrokerError, BrokerGateway};

/// Extra time granted to a blocking command before the socket gives up
const RESPONSE_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Response timeout for non-blocking commands
const COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

/// Redis-backed broker gateway
pub struct RedisBroker {
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisBroker {
    /// Creates a gateway for a `redis://` URL
    ///
    /// No connection is made until the first command.
    pub fn open(url: &str) -> Result<Self, BrokerError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
        })
    }

    /// Returns the shared connection, opening it on first use
    async fn shared(&self) -> Result<MultiplexedConnection, BrokerError> {
        let mut guard = self.connection.lock().await;
        if let Some(connection) = guard.as_ref() {
            return Ok(connection.clone());
        }

        let config =
            redis::AsyncConnectionConfig::new().set_response_timeout(Some(COMMAND_TIMEOUT));
        let connection = self
            .client
            .get_multiplexed_async_connection_with_config(&config)
            .await?;
        debug!("Opened shared broker connection");
        *guard = Some(connection.clone());
        Ok(connection)
    }

    /// Drops the shared connection after a failure so the next call reconnects
    async fn reset(&self) {
        *self.connection.lock().await = None;
    }

    /// Opens a connection for one blocking command of at most `wait`
    async fn dedicated(&self, wait: Duration) -> Result<MultiplexedConnection, BrokerError> {
        let config = redis::AsyncConnectionConfig::new()
            .set_response_timeout(Some(wait + RESPONSE_TIMEOUT_GRACE));
        Ok(self
            .client
            .get_multiplexed_async_connection_with_config(&config)
            .await?)
    }

    async fn run<T>(&self, cmd: redis::Cmd) -> Result<T, BrokerError>
    where
        T: redis::FromRedisValue + Send,
    {
        let mut connection = self.shared().await?;
        let result: redis::RedisResult<T> = cmd.query_async(&mut connection).await;
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                self.reset().await;
                Err(err.into())
            }
        }
    }

    async fn run_blocking<T>(&self, cmd: redis::Cmd, wait: Duration) -> Result<T, BrokerError>
    where
        T: redis::FromRedisValue + Send,
    {
        let mut connection = self.dedicated(wait).await?;
        Ok(cmd.query_async(&mut connection).await?)
    }
}

/// Blocking timeouts go out in whole seconds; zero would block forever
fn blocking_seconds(timeout: Duration) -> u64 {
    let mut seconds = timeout.as_secs();
    if timeout.subsec_nanos() > 0 {
        seconds += 1;
    }
    seconds.max(1)
}

#[async_trait]
impl BrokerGateway for RedisBroker {
    async fn enqueue(&self, queue: &str, payload: String) -> Result<(), BrokerError> {
        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(queue).arg(payload);
        let _: i64 = self.run(cmd).await?;
        Ok(())
    }

    async fn block_pop_rotate(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<String>, BrokerError> {
        let seconds = blocking_seconds(timeout);
        let mut cmd = redis::cmd("BRPOPLPUSH");
        cmd.arg(queue).arg(queue).arg(seconds);
        self.run_blocking(cmd, Duration::from_secs(seconds)).await
    }

    async fn exists_flag(&self, key: &str) -> Result<bool, BrokerError> {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(key);
        let count: i64 = self.run(cmd).await?;
        Ok(count > 0)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, BrokerError> {
        let mut cmd = redis::cmd("TTL");
        cmd.arg(key);
        let seconds: i64 = self.run(cmd).await?;
        // -1: no expiry, -2: no such key
        Ok(u64::try_from(seconds).ok().map(Duration::from_secs))
    }

    async fn block_pop(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<String>, BrokerError> {
        let seconds = blocking_seconds(timeout);
        let mut cmd = redis::cmd("BLPOP");
        cmd.arg(key).arg(seconds);
        let popped: Option<(String, String)> =
            self.run_blocking(cmd, Duration::from_secs(seconds)).await?;
        Ok(popped.map(|(_, payload)| payload))
    }
}
