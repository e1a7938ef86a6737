//! Async Client
//!
//! Same command set as [`Client`](super::Client), driven by tokio. Calls
//! issued concurrently queue on a fair mutex and reach the socket one at a
//! time, in the order they asked for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::command::{self, hash, kv, queue, server, zset, Request};
use crate::config::Config;
use crate::error::{Result, SsdbError};
use crate::network::AsyncConnection;
use crate::protocol::{Arg, Command, Response};

/// Async client over a single connection
pub struct AsyncClient {
    config: Config,

    /// `None` after a fatal error or an abandoned call; reopened on demand
    conn: Mutex<Option<AsyncConnection>>,

    /// Cancelled by `close`, releasing the running call and all waiters
    shutdown: CancellationToken,

    closed: AtomicBool,
}

impl AsyncClient {
    /// Connect to `host:port` with default settings.
    ///
    /// Must be called from within a tokio runtime; all I/O of the client
    /// runs on whichever runtime polls its futures.
    pub async fn connect(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::with_config(Config::builder().host(host).port(port).build()).await
    }

    /// Connect using a custom configuration
    pub async fn with_config(config: Config) -> Result<Self> {
        let conn = Self::open(&config).await?;
        Ok(Self {
            config,
            conn: Mutex::new(Some(conn)),
            shutdown: CancellationToken::new(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn open(config: &Config) -> Result<AsyncConnection> {
        let mut conn = AsyncConnection::connect(config).await?;
        if let Some(password) = &config.password {
            let request = server::auth(password.as_str())?;
            let response = conn.execute(request.command()).await?;
            request.parse(response)?;
        }
        Ok(conn)
    }

    /// Execute one request, serialized with every other call on this client.
    ///
    /// Dropping the returned future is safe at any point: if the request was
    /// already written, the connection is discarded by the next call instead
    /// of being read out of step.
    pub async fn run<T>(&self, request: Request<T>) -> Result<T> {
        if self.is_closed() {
            return Err(SsdbError::ConnectionClosed);
        }

        let mut guard = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(SsdbError::ConnectionClosed),
            guard = self.conn.lock() => guard,
        };

        if guard.as_ref().is_some_and(|conn| conn.is_in_flight()) {
            tracing::warn!(
                "Discarding connection to {} with an abandoned request",
                self.config.addr()
            );
            if let Some(mut stale) = guard.take() {
                stale.close().await;
            }
        }
        if guard.is_none() {
            tracing::debug!("Reconnecting to {}", self.config.addr());
            let conn = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(SsdbError::ConnectionClosed),
                conn = Self::open(&self.config) => conn?,
            };
            *guard = Some(conn);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(SsdbError::ConnectionClosed);
        };

        let result = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(SsdbError::ConnectionClosed),
            result = conn.execute(request.command()) => result,
        };

        match result {
            Ok(response) => request.parse(response),
            Err(err) => {
                let discard = self.is_closed()
                    || guard
                        .as_ref()
                        .map_or(true, |conn| conn.is_closed() || conn.is_in_flight());
                if discard {
                    if let Some(mut conn) = guard.take() {
                        conn.close().await;
                    }
                }
                if self.is_closed() {
                    return Err(SsdbError::ConnectionClosed);
                }
                Err(err)
            }
        }
    }

    /// Send an arbitrary command and return the undecoded response
    pub async fn execute<I>(&self, args: I) -> Result<Response>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        let args = args
            .into_iter()
            .map(|arg| arg.into().into_bytes())
            .collect::<Result<Vec<_>>>()?;
        self.run(command::raw(Command::from_args(args)?)).await
    }

    /// Close the connection.
    ///
    /// The running call and every queued call fail with `ConnectionClosed`,
    /// as does every later call. Safe to call repeatedly.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.cancel();

        let mut guard = self.conn.lock().await;
        if let Some(mut conn) = guard.take() {
            conn.close().await;
        }
        tracing::debug!("Client for {} closed", self.config.addr());
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Key-Value
    // =========================================================================

    pub async fn set(&self, key: impl Into<Arg>, value: impl Into<Arg>) -> Result<()> {
        self.run(kv::set(key, value)?).await
    }

    /// Set a value that expires after `ttl` (whole seconds)
    pub async fn setx(&self, key: impl Into<Arg>, value: impl Into<Arg>, ttl: Duration) -> Result<()> {
        self.run(kv::setx(key, value, ttl.as_secs())?).await
    }

    pub async fn setnx(&self, key: impl Into<Arg>, value: impl Into<Arg>) -> Result<bool> {
        self.run(kv::setnx(key, value)?).await
    }

    /// Returns `Ok(None)` when the key is missing
    pub async fn get(&self, key: impl Into<Arg>) -> Result<Option<Bytes>> {
        self.run(kv::get(key)?).await
    }

    pub async fn getset(&self, key: impl Into<Arg>, value: impl Into<Arg>) -> Result<Option<Bytes>> {
        self.run(kv::getset(key, value)?).await
    }

    pub async fn del(&self, key: impl Into<Arg>) -> Result<()> {
        self.run(kv::del(key)?).await
    }

    pub async fn incr(&self, key: impl Into<Arg>, by: i64) -> Result<i64> {
        self.run(kv::incr(key, by)?).await
    }

    pub async fn exists(&self, key: impl Into<Arg>) -> Result<bool> {
        self.run(kv::exists(key)?).await
    }

    pub async fn expire(&self, key: impl Into<Arg>, ttl: Duration) -> Result<bool> {
        self.run(kv::expire(key, ttl.as_secs())?).await
    }

    pub async fn ttl(&self, key: impl Into<Arg>) -> Result<Option<Duration>> {
        self.run(kv::ttl(key)?).await
    }

    /// Up to `limit` keys in `(start, end]`
    pub async fn keys(&self, start: impl Into<Arg>, end: impl Into<Arg>, limit: u64) -> Result<Vec<Bytes>> {
        self.run(kv::keys(start, end, limit)?).await
    }

    pub async fn scan(
        &self,
        start: impl Into<Arg>,
        end: impl Into<Arg>,
        limit: u64,
    ) -> Result<Vec<(Bytes, Bytes)>> {
        self.run(kv::scan(start, end, limit)?).await
    }

    pub async fn multi_set<I, K, V>(&self, pairs: I) -> Result<i64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Arg>,
        V: Into<Arg>,
    {
        self.run(kv::multi_set(pairs)?).await
    }

    pub async fn multi_get<I>(&self, keys: I) -> Result<Vec<Bytes>>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.run(kv::multi_get(keys)?).await
    }

    pub async fn multi_del<I>(&self, keys: I) -> Result<i64>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.run(kv::multi_del(keys)?).await
    }

    // =========================================================================
    // Hash
    // =========================================================================

    pub async fn hset(&self, name: impl Into<Arg>, key: impl Into<Arg>, value: impl Into<Arg>) -> Result<bool> {
        self.run(hash::hset(name, key, value)?).await
    }

    pub async fn hget(&self, name: impl Into<Arg>, key: impl Into<Arg>) -> Result<Option<Bytes>> {
        self.run(hash::hget(name, key)?).await
    }

    pub async fn hdel(&self, name: impl Into<Arg>, key: impl Into<Arg>) -> Result<bool> {
        self.run(hash::hdel(name, key)?).await
    }

    pub async fn hincr(&self, name: impl Into<Arg>, key: impl Into<Arg>, by: i64) -> Result<i64> {
        self.run(hash::hincr(name, key, by)?).await
    }

    pub async fn hexists(&self, name: impl Into<Arg>, key: impl Into<Arg>) -> Result<bool> {
        self.run(hash::hexists(name, key)?).await
    }

    pub async fn hsize(&self, name: impl Into<Arg>) -> Result<i64> {
        self.run(hash::hsize(name)?).await
    }

    pub async fn hgetall(&self, name: impl Into<Arg>) -> Result<Vec<Bytes>> {
        self.run(hash::hgetall(name)?).await
    }

    pub async fn hkeys(
        &self,
        name: impl Into<Arg>,
        start: impl Into<Arg>,
        end: impl Into<Arg>,
        limit: u64,
    ) -> Result<Vec<Bytes>> {
        self.run(hash::hkeys(name, start, end, limit)?).await
    }

    pub async fn hclear(&self, name: impl Into<Arg>) -> Result<i64> {
        self.run(hash::hclear(name)?).await
    }

    // =========================================================================
    // Sorted Set
    // =========================================================================

    pub async fn zset(&self, name: impl Into<Arg>, key: impl Into<Arg>, score: i64) -> Result<bool> {
        self.run(zset::zset(name, key, score)?).await
    }

    pub async fn zget(&self, name: impl Into<Arg>, key: impl Into<Arg>) -> Result<Option<i64>> {
        self.run(zset::zget(name, key)?).await
    }

    pub async fn zdel(&self, name: impl Into<Arg>, key: impl Into<Arg>) -> Result<bool> {
        self.run(zset::zdel(name, key)?).await
    }

    pub async fn zincr(&self, name: impl Into<Arg>, key: impl Into<Arg>, by: i64) -> Result<i64> {
        self.run(zset::zincr(name, key, by)?).await
    }

    pub async fn zexists(&self, name: impl Into<Arg>, key: impl Into<Arg>) -> Result<bool> {
        self.run(zset::zexists(name, key)?).await
    }

    pub async fn zsize(&self, name: impl Into<Arg>) -> Result<i64> {
        self.run(zset::zsize(name)?).await
    }

    pub async fn zrange(&self, name: impl Into<Arg>, offset: u64, limit: u64) -> Result<Vec<(Bytes, i64)>> {
        self.run(zset::zrange(name, offset, limit)?).await
    }

    pub async fn zclear(&self, name: impl Into<Arg>) -> Result<i64> {
        self.run(zset::zclear(name)?).await
    }

    pub async fn multi_zset<I, K>(&self, name: impl Into<Arg>, pairs: I) -> Result<i64>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<Arg>,
    {
        self.run(zset::multi_zset(name, pairs)?).await
    }

    pub async fn multi_zget<I>(&self, name: impl Into<Arg>, keys: I) -> Result<Vec<Bytes>>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.run(zset::multi_zget(name, keys)?).await
    }

    pub async fn multi_zdel<I>(&self, name: impl Into<Arg>, keys: I) -> Result<i64>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.run(zset::multi_zdel(name, keys)?).await
    }

    // =========================================================================
    // Queue
    // =========================================================================

    pub async fn qpush_front<I>(&self, name: impl Into<Arg>, items: I) -> Result<i64>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.run(queue::qpush_front(name, items)?).await
    }

    pub async fn qpush_back<I>(&self, name: impl Into<Arg>, items: I) -> Result<i64>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.run(queue::qpush_back(name, items)?).await
    }

    pub async fn qpop_front(&self, name: impl Into<Arg>, count: u64) -> Result<Vec<Bytes>> {
        self.run(queue::qpop_front(name, count)?).await
    }

    pub async fn qpop_back(&self, name: impl Into<Arg>, count: u64) -> Result<Vec<Bytes>> {
        self.run(queue::qpop_back(name, count)?).await
    }

    pub async fn qsize(&self, name: impl Into<Arg>) -> Result<i64> {
        self.run(queue::qsize(name)?).await
    }

    pub async fn qfront(&self, name: impl Into<Arg>) -> Result<Option<Bytes>> {
        self.run(queue::qfront(name)?).await
    }

    pub async fn qback(&self, name: impl Into<Arg>) -> Result<Option<Bytes>> {
        self.run(queue::qback(name)?).await
    }

    pub async fn qget(&self, name: impl Into<Arg>, index: i64) -> Result<Option<Bytes>> {
        self.run(queue::qget(name, index)?).await
    }

    pub async fn qrange(&self, name: impl Into<Arg>, offset: i64, limit: u64) -> Result<Vec<Bytes>> {
        self.run(queue::qrange(name, offset, limit)?).await
    }

    pub async fn qclear(&self, name: impl Into<Arg>) -> Result<i64> {
        self.run(queue::qclear(name)?).await
    }

    // =========================================================================
    // Server
    // =========================================================================

    pub async fn dbsize(&self) -> Result<i64> {
        self.run(server::dbsize()?).await
    }
}
