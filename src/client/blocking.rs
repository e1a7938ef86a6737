//! Blocking Client
//!
//! Runs every command on the calling thread over one connection. The
//! connection sits behind a mutex so a client shared between threads still
//! sends one request at a time and reads its response before the next.

use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::command::{self, hash, kv, queue, server, zset, Request};
use crate::config::Config;
use crate::error::{Result, SsdbError};
use crate::network::Connection;
use crate::protocol::{Arg, Command, Response};

/// Blocking client over a single connection
pub struct Client {
    config: Config,

    /// `None` after a fatal error; reopened by the next call
    conn: Mutex<Option<Connection>>,

    /// Clone of the live socket, shut down by `close` to wake a blocked read
    interrupt: Mutex<Option<TcpStream>>,

    closed: AtomicBool,
}

impl Client {
    /// Connect to `host:port` with default settings
    pub fn connect(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::with_config(Config::builder().host(host).port(port).build())
    }

    /// Connect using a custom configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let client = Self {
            config,
            conn: Mutex::new(None),
            interrupt: Mutex::new(None),
            closed: AtomicBool::new(false),
        };
        let conn = client.open()?;
        *client.conn.lock() = Some(conn);
        Ok(client)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn open(&self) -> Result<Connection> {
        let mut conn = Connection::connect(&self.config)?;
        *self.interrupt.lock() = Some(conn.try_clone_stream()?);

        if let Some(password) = &self.config.password {
            let request = server::auth(password.as_str())?;
            let response = conn.execute(request.command())?;
            request.parse(response)?;
        }
        Ok(conn)
    }

    /// Execute one request, serialized with every other call on this client
    pub fn run<T>(&self, request: Request<T>) -> Result<T> {
        if self.is_closed() {
            return Err(SsdbError::ConnectionClosed);
        }

        let mut guard = self.conn.lock();
        if self.is_closed() {
            return Err(SsdbError::ConnectionClosed);
        }

        if guard.is_none() {
            tracing::debug!("Reconnecting to {}", self.config.addr());
            let opened = self.open();
            // close() had no socket to shut down while this one was opening
            if self.is_closed() {
                if let Ok(mut conn) = opened {
                    conn.close();
                }
                *self.interrupt.lock() = None;
                return Err(SsdbError::ConnectionClosed);
            }
            *guard = Some(opened?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(SsdbError::ConnectionClosed);
        };

        match conn.execute(request.command()) {
            Ok(response) => request.parse(response),
            Err(err) => {
                if conn.is_closed() {
                    *guard = None;
                    *self.interrupt.lock() = None;
                }
                if self.is_closed() {
                    return Err(SsdbError::ConnectionClosed);
                }
                Err(err)
            }
        }
    }

    /// Send an arbitrary command and return the undecoded response
    pub fn execute<I>(&self, args: I) -> Result<Response>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        let args = args
            .into_iter()
            .map(|arg| arg.into().into_bytes())
            .collect::<Result<Vec<_>>>()?;
        self.run(command::raw(Command::from_args(args)?))
    }

    /// Close the connection.
    ///
    /// Calls blocked on the socket return `ConnectionClosed`, as does every
    /// later call. Safe to call repeatedly and from any thread.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(stream) = self.interrupt.lock().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        // A call in progress holds the lock and drops the connection itself.
        if let Some(mut guard) = self.conn.try_lock() {
            if let Some(mut conn) = guard.take() {
                conn.close();
            }
        }
        tracing::debug!("Client for {} closed", self.config.addr());
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Key-Value
    // =========================================================================

    pub fn set(&self, key: impl Into<Arg>, value: impl Into<Arg>) -> Result<()> {
        self.run(kv::set(key, value)?)
    }

    /// Set a value that expires after `ttl` (whole seconds)
    pub fn setx(&self, key: impl Into<Arg>, value: impl Into<Arg>, ttl: Duration) -> Result<()> {
        self.run(kv::setx(key, value, ttl.as_secs())?)
    }

    /// Set only if absent; returns whether the key was created
    pub fn setnx(&self, key: impl Into<Arg>, value: impl Into<Arg>) -> Result<bool> {
        self.run(kv::setnx(key, value)?)
    }

    /// Returns `Ok(None)` when the key is missing
    pub fn get(&self, key: impl Into<Arg>) -> Result<Option<Bytes>> {
        self.run(kv::get(key)?)
    }

    pub fn getset(&self, key: impl Into<Arg>, value: impl Into<Arg>) -> Result<Option<Bytes>> {
        self.run(kv::getset(key, value)?)
    }

    pub fn del(&self, key: impl Into<Arg>) -> Result<()> {
        self.run(kv::del(key)?)
    }

    pub fn incr(&self, key: impl Into<Arg>, by: i64) -> Result<i64> {
        self.run(kv::incr(key, by)?)
    }

    pub fn exists(&self, key: impl Into<Arg>) -> Result<bool> {
        self.run(kv::exists(key)?)
    }

    pub fn expire(&self, key: impl Into<Arg>, ttl: Duration) -> Result<bool> {
        self.run(kv::expire(key, ttl.as_secs())?)
    }

    /// Remaining time to live, `None` if the key has no expiry or is missing
    pub fn ttl(&self, key: impl Into<Arg>) -> Result<Option<Duration>> {
        self.run(kv::ttl(key)?)
    }

    /// Up to `limit` keys in `(start, end]`
    pub fn keys(&self, start: impl Into<Arg>, end: impl Into<Arg>, limit: u64) -> Result<Vec<Bytes>> {
        self.run(kv::keys(start, end, limit)?)
    }

    pub fn scan(
        &self,
        start: impl Into<Arg>,
        end: impl Into<Arg>,
        limit: u64,
    ) -> Result<Vec<(Bytes, Bytes)>> {
        self.run(kv::scan(start, end, limit)?)
    }

    pub fn multi_set<I, K, V>(&self, pairs: I) -> Result<i64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Arg>,
        V: Into<Arg>,
    {
        self.run(kv::multi_set(pairs)?)
    }

    pub fn multi_get<I>(&self, keys: I) -> Result<Vec<Bytes>>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.run(kv::multi_get(keys)?)
    }

    pub fn multi_del<I>(&self, keys: I) -> Result<i64>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.run(kv::multi_del(keys)?)
    }

    // =========================================================================
    // Hash
    // =========================================================================

    pub fn hset(&self, name: impl Into<Arg>, key: impl Into<Arg>, value: impl Into<Arg>) -> Result<bool> {
        self.run(hash::hset(name, key, value)?)
    }

    pub fn hget(&self, name: impl Into<Arg>, key: impl Into<Arg>) -> Result<Option<Bytes>> {
        self.run(hash::hget(name, key)?)
    }

    pub fn hdel(&self, name: impl Into<Arg>, key: impl Into<Arg>) -> Result<bool> {
        self.run(hash::hdel(name, key)?)
    }

    pub fn hincr(&self, name: impl Into<Arg>, key: impl Into<Arg>, by: i64) -> Result<i64> {
        self.run(hash::hincr(name, key, by)?)
    }

    pub fn hexists(&self, name: impl Into<Arg>, key: impl Into<Arg>) -> Result<bool> {
        self.run(hash::hexists(name, key)?)
    }

    pub fn hsize(&self, name: impl Into<Arg>) -> Result<i64> {
        self.run(hash::hsize(name)?)
    }

    pub fn hgetall(&self, name: impl Into<Arg>) -> Result<Vec<Bytes>> {
        self.run(hash::hgetall(name)?)
    }

    pub fn hkeys(
        &self,
        name: impl Into<Arg>,
        start: impl Into<Arg>,
        end: impl Into<Arg>,
        limit: u64,
    ) -> Result<Vec<Bytes>> {
        self.run(hash::hkeys(name, start, end, limit)?)
    }

    pub fn hclear(&self, name: impl Into<Arg>) -> Result<i64> {
        self.run(hash::hclear(name)?)
    }

    // =========================================================================
    // Sorted Set
    // =========================================================================

    pub fn zset(&self, name: impl Into<Arg>, key: impl Into<Arg>, score: i64) -> Result<bool> {
        self.run(zset::zset(name, key, score)?)
    }

    pub fn zget(&self, name: impl Into<Arg>, key: impl Into<Arg>) -> Result<Option<i64>> {
        self.run(zset::zget(name, key)?)
    }

    pub fn zdel(&self, name: impl Into<Arg>, key: impl Into<Arg>) -> Result<bool> {
        self.run(zset::zdel(name, key)?)
    }

    pub fn zincr(&self, name: impl Into<Arg>, key: impl Into<Arg>, by: i64) -> Result<i64> {
        self.run(zset::zincr(name, key, by)?)
    }

    pub fn zexists(&self, name: impl Into<Arg>, key: impl Into<Arg>) -> Result<bool> {
        self.run(zset::zexists(name, key)?)
    }

    pub fn zsize(&self, name: impl Into<Arg>) -> Result<i64> {
        self.run(zset::zsize(name)?)
    }

    pub fn zrange(&self, name: impl Into<Arg>, offset: u64, limit: u64) -> Result<Vec<(Bytes, i64)>> {
        self.run(zset::zrange(name, offset, limit)?)
    }

    pub fn zclear(&self, name: impl Into<Arg>) -> Result<i64> {
        self.run(zset::zclear(name)?)
    }

    pub fn multi_zset<I, K>(&self, name: impl Into<Arg>, pairs: I) -> Result<i64>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<Arg>,
    {
        self.run(zset::multi_zset(name, pairs)?)
    }

    pub fn multi_zget<I>(&self, name: impl Into<Arg>, keys: I) -> Result<Vec<Bytes>>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.run(zset::multi_zget(name, keys)?)
    }

    pub fn multi_zdel<I>(&self, name: impl Into<Arg>, keys: I) -> Result<i64>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.run(zset::multi_zdel(name, keys)?)
    }

    // =========================================================================
    // Queue
    // =========================================================================

    pub fn qpush_front<I>(&self, name: impl Into<Arg>, items: I) -> Result<i64>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.run(queue::qpush_front(name, items)?)
    }

    pub fn qpush_back<I>(&self, name: impl Into<Arg>, items: I) -> Result<i64>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.run(queue::qpush_back(name, items)?)
    }

    pub fn qpop_front(&self, name: impl Into<Arg>, count: u64) -> Result<Vec<Bytes>> {
        self.run(queue::qpop_front(name, count)?)
    }

    pub fn qpop_back(&self, name: impl Into<Arg>, count: u64) -> Result<Vec<Bytes>> {
        self.run(queue::qpop_back(name, count)?)
    }

    pub fn qsize(&self, name: impl Into<Arg>) -> Result<i64> {
        self.run(queue::qsize(name)?)
    }

    pub fn qfront(&self, name: impl Into<Arg>) -> Result<Option<Bytes>> {
        self.run(queue::qfront(name)?)
    }

    pub fn qback(&self, name: impl Into<Arg>) -> Result<Option<Bytes>> {
        self.run(queue::qback(name)?)
    }

    pub fn qget(&self, name: impl Into<Arg>, index: i64) -> Result<Option<Bytes>> {
        self.run(queue::qget(name, index)?)
    }

    pub fn qrange(&self, name: impl Into<Arg>, offset: i64, limit: u64) -> Result<Vec<Bytes>> {
        self.run(queue::qrange(name, offset, limit)?)
    }

    pub fn qclear(&self, name: impl Into<Arg>) -> Result<i64> {
        self.run(queue::qclear(name)?)
    }

    // =========================================================================
    // Server
    // =========================================================================

    pub fn dbsize(&self) -> Result<i64> {
        self.run(server::dbsize()?)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}
