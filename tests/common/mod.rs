//! Fake SSDB server for tests
//!
//! Speaks the block protocol through the crate's own codec and keeps data in
//! memory. Besides the regular commands it understands a few `debug_*`
//! commands used to provoke slow, broken or closed connections.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use ssdbkv::protocol::{decode_frame, encode_blocks};
use ssdbkv::Config;

/// How the fake server writes its replies
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Write replies in pieces of this many bytes, pausing between pieces
    pub chunk_size: Option<usize>,

    /// End every framing line with `\r\n`
    pub crlf: bool,

    /// Require `auth` with this password before other commands
    pub password: Option<String>,

    /// Listen backlog; the system default when unset
    pub backlog: Option<u32>,

    /// Stop accepting after this many connections, leaving later ones queued
    pub accept_limit: Option<usize>,
}

pub struct FakeServer {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
}

impl FakeServer {
    pub fn start() -> Self {
        Self::start_with(ServerOptions::default())
    }

    pub fn start_with(options: ServerOptions) -> Self {
        let listener = match options.backlog {
            Some(backlog) => listener_with_backlog(backlog),
            None => TcpListener::bind("127.0.0.1:0").unwrap(),
        };
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(Mutex::new(Store::default()));

        let accepted = Arc::clone(&connections);
        thread::spawn(move || {
            let limit = options.accept_limit.unwrap_or(usize::MAX);
            for stream in listener.incoming().take(limit) {
                let Ok(stream) = stream else { break };
                accepted.fetch_add(1, Ordering::SeqCst);
                let store = Arc::clone(&store);
                let options = options.clone();
                thread::spawn(move || serve(stream, store, options));
            }
            // Keep listening so further connects queue up instead of being refused
            loop {
                thread::park();
            }
        });

        Self { addr, connections }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Client config pointing at this server with short timeouts
    pub fn config(&self) -> Config {
        Config::builder()
            .host("127.0.0.1")
            .port(self.port())
            .connect_timeout_ms(1000)
            .timeout_ms(2000)
            .build()
    }

    /// Number of connections accepted so far
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// std cannot choose the backlog, so the socket is set up through tokio
fn listener_with_backlog(backlog: u32) -> TcpListener {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .unwrap();
    let listener = runtime
        .block_on(async {
            let socket = tokio::net::TcpSocket::new_v4()?;
            socket.bind("127.0.0.1:0".parse().unwrap())?;
            socket.listen(backlog)
        })
        .unwrap()
        .into_std()
        .unwrap();
    listener.set_nonblocking(false).unwrap();
    listener
}

/// A port nothing listens on
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

enum Action {
    Reply(Vec<Bytes>),
    Raw(Vec<u8>),
    Hangup,
}

fn serve(mut stream: TcpStream, store: Arc<Mutex<Store>>, options: ServerOptions) {
    stream.set_nodelay(true).unwrap();
    let mut authed = options.password.is_none();
    let mut buf = BytesMut::new();
    let mut chunk = [0u8; 4096];

    loop {
        let blocks = match decode_frame(&mut buf) {
            Ok(Some(blocks)) => blocks,
            Ok(None) => match stream.read(&mut chunk) {
                Ok(0) | Err(_) => return,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    continue;
                }
            },
            Err(_) => return,
        };

        let action = handle(&blocks, &store, &options, &mut authed);
        let bytes = match action {
            Action::Reply(reply) => encode(&reply, options.crlf),
            Action::Raw(bytes) => bytes,
            Action::Hangup => return,
        };
        if write_reply(&mut stream, &bytes, options.chunk_size).is_err() {
            return;
        }
    }
}

fn encode(blocks: &[Bytes], crlf: bool) -> Vec<u8> {
    if !crlf {
        let mut buf = BytesMut::new();
        encode_blocks(blocks, &mut buf);
        return buf.to_vec();
    }
    let mut out = Vec::new();
    for block in blocks {
        out.extend_from_slice(format!("{}\r\n", block.len()).as_bytes());
        out.extend_from_slice(block);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out
}

fn write_reply(stream: &mut TcpStream, bytes: &[u8], chunk_size: Option<usize>) -> std::io::Result<()> {
    match chunk_size {
        Some(size) => {
            for piece in bytes.chunks(size.max(1)) {
                stream.write_all(piece)?;
                stream.flush()?;
                thread::sleep(Duration::from_micros(300));
            }
            Ok(())
        }
        None => stream.write_all(bytes),
    }
}

// =============================================================================
// Command Handling
// =============================================================================

#[derive(Default)]
struct Store {
    kv: BTreeMap<Vec<u8>, Vec<u8>>,
    expires: HashMap<Vec<u8>, Instant>,
    hashes: HashMap<Vec<u8>, BTreeMap<Vec<u8>, Vec<u8>>>,
    zsets: HashMap<Vec<u8>, BTreeMap<Vec<u8>, i64>>,
    queues: HashMap<Vec<u8>, VecDeque<Vec<u8>>>,
}

impl Store {
    fn purge_expired(&mut self) {
        let now = Instant::now();
        let expired: Vec<Vec<u8>> = self
            .expires
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.expires.remove(&key);
            self.kv.remove(&key);
        }
    }
}

fn ok<I: IntoIterator<Item = Vec<u8>>>(payload: I) -> Action {
    let mut blocks = vec![Bytes::from_static(b"ok")];
    blocks.extend(payload.into_iter().map(Bytes::from));
    Action::Reply(blocks)
}

fn ok_int(n: i64) -> Action {
    ok([n.to_string().into_bytes()])
}

fn status(status: &str, message: &str) -> Action {
    Action::Reply(vec![
        Bytes::copy_from_slice(status.as_bytes()),
        Bytes::copy_from_slice(message.as_bytes()),
    ])
}

fn not_found() -> Action {
    Action::Reply(vec![Bytes::from_static(b"not_found")])
}

fn int_arg(block: &[u8]) -> Option<i64> {
    std::str::from_utf8(block).ok()?.parse().ok()
}

/// Keys of `map` in `(start, end]`, empty bounds open, at most `limit`
fn range<'a, V>(map: &'a BTreeMap<Vec<u8>, V>, start: &[u8], end: &[u8], limit: usize) -> Vec<(&'a Vec<u8>, &'a V)> {
    let lower = if start.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Excluded(start.to_vec())
    };
    map.range((lower, Bound::Unbounded))
        .take_while(|(key, _)| end.is_empty() || key.as_slice() <= end)
        .take(limit)
        .collect()
}

fn handle(blocks: &[Bytes], store: &Mutex<Store>, options: &ServerOptions, authed: &mut bool) -> Action {
    let name = blocks[0].as_ref();
    let args: Vec<Vec<u8>> = blocks[1..].iter().map(|b| b.to_vec()).collect();
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    let int = |i: usize| args.get(i).and_then(|b| int_arg(b));

    match name {
        b"auth" => {
            return if options.password.as_deref().map(str::as_bytes) == Some(arg(0).as_slice()) {
                *authed = true;
                ok([b"1".to_vec()])
            } else {
                status("error", "invalid password")
            };
        }
        _ if !*authed => return status("error", "authentication required"),
        b"debug_sleep" => {
            thread::sleep(Duration::from_millis(int(0).unwrap_or(0) as u64));
            return ok([b"1".to_vec()]);
        }
        b"debug_close" => return Action::Hangup,
        b"debug_garbage" => return Action::Raw(b"x\n".to_vec()),
        b"debug_status" => {
            let mut reply = vec![Bytes::from(arg(0))];
            reply.extend(args.iter().skip(1).cloned().map(Bytes::from));
            return Action::Reply(reply);
        }
        b"debug_echo" => return ok(args.clone()),
        _ => {}
    }

    let mut store = store.lock();
    store.purge_expired();

    match name {
        // ---------------------------------------------------------------------
        // Key-Value
        // ---------------------------------------------------------------------
        b"set" => {
            store.expires.remove(&arg(0));
            store.kv.insert(arg(0), arg(1));
            ok([b"1".to_vec()])
        }
        b"setx" => {
            let ttl = int(2).unwrap_or(0).max(0) as u64;
            store.kv.insert(arg(0), arg(1));
            store.expires.insert(arg(0), Instant::now() + Duration::from_secs(ttl));
            ok([b"1".to_vec()])
        }
        b"setnx" => {
            if store.kv.contains_key(&arg(0)) {
                ok_int(0)
            } else {
                store.kv.insert(arg(0), arg(1));
                ok_int(1)
            }
        }
        b"get" => match store.kv.get(&arg(0)) {
            Some(value) => ok([value.clone()]),
            None => not_found(),
        },
        b"getset" => match store.kv.insert(arg(0), arg(1)) {
            Some(old) => ok([old]),
            None => not_found(),
        },
        b"del" => {
            store.kv.remove(&arg(0));
            store.expires.remove(&arg(0));
            ok([b"1".to_vec()])
        }
        b"incr" => {
            let current = match store.kv.get(&arg(0)) {
                Some(value) => match int_arg(value) {
                    Some(n) => n,
                    None => return status("error", "value is not an integer or out of range"),
                },
                None => 0,
            };
            let next = current + int(1).unwrap_or(1);
            store.kv.insert(arg(0), next.to_string().into_bytes());
            ok_int(next)
        }
        b"exists" => ok_int(store.kv.contains_key(&arg(0)) as i64),
        b"expire" => {
            if store.kv.contains_key(&arg(0)) {
                let ttl = int(1).unwrap_or(0).max(0) as u64;
                store.expires.insert(arg(0), Instant::now() + Duration::from_secs(ttl));
                ok_int(1)
            } else {
                ok_int(0)
            }
        }
        b"ttl" => match store.expires.get(&arg(0)) {
            Some(at) => {
                let left = at.saturating_duration_since(Instant::now());
                ok_int(left.as_secs_f64().ceil() as i64)
            }
            None => ok_int(-1),
        },
        b"keys" => {
            let keys = range(&store.kv, &arg(0), &arg(1), int(2).unwrap_or(0) as usize)
                .into_iter()
                .map(|(key, _)| key.clone())
                .collect::<Vec<_>>();
            ok(keys)
        }
        b"scan" => {
            let pairs = range(&store.kv, &arg(0), &arg(1), int(2).unwrap_or(0) as usize)
                .into_iter()
                .flat_map(|(key, value)| [key.clone(), value.clone()])
                .collect::<Vec<_>>();
            ok(pairs)
        }
        b"multi_set" => {
            if args.len() % 2 != 0 {
                return status("client_error", "wrong number of arguments");
            }
            for pair in args.chunks(2) {
                store.kv.insert(pair[0].clone(), pair[1].clone());
            }
            ok_int((args.len() / 2) as i64)
        }
        b"multi_get" => {
            let mut out = Vec::new();
            for key in &args {
                if let Some(value) = store.kv.get(key) {
                    out.push(key.clone());
                    out.push(value.clone());
                }
            }
            ok(out)
        }
        b"multi_del" => {
            let removed = args.iter().filter(|key| store.kv.remove(*key).is_some()).count();
            ok_int(removed as i64)
        }
        b"dbsize" => {
            let bytes: usize = store.kv.iter().map(|(k, v)| k.len() + v.len()).sum();
            ok_int(bytes as i64)
        }

        // ---------------------------------------------------------------------
        // Hash
        // ---------------------------------------------------------------------
        b"hset" => {
            let fresh = store.hashes.entry(arg(0)).or_default().insert(arg(1), arg(2)).is_none();
            ok_int(fresh as i64)
        }
        b"hget" => match store.hashes.get(&arg(0)).and_then(|h| h.get(&arg(1))) {
            Some(value) => ok([value.clone()]),
            None => not_found(),
        },
        b"hdel" => {
            let removed = store
                .hashes
                .get_mut(&arg(0))
                .map_or(false, |h| h.remove(&arg(1)).is_some());
            ok_int(removed as i64)
        }
        b"hincr" => {
            let hash = store.hashes.entry(arg(0)).or_default();
            let current = hash.get(&arg(1)).and_then(|v| int_arg(v)).unwrap_or(0);
            let next = current + int(2).unwrap_or(1);
            hash.insert(arg(1), next.to_string().into_bytes());
            ok_int(next)
        }
        b"hexists" => {
            let found = store.hashes.get(&arg(0)).map_or(false, |h| h.contains_key(&arg(1)));
            ok_int(found as i64)
        }
        b"hsize" => ok_int(store.hashes.get(&arg(0)).map_or(0, |h| h.len()) as i64),
        b"hgetall" => {
            let pairs = store
                .hashes
                .get(&arg(0))
                .map(|h| h.iter().flat_map(|(k, v)| [k.clone(), v.clone()]).collect())
                .unwrap_or_default();
            ok::<Vec<Vec<u8>>>(pairs)
        }
        b"hkeys" => {
            let empty = BTreeMap::new();
            let hash = store.hashes.get(&arg(0)).unwrap_or(&empty);
            let keys = range(hash, &arg(1), &arg(2), int(3).unwrap_or(0) as usize)
                .into_iter()
                .map(|(key, _)| key.clone())
                .collect::<Vec<_>>();
            ok(keys)
        }
        b"hclear" => ok_int(store.hashes.remove(&arg(0)).map_or(0, |h| h.len()) as i64),

        // ---------------------------------------------------------------------
        // Sorted Set
        // ---------------------------------------------------------------------
        b"zset" => {
            let Some(score) = int(2) else {
                return status("client_error", "invalid score");
            };
            let fresh = store.zsets.entry(arg(0)).or_default().insert(arg(1), score).is_none();
            ok_int(fresh as i64)
        }
        b"zget" => match store.zsets.get(&arg(0)).and_then(|z| z.get(&arg(1))) {
            Some(score) => ok_int(*score),
            None => not_found(),
        },
        b"zdel" => {
            let removed = store
                .zsets
                .get_mut(&arg(0))
                .map_or(false, |z| z.remove(&arg(1)).is_some());
            ok_int(removed as i64)
        }
        b"zincr" => {
            let zset = store.zsets.entry(arg(0)).or_default();
            let score = zset.entry(arg(1)).or_insert(0);
            *score += int(2).unwrap_or(1);
            ok_int(*score)
        }
        b"zexists" => {
            let found = store.zsets.get(&arg(0)).map_or(false, |z| z.contains_key(&arg(1)));
            ok_int(found as i64)
        }
        b"zsize" => ok_int(store.zsets.get(&arg(0)).map_or(0, |z| z.len()) as i64),
        b"zrange" => {
            let mut entries: Vec<(Vec<u8>, i64)> = store
                .zsets
                .get(&arg(0))
                .map(|z| z.iter().map(|(k, s)| (k.clone(), *s)).collect())
                .unwrap_or_default();
            entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            let out = entries
                .into_iter()
                .skip(int(1).unwrap_or(0) as usize)
                .take(int(2).unwrap_or(0) as usize)
                .flat_map(|(k, s)| [k, s.to_string().into_bytes()])
                .collect::<Vec<_>>();
            ok(out)
        }
        b"zclear" => ok_int(store.zsets.remove(&arg(0)).map_or(0, |z| z.len()) as i64),
        b"multi_zset" => {
            let pairs = &args[1..];
            if pairs.len() % 2 != 0 {
                return status("client_error", "wrong number of arguments");
            }
            let zset = store.zsets.entry(arg(0)).or_default();
            for pair in pairs.chunks(2) {
                let Some(score) = int_arg(&pair[1]) else {
                    return status("client_error", "invalid score");
                };
                zset.insert(pair[0].clone(), score);
            }
            ok_int((pairs.len() / 2) as i64)
        }
        b"multi_zget" => {
            let mut out = Vec::new();
            if let Some(zset) = store.zsets.get(&arg(0)) {
                for key in &args[1..] {
                    if let Some(score) = zset.get(key) {
                        out.push(key.clone());
                        out.push(score.to_string().into_bytes());
                    }
                }
            }
            ok(out)
        }
        b"multi_zdel" => {
            let removed = match store.zsets.get_mut(&arg(0)) {
                Some(zset) => args[1..].iter().filter(|key| zset.remove(*key).is_some()).count(),
                None => 0,
            };
            ok_int(removed as i64)
        }

        // ---------------------------------------------------------------------
        // Queue
        // ---------------------------------------------------------------------
        b"qpush_front" | b"qpush_back" => {
            let queue = store.queues.entry(arg(0)).or_default();
            for item in &args[1..] {
                if name == b"qpush_front" {
                    queue.push_front(item.clone());
                } else {
                    queue.push_back(item.clone());
                }
            }
            ok_int(queue.len() as i64)
        }
        b"qpop_front" | b"qpop_back" => {
            let count = int(1).unwrap_or(1).max(1) as usize;
            let mut out = Vec::new();
            if let Some(queue) = store.queues.get_mut(&arg(0)) {
                for _ in 0..count {
                    let item = if name == b"qpop_front" {
                        queue.pop_front()
                    } else {
                        queue.pop_back()
                    };
                    match item {
                        Some(item) => out.push(item),
                        None => break,
                    }
                }
            }
            ok(out)
        }
        b"qsize" => ok_int(store.queues.get(&arg(0)).map_or(0, |q| q.len()) as i64),
        b"qfront" => match store.queues.get(&arg(0)).and_then(|q| q.front()) {
            Some(item) => ok([item.clone()]),
            None => not_found(),
        },
        b"qback" => match store.queues.get(&arg(0)).and_then(|q| q.back()) {
            Some(item) => ok([item.clone()]),
            None => not_found(),
        },
        b"qget" => {
            let queue = store.queues.get(&arg(0));
            let len = queue.map_or(0, |q| q.len()) as i64;
            let index = int(1).unwrap_or(0);
            let index = if index < 0 { len + index } else { index };
            match queue.and_then(|q| usize::try_from(index).ok().and_then(|i| q.get(i))) {
                Some(item) => ok([item.clone()]),
                None => not_found(),
            }
        }
        b"qrange" => {
            let out = store
                .queues
                .get(&arg(0))
                .map(|q| {
                    q.iter()
                        .skip(int(1).unwrap_or(0).max(0) as usize)
                        .take(int(2).unwrap_or(0) as usize)
                        .cloned()
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            ok(out)
        }
        b"qclear" => ok_int(store.queues.remove(&arg(0)).map_or(0, |q| q.len()) as i64),

        other => status(
            "client_error",
            &format!("Unknown Command: {}", String::from_utf8_lossy(other)),
        ),
    }
}
