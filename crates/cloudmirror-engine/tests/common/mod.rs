//! In-memory remote used by the engine integration tests.
//!
//! Implements both ports. Failures can be scripted per path, every fetch is
//! recorded, and the number of concurrently open streams is tracked.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream};

use cloudmirror_core::{
    ByteStream, ContentFetcher, ListingError, ListingSource, MirrorConfig, RemoteEntry,
    TransferError, TransferEvent,
};
use tokio::sync::mpsc::UnboundedReceiver;

const CHUNK_SIZE: usize = 16;

/// Tracks streams that are open right now and the highest count seen.
#[derive(Debug, Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

struct OpenStream(Arc<Gauge>);

impl OpenStream {
    fn enter(gauge: &Arc<Gauge>) -> Self {
        let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
        gauge.peak.fetch_max(now, Ordering::SeqCst);
        Self(Arc::clone(gauge))
    }
}

impl Drop for OpenStream {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scriptable fake remote account.
#[derive(Default)]
pub struct FakeRemote {
    dirs: BTreeMap<String, Vec<RemoteEntry>>,
    files: HashMap<String, Bytes>,
    scripted: Mutex<HashMap<String, VecDeque<TransferError>>>,
    fetches: Mutex<Vec<String>>,
    listed: Mutex<Vec<String>>,
    gauge: Arc<Gauge>,
    chunk_delay: Duration,
}

impl FakeRemote {
    pub fn new() -> Self {
        let mut remote = Self::default();
        remote.dirs.insert(String::new(), Vec::new());
        remote
    }

    /// Add a file, creating its parent directories.
    pub fn file(mut self, path: &str, content: &[u8]) -> Self {
        self.ensure_dir(parent_of(path));
        self.dirs
            .entry(parent_of(path).to_string())
            .or_default()
            .push(RemoteEntry::file(path, content.len() as u64));
        self.files
            .insert(path.to_string(), Bytes::copy_from_slice(content));
        self
    }

    /// Fail the next fetches of `path` with these errors, in order.
    pub fn fail(self, path: &str, errors: Vec<TransferError>) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .insert(path.to_string(), errors.into());
        self
    }

    /// Sleep this long before every chunk.
    pub const fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    fn ensure_dir(&mut self, dir: &str) {
        if self.dirs.contains_key(dir) {
            return;
        }
        let parent = parent_of(dir).to_string();
        self.ensure_dir(&parent);
        self.dirs
            .entry(parent)
            .or_default()
            .push(RemoteEntry::dir(dir));
        self.dirs.insert(dir.to_string(), Vec::new());
    }

    /// Every fetched path, in call order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    /// Number of fetches of `path`.
    pub fn fetch_count(&self, path: &str) -> usize {
        self.fetches().iter().filter(|p| *p == path).count()
    }

    /// Every listed directory, in call order.
    pub fn listed(&self) -> Vec<String> {
        self.listed.lock().unwrap().clone()
    }

    /// Highest number of simultaneously open streams.
    pub fn peak_in_flight(&self) -> usize {
        self.gauge.peak.load(Ordering::SeqCst)
    }
}

fn parent_of(path: &str) -> &str {
    path.rfind('/').map_or("", |idx| &path[..idx])
}

#[async_trait]
impl ListingSource for FakeRemote {
    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteEntry>, ListingError> {
        self.listed.lock().unwrap().push(path.to_string());
        self.dirs
            .get(path)
            .cloned()
            .ok_or_else(|| ListingError::not_found(path))
    }
}

#[async_trait]
impl ContentFetcher for FakeRemote {
    async fn fetch(&self, entry: &RemoteEntry) -> Result<ByteStream, TransferError> {
        self.fetches.lock().unwrap().push(entry.path.clone());

        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(&entry.path)
            .and_then(VecDeque::pop_front);
        if let Some(err) = scripted {
            return Err(err);
        }

        let content = self
            .files
            .get(&entry.path)
            .cloned()
            .ok_or_else(|| TransferError::not_found(&entry.path))?;

        let chunks: VecDeque<Bytes> = content
            .chunks(CHUNK_SIZE)
            .map(Bytes::copy_from_slice)
            .collect();
        let open = OpenStream::enter(&self.gauge);
        let delay = self.chunk_delay;

        let stream = stream::unfold((chunks, open), move |(mut chunks, open)| async move {
            let chunk = chunks.pop_front()?;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Some((Ok(chunk), (chunks, open)))
        });
        Ok(stream.boxed())
    }
}

/// Config rooted at the account root.
pub fn config(dest: &Path) -> MirrorConfig {
    MirrorConfig::new("/", dest)
}

/// Drain whatever the channel holds right now.
pub fn drain(rx: &mut UnboundedReceiver<TransferEvent>) -> Vec<TransferEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Relative paths of every regular file below `root`, sorted.
pub fn local_files(root: &Path) -> Vec<String> {
    fn walk(dir: &Path, root: &Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(&path, root, out);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
