//! The `mock` store is provided to facilitate testing.
//!
//! It keeps objects in memory and counts every call, so tests can assert on
//! how often the remote store was touched.
use std::collections::{
    HashMap,
    HashSet,
};
use std::io::Read;
use std::sync::Mutex;
use std::sync::atomic::{
    AtomicBool,
    AtomicUsize,
    Ordering,
};

use crate::error::{
    RelayError,
    Result,
};
use crate::store::RemoteStore;

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    directories: Mutex<HashSet<String>>,
    refuse_put: AtomicBool,
    offline: AtomicBool,
    pub ensure_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Make every subsequent put report a refused write.
    pub fn refuse_put(&self, v: bool) {
        self.refuse_put.store(v, Ordering::SeqCst);
    }

    /// Make every subsequent call fail at the transport level.
    pub fn offline(&self, v: bool) {
        self.offline.store(v, Ordering::SeqCst);
    }

    /// Replace content behind the relay's back.
    pub fn insert(&self, path: &str, data: Vec<u8>) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(path.to_string(), data);
        }
    }

    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().ok()?.get(path).cloned()
    }

    pub fn has_directory(&self, path: &str) -> bool {
        match self.directories.lock() {
            Ok(v) => v.contains(path),
            Err(_) => false,
        }
    }

    pub fn calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
            + self.put_calls.load(Ordering::SeqCst)
            + self.get_calls.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RelayError::Transport(String::from("mock store offline")));
        }
        Ok(())
    }

    fn poisoned() -> RelayError {
        RelayError::Storage(String::from("mock store lock poisoned"))
    }
}

impl RemoteStore for MemoryStore {
    fn ensure_directory(&self, path: &str) -> Result<bool> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let mut dirs = self.directories.lock().map_err(|_| MemoryStore::poisoned())?;
        dirs.insert(path.to_string());
        Ok(true)
    }

    fn put_object(&self, src: &mut dyn Read, remote_path: &str, size_hint: u64) -> Result<bool> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if self.refuse_put.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let mut data = Vec::with_capacity(size_hint as usize);
        src.read_to_end(&mut data)?;
        self.insert(remote_path, data);
        Ok(true)
    }

    fn get_object(&self, remote_path: &str) -> Result<Vec<u8>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        match self.object(remote_path) {
            Some(v) => Ok(v),
            None => Err(RelayError::NotFound(remote_path.to_string())),
        }
    }
}
