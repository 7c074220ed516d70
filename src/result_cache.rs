use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis_fetch::{AnalysisResult, AnalyzeRequest};

const CACHE_VERSION: u32 = 2;
const CACHE_DIR: &str = "parlay_terminal";
const CACHE_FILE: &str = "analysis_cache.json";
const MAX_ENTRIES: usize = 256;

static CACHE: Mutex<Option<AnalysisCache>> = Mutex::new(None);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisCache {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    result: AnalysisResult,
    fetched_at: u64,
}

pub fn cache_key(req: &AnalyzeRequest) -> String {
    format!(
        "{}|{}|{}|{}",
        req.player.trim().to_lowercase(),
        req.stat_type.wire_name(),
        req.line,
        req.bet_type.wire_name()
    )
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self {
            version: CACHE_VERSION,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, req: &AnalyzeRequest, ttl_secs: u64, now: u64) -> Option<&AnalysisResult> {
        let entry = self.entries.get(&cache_key(req))?;
        if now.saturating_sub(entry.fetched_at) > ttl_secs {
            return None;
        }
        Some(&entry.result)
    }

    pub fn insert(&mut self, req: &AnalyzeRequest, result: AnalysisResult, now: u64) {
        self.version = CACHE_VERSION;
        self.entries.insert(
            cache_key(req),
            CacheEntry {
                result,
                fetched_at: now,
            },
        );
        if self.entries.len() > MAX_ENTRIES {
            self.evict_oldest(self.entries.len() - MAX_ENTRIES);
        }
    }

    /// Drop entries older than `ttl_secs`.
    pub fn prune(&mut self, ttl_secs: u64, now: u64) {
        self.entries
            .retain(|_, e| now.saturating_sub(e.fetched_at) <= ttl_secs);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_oldest(&mut self, count: usize) {
        let mut by_age: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.fetched_at))
            .collect();
        by_age.sort_by_key(|(_, at)| *at);
        for (key, _) in by_age.into_iter().take(count) {
            self.entries.remove(&key);
        }
    }
}

pub fn lookup(req: &AnalyzeRequest, ttl_secs: u64) -> Option<AnalysisResult> {
    let now = now_secs();
    let mut guard = CACHE.lock().expect("analysis cache lock poisoned");
    let cache = guard.get_or_insert_with(load_cache_file);
    cache.get(req, ttl_secs, now).cloned()
}

pub fn store(req: &AnalyzeRequest, result: &AnalysisResult, ttl_secs: u64) -> Result<()> {
    let now = now_secs();
    let mut guard = CACHE.lock().expect("analysis cache lock poisoned");
    let cache = guard.get_or_insert_with(load_cache_file);
    cache.prune(ttl_secs, now);
    cache.insert(req, result.clone(), now);
    save_cache_file(cache)
}

/// Empty the cache in memory and on disk. Returns how many entries were dropped.
pub fn clear_all() -> Result<usize> {
    let mut guard = CACHE.lock().expect("analysis cache lock poisoned");
    let cache = guard.get_or_insert_with(load_cache_file);
    let dropped = cache.len();
    cache.clear();
    save_cache_file(cache)?;
    Ok(dropped)
}

fn load_cache_file() -> AnalysisCache {
    let Some(path) = cache_path() else {
        return AnalysisCache::new();
    };
    let Ok(raw) = fs::read_to_string(path) else {
        return AnalysisCache::new();
    };
    let cache = serde_json::from_str::<AnalysisCache>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return AnalysisCache::new();
    }
    cache
}

fn save_cache_file(cache: &AnalysisCache) -> Result<()> {
    let Some(path) = cache_path() else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).context("create cache dir")?;
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize analysis cache")?;
    fs::write(&tmp, json).context("write analysis cache")?;
    fs::rename(&tmp, &path).context("swap analysis cache")?;
    Ok(())
}

fn cache_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR).join(CACHE_FILE));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR).join(CACHE_FILE))
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
