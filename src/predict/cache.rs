//! Lazily built, shared feature history
//!
//! The full history is loaded and run through the feature pipeline the first
//! time any caller needs it. Concurrent first callers wait for a single build
//! and then share the same snapshot.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::info;
use parking_lot::{Mutex, RwLock};

use crate::data::Database;
use crate::features::matrix::FeatureMatrix;
use crate::features::pipeline::FeaturePipeline;
use crate::features::rules::MatchupRule;
use crate::features::vocabulary::CategoryVocabulary;
use crate::{identity_key, normalize_name, FightRecord, Result};

/// Where the normalized fight history comes from
pub trait HistorySource: Send + Sync {
    fn load(&self) -> Result<Vec<FightRecord>>;
}

/// History stored in the SQLite database
pub struct SqliteHistory {
    path: PathBuf,
}

impl SqliteHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SqliteHistory { path: path.into() }
    }
}

impl HistorySource for SqliteHistory {
    fn load(&self) -> Result<Vec<FightRecord>> {
        Database::open(&self.path)?.get_all_fights()
    }
}

/// Fixed history held in memory
pub struct InMemoryHistory {
    records: Vec<FightRecord>,
}

impl InMemoryHistory {
    pub fn new(records: Vec<FightRecord>) -> Self {
        InMemoryHistory { records }
    }
}

impl HistorySource for InMemoryHistory {
    fn load(&self) -> Result<Vec<FightRecord>> {
        Ok(self.records.clone())
    }
}

/// One computed snapshot of the history and its features
pub struct CachedHistory {
    pub records: Vec<FightRecord>,
    pub matrix: FeatureMatrix,
    pub rules: Vec<MatchupRule>,
    /// Distinct competitor names, sorted
    pub competitors: Vec<String>,
    /// Case-folded identity to index in `competitors`; the first in sort order wins
    identities: HashMap<String, usize>,
}

impl CachedHistory {
    pub fn build(records: Vec<FightRecord>, vocabulary: Option<CategoryVocabulary>) -> Result<Self> {
        let pipeline = FeaturePipeline::standard();
        let matrix = pipeline.run(records.clone(), vocabulary)?;

        let mut competitors: Vec<String> = records
            .iter()
            .flat_map(|r| [r.fighter_a.clone(), r.fighter_b.clone()])
            .collect();
        competitors.sort();
        competitors.dedup();

        let mut identities = HashMap::with_capacity(competitors.len());
        for (i, name) in competitors.iter().enumerate() {
            identities.entry(identity_key(name)).or_insert(i);
        }

        Ok(CachedHistory {
            records,
            matrix,
            rules: pipeline.matchup_rules(),
            competitors,
            identities,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.competitors
            .binary_search_by(|c| c.as_str().cmp(name))
            .is_ok()
    }

    /// Stored name for `name`, matched exactly first, then by identity key
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let name = normalize_name(name);
        if let Ok(i) = self
            .competitors
            .binary_search_by(|c| c.as_str().cmp(name.as_str()))
        {
            return Some(&self.competitors[i]);
        }
        self.identities
            .get(&identity_key(&name))
            .map(|&i| self.competitors[i].as_str())
    }
}

pub struct FeatureCache {
    source: Box<dyn HistorySource>,
    vocabulary: Option<CategoryVocabulary>,
    state: RwLock<Option<Arc<CachedHistory>>>,
    build_lock: Mutex<()>,
    builds: AtomicUsize,
}

impl FeatureCache {
    /// `vocabulary` pins one-hot categories to those the model was trained on
    pub fn new(source: Box<dyn HistorySource>, vocabulary: Option<CategoryVocabulary>) -> Self {
        FeatureCache {
            source,
            vocabulary,
            state: RwLock::new(None),
            build_lock: Mutex::new(()),
            builds: AtomicUsize::new(0),
        }
    }

    /// The current snapshot, building it on first use.
    ///
    /// A failed build leaves the cache empty so the next call retries.
    pub fn get(&self) -> Result<Arc<CachedHistory>> {
        if let Some(cached) = self.state.read().as_ref() {
            return Ok(Arc::clone(cached));
        }

        let _guard = self.build_lock.lock();
        if let Some(cached) = self.state.read().as_ref() {
            return Ok(Arc::clone(cached));
        }

        let records = self.source.load()?;
        info!("Computing features for {} fights", records.len());
        let built = Arc::new(CachedHistory::build(records, self.vocabulary.clone())?);
        self.builds.fetch_add(1, Ordering::SeqCst);
        *self.state.write() = Some(Arc::clone(&built));
        Ok(built)
    }

    /// Drop the snapshot; the next `get` rebuilds from the source
    pub fn invalidate(&self) {
        let _guard = self.build_lock.lock();
        *self.state.write() = None;
    }

    /// Number of completed builds
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}
