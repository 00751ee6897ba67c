//! # Ingestion Pipeline
//!
//! Feeds decoded files into the registry, one phase at a time.
//!
//! A dataset directory has the layout
//!
//! ```text
//! dataset/
//! ├── initial/    keyword-matched source documents
//! ├── enriched/   records collected while reconstructing their threads
//! ├── reloaded/   re-fetched versions of known posts
//! └── users/      userList, reloaded-users.gz, deleted-users.gz
//! ```
//!
//! Every phase decodes its files in parallel and folds the results into the
//! registry sequentially, in file order.

use super::filter::KeywordFilter;
use super::reader::{DecodedFile, collect_files, decode_files};
use crate::config::Config;
use crate::error::AppError;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use threadloom_core::{
    Parents, PostId, ReconcileReport, Record, References, Registry, Slot, Stored, ThreadError,
    User, UserId, UserRegistry, UserState, classify, flatten, reconcile, write_snapshot,
};
use tracing::{debug, info, warn};

/// Phase directory names inside a dataset.
pub const INITIAL_DIR: &str = "initial";
pub const ENRICHED_DIR: &str = "enriched";
pub const RELOADED_DIR: &str = "reloaded";
pub const USERS_DIR: &str = "users";

/// Files of the users phase.
pub const USER_LIST_FILE: &str = "userList";
pub const RELOADED_USERS_FILE: &str = "reloaded-users.gz";
pub const DELETED_USERS_FILE: &str = "deleted-users.gz";

// =============================================================================
// REPORTS
// =============================================================================

/// Counters of one phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub files: usize,
    pub documents: usize,
    /// Documents dropped by the keyword filter.
    pub filtered: usize,
    pub inserted: usize,
    pub promoted: usize,
    pub excluded: usize,
    /// Records already stored with the same kind.
    pub known: usize,
    pub refreshed: usize,
}

impl PhaseReport {
    fn count(&mut self, stored: Option<Stored>) {
        match stored {
            Some(Stored::Inserted(_)) => self.inserted += 1,
            Some(Stored::Promoted(_)) => self.promoted += 1,
            Some(Stored::Excluded(_)) => self.excluded += 1,
            None => self.known += 1,
        }
    }
}

/// Counters of the users phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserReport {
    pub listed: usize,
    pub reloaded: usize,
    pub deleted: usize,
    pub unavailable: usize,
    pub reconcile: ReconcileReport,
}

/// Counters of a full dataset load. Skipped phases are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub initial: Option<PhaseReport>,
    pub enriched: Option<PhaseReport>,
    pub reloaded: Option<PhaseReport>,
    pub users: Option<UserReport>,
}

/// Result of a dataset load.
#[derive(Debug)]
pub struct Dataset {
    pub registry: Registry,
    pub users: UserRegistry,
    pub report: LoadReport,
}

// =============================================================================
// LOADER
// =============================================================================

/// Owns the registry for the duration of a load.
pub struct Loader {
    registry: Registry,
    users: UserRegistry,
    filter: KeywordFilter,
    workers: usize,
}

impl Loader {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            registry: Registry::with_exclusions(config.exclusions()),
            users: UserRegistry::new(),
            filter: KeywordFilter::new(&config.keywords),
            workers: config.workers,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    /// Bulk ingest: every document of every file under `dir` that passes the
    /// keyword filter is flattened and stored, and its posts are marked as
    /// sources.
    pub async fn ingest(&mut self, dir: &Path) -> Result<PhaseReport, AppError> {
        let files = decode_files(collect_files(dir)?, self.workers).await?;
        let mut report = PhaseReport {
            files: files.len(),
            ..PhaseReport::default()
        };
        for file in files {
            for document in file.documents {
                report.documents += 1;
                if !self.filter.matches_document(&document) {
                    report.filtered += 1;
                    continue;
                }
                self.store_sources(&file.path, document, &mut report)?;
            }
        }
        info!(dir = %dir.display(), ?report, "ingest complete");
        Ok(report)
    }

    /// Phase 1: the source documents, stored and marked as sources.
    pub async fn load_initial(&mut self, dir: &Path) -> Result<Option<PhaseReport>, AppError> {
        let Some(files) = self.phase_files(dir).await? else {
            return Ok(None);
        };
        let mut report = PhaseReport {
            files: files.len(),
            ..PhaseReport::default()
        };
        for file in files {
            for document in file.documents {
                report.documents += 1;
                self.store_sources(&file.path, document, &mut report)?;
            }
        }
        info!(?report, "initial phase complete");
        Ok(Some(report))
    }

    /// Phase 2: thread context. Records are stored as they are; posts not
    /// claimed by the initial phase become enriched.
    pub async fn load_enriched(&mut self, dir: &Path) -> Result<Option<PhaseReport>, AppError> {
        let Some(files) = self.phase_files(dir).await? else {
            return Ok(None);
        };
        let mut report = PhaseReport {
            files: files.len(),
            ..PhaseReport::default()
        };
        for file in files {
            for document in file.documents {
                report.documents += 1;
                let record = Record::from_value(document).map_err(|e| in_file(&file.path, e))?;
                let id = record.id().map_err(|e| in_file(&file.path, e))?;
                let stored = self
                    .store_new(record)
                    .map_err(|e| in_file(&file.path, e))?;
                report.count(stored);
                if !matches!(stored, Some(Stored::Excluded(_))) {
                    self.mark_enriched(&file.path, id)?;
                }
            }
        }
        info!(?report, "enriched phase complete");
        Ok(Some(report))
    }

    /// Phase 3: re-fetched versions, attached to their existing posts.
    pub async fn load_reloaded(&mut self, dir: &Path) -> Result<Option<PhaseReport>, AppError> {
        let Some(files) = self.phase_files(dir).await? else {
            return Ok(None);
        };
        let mut report = PhaseReport {
            files: files.len(),
            ..PhaseReport::default()
        };
        for file in files {
            for document in file.documents {
                report.documents += 1;
                let record = Record::from_value(document).map_err(|e| in_file(&file.path, e))?;
                self.registry
                    .attach_refreshed(record)
                    .map_err(|e| in_file(&file.path, e))?;
                report.refreshed += 1;
            }
        }
        info!(?report, "reloaded phase complete");
        Ok(Some(report))
    }

    /// Phase 4: user profiles, then user reconciliation.
    ///
    /// Listed users with a reloaded profile exist; those found among the
    /// deleted profiles are deleted; the rest are unavailable.
    pub async fn load_users(&mut self, dir: &Path) -> Result<Option<UserReport>, AppError> {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "users directory missing, skipping phase");
            return Ok(None);
        }
        let listed = read_user_list(&dir.join(USER_LIST_FILE))?;
        let decoded = decode_files(
            vec![dir.join(DELETED_USERS_FILE), dir.join(RELOADED_USERS_FILE)],
            self.workers,
        )
        .await?;
        let observed_at = Utc::now();
        let mut report = UserReport {
            listed: listed.len(),
            ..UserReport::default()
        };

        let mut files = decoded.into_iter();
        let (Some(deleted), Some(reloaded)) = (files.next(), files.next()) else {
            return Err(AppError::Task("user profile files not decoded".to_string()));
        };
        for document in deleted.documents {
            let profile = Record::from_value(document).map_err(|e| in_file(&deleted.path, e))?;
            let user = User::deleted(profile, observed_at).map_err(|e| in_file(&deleted.path, e))?;
            self.users.insert(user);
            report.deleted += 1;
        }
        for document in reloaded.documents {
            let profile = Record::from_value(document).map_err(|e| in_file(&reloaded.path, e))?;
            let user =
                User::from_profile(profile, observed_at).map_err(|e| in_file(&reloaded.path, e))?;
            if let Some(previous) = self.users.insert(user)
                && previous.state() == UserState::Deleted
            {
                report.deleted = report.deleted.saturating_sub(1);
            }
            report.reloaded += 1;
        }
        for id in listed {
            if !self.users.contains(id) {
                self.users.insert(User::unavailable(id));
                report.unavailable += 1;
            }
        }

        report.reconcile = reconcile(&self.registry, &mut self.users)?;
        info!(?report, "users phase complete");
        Ok(Some(report))
    }

    #[must_use]
    pub fn finish(self, report: LoadReport) -> Dataset {
        Dataset {
            registry: self.registry,
            users: self.users,
            report,
        }
    }

    /// Write a snapshot of the registry as it stands.
    pub fn checkpoint(&self, dir: &Path) -> Result<(), AppError> {
        write_snapshot(&self.registry, dir)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Decode a phase directory; `None` with a warning if it is missing.
    async fn phase_files(&self, dir: &Path) -> Result<Option<Vec<DecodedFile>>, AppError> {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "phase directory missing, skipping phase");
            return Ok(None);
        }
        let files = collect_files(dir)?;
        info!(dir = %dir.display(), files = files.len(), "decoding phase files");
        Ok(Some(decode_files(files, self.workers).await?))
    }

    /// Flatten a source document, store its records and mark them as sources.
    fn store_sources(
        &mut self,
        path: &Path,
        document: Value,
        report: &mut PhaseReport,
    ) -> Result<(), AppError> {
        for record in flatten(document).map_err(|e| in_file(path, e))? {
            let stored = self.store_new(record).map_err(|e| in_file(path, e))?;
            report.count(stored);
            if let Some(Stored::Inserted(id) | Stored::Promoted(id)) = stored {
                self.registry
                    .mark_source(id)
                    .map_err(|e| in_file(path, e))?;
            }
        }
        Ok(())
    }

    /// Store a record unless a post of the same kind already holds its id.
    ///
    /// A source post embedded by several retweets arrives several times;
    /// only the first copy is stored. A different kind under the same id is
    /// still a duplicate fault.
    fn store_new(&mut self, record: Record) -> Result<Option<Stored>, ThreadError> {
        let id = record.id()?;
        if let Slot::Occupied(existing) = self.registry.slot(id)
            && !self.registry.exclusions().contains(&id)
            && classify(&record)? == existing
        {
            let incoming = Parents::from_references(id, &References::of(&record)?)?;
            match self.registry.lookup(id).map(|post| post.parents()) {
                Some(stored) if *stored != incoming => debug!(
                    id = id.0,
                    kind = existing.name(),
                    stored = ?stored,
                    incoming = ?incoming,
                    "record already stored with other parents, keeping the first"
                ),
                _ => debug!(id = id.0, kind = existing.name(), "record already stored"),
            }
            return Ok(None);
        }
        self.registry.store(record).map(Some)
    }

    fn mark_enriched(&mut self, path: &Path, id: PostId) -> Result<(), AppError> {
        self.registry
            .mark_enriched(id)
            .map(|_| ())
            .map_err(|e| in_file(path, e))
    }
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Load a dataset directory through all four phases.
///
/// With a `checkpoint` directory, a snapshot is written after each phase.
pub async fn load_dataset(
    dir: &Path,
    config: &Config,
    checkpoint: Option<&Path>,
) -> Result<Dataset, AppError> {
    if !dir.is_dir() {
        return Err(AppError::Io(format!(
            "dataset directory does not exist: {}",
            dir.display()
        )));
    }
    let mut loader = Loader::new(config);
    let mut report = LoadReport::default();

    report.initial = loader.load_initial(&dir.join(INITIAL_DIR)).await?;
    save(&loader, checkpoint)?;
    report.enriched = loader.load_enriched(&dir.join(ENRICHED_DIR)).await?;
    save(&loader, checkpoint)?;
    report.reloaded = loader.load_reloaded(&dir.join(RELOADED_DIR)).await?;
    save(&loader, checkpoint)?;
    report.users = loader.load_users(&dir.join(USERS_DIR)).await?;

    Ok(loader.finish(report))
}

/// Bulk keyword ingest of a directory of raw document files.
pub async fn ingest(
    dir: &Path,
    config: &Config,
    checkpoint: Option<&Path>,
) -> Result<(Registry, PhaseReport), AppError> {
    let mut loader = Loader::new(config);
    let report = loader.ingest(dir).await?;
    save(&loader, checkpoint)?;
    Ok((loader.registry, report))
}

fn save(loader: &Loader, checkpoint: Option<&Path>) -> Result<(), AppError> {
    match checkpoint {
        Some(dir) => loader.checkpoint(dir),
        None => Ok(()),
    }
}

/// One decimal user id per line; blank lines are ignored.
fn read_user_list(path: &Path) -> Result<BTreeSet<UserId>, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::Io(format!("cannot read {}: {}", path.display(), e)))?;
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse().map(UserId).map_err(|_| {
                in_file(
                    path,
                    ThreadError::MalformedRecord(format!("'{}' is not a user id", line)),
                )
            })
        })
        .collect()
}

fn in_file(path: &Path, source: ThreadError) -> AppError {
    AppError::File {
        path: path.display().to_string(),
        source,
    }
}
