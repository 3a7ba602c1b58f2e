//! The import pipeline: search the food source per category term, map each
//! item, write it, and commit in batches.
//!
//! The orchestrator is generic over where foods come from ([`FoodSource`]) and
//! where they go ([`StoreConnector`]), so the same loop drives the `SQLite`
//! store in production and in-memory doubles in tests.

use std::thread;

use anyhow::{Context, anyhow};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{DuplicatePolicy, Settings};
use crate::error::ImportError;
use crate::models::{ParsedFood, WrittenFood};
use crate::retry::RetryPolicy;
use crate::usda::{SearchFood, parse_search_food};

/// A searchable catalogue of foods.
///
/// The CLI implements this with reqwest against FoodData Central. Transport
/// failures should surface as [`ImportError::SourceUnavailable`] so the run
/// can move on to the next category.
pub trait FoodSource {
    fn search(&self, term: &str, page: u32) -> Result<Vec<SearchFood>, ImportError>;
}

/// The operations the importer performs on an open store connection.
pub trait ImportStore {
    fn resolve_category(&mut self, name: &str) -> anyhow::Result<i64>;
    fn write_food(
        &mut self,
        category_id: i64,
        food: &ParsedFood,
        run_id: &str,
    ) -> anyhow::Result<WrittenFood>;
    fn contains_fdc_id(&mut self, fdc_id: i64) -> anyhow::Result<bool>;
    fn commit(&mut self) -> anyhow::Result<()>;
    fn rollback(&mut self) -> anyhow::Result<()>;
}

/// Opens store connections, initially and after a failed commit.
pub trait StoreConnector {
    type Store: ImportStore;

    fn connect(&self) -> anyhow::Result<Self::Store>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The commit failed and the connection was replaced; `lost` writes since
    /// the previous commit are gone.
    Reconnected { lost: usize },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryReport {
    pub name: String,
    pub category_id: Option<i64>,
    /// Items returned by the source, before the per-category cap.
    pub found: usize,
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub failed: usize,
    pub nutrition_missing: usize,
}

impl CategoryReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub run_id: String,
    pub categories: Vec<CategoryReport>,
    pub total_imported: usize,
    /// Successful batch commits; the per-category commit is not counted.
    pub commits: usize,
    pub reconnects: u32,
    pub lost_writes: usize,
    /// Set when a fatal error ended the run early.
    pub aborted: Option<String>,
}

impl ImportSummary {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            categories: Vec::new(),
            total_imported: 0,
            commits: 0,
            reconnects: 0,
            lost_writes: 0,
            aborted: None,
        }
    }
}

fn connect<C: StoreConnector>(connector: &C, policy: RetryPolicy) -> Result<C::Store, ImportError> {
    policy
        .retry("database connect", |_| connector.connect())
        .map_err(|e| ImportError::Connect {
            attempts: e.attempts,
            source: e.last,
        })
}

/// The live connection plus the bookkeeping needed to replace it.
struct Session<'a, C: StoreConnector> {
    connector: &'a C,
    policy: RetryPolicy,
    max_reconnects: u32,
    /// `None` only after the old connection was released and its replacement
    /// could not be opened.
    store: Option<C::Store>,
    pending: usize,
    commits: usize,
    reconnects: u32,
    lost: usize,
}

impl<'a, C: StoreConnector> Session<'a, C> {
    fn open(connector: &'a C, policy: RetryPolicy, max_reconnects: u32) -> Result<Self, ImportError> {
        let store = connect(connector, policy)?;
        Ok(Self {
            connector,
            policy,
            max_reconnects,
            store: Some(store),
            pending: 0,
            commits: 0,
            reconnects: 0,
            lost: 0,
        })
    }

    fn store(&mut self) -> Result<&mut C::Store, ImportError> {
        self.store
            .as_mut()
            .ok_or_else(|| ImportError::Store(anyhow!("no open database connection")))
    }

    /// Close the current connection, then open a new one. The old connection
    /// goes first: a `SQLite` writer whose COMMIT failed may still hold the lock
    /// the new connection needs to read the schema.
    fn reconnect(&mut self) -> Result<(), ImportError> {
        if let Some(mut old) = self.store.take() {
            if let Err(e) = old.rollback() {
                warn!("rollback before reconnect failed: {e:#}");
            }
        }
        self.store = Some(connect(self.connector, self.policy)?);
        Ok(())
    }

    /// Commit pending writes. A failed commit drops the batch and swaps in a
    /// fresh connection, up to the reconnect budget.
    fn commit_batch(&mut self) -> Result<CommitOutcome, ImportError> {
        match self.store()?.commit() {
            Ok(()) => {
                debug!(writes = self.pending, "batch committed");
                self.pending = 0;
                self.commits += 1;
                Ok(CommitOutcome::Committed)
            }
            Err(e) => {
                warn!("commit of {} write(s) failed: {e:#}", self.pending);
                // On the fatal paths below the writes stay pending; the
                // caller's abort handling discards them.
                if self.reconnects >= self.max_reconnects {
                    return Err(ImportError::ReconnectBudgetExhausted {
                        reconnects: self.reconnects,
                    });
                }
                self.reconnects += 1;
                info!(
                    "reconnecting to the database ({}/{})",
                    self.reconnects, self.max_reconnects
                );
                self.reconnect()?;
                let lost = std::mem::take(&mut self.pending);
                self.lost += lost;
                Ok(CommitOutcome::Reconnected { lost })
            }
        }
    }
}

pub struct Importer<S, C> {
    settings: Settings,
    source: S,
    connector: C,
}

impl<S: FoodSource, C: StoreConnector> Importer<S, C> {
    pub fn new(settings: Settings, source: S, connector: C) -> Self {
        Self {
            settings,
            source,
            connector,
        }
    }

    /// Run every configured category term.
    ///
    /// Fails only before the loop starts (credential, initial connect). A
    /// fatal error inside the loop rolls back, stops the run, and comes back as
    /// a summary with `aborted` set.
    pub fn run(&self) -> Result<ImportSummary, ImportError> {
        self.settings.source.validate()?;
        let import = &self.settings.import;

        let mut session = Session::open(
            &self.connector,
            import.connect_policy(),
            import.max_reconnects,
        )?;
        let mut summary = ImportSummary::new();
        info!(
            run_id = %summary.run_id,
            "starting import of {} categor(ies), up to {} foods each",
            import.search_terms.len(),
            import.max_per_category
        );

        for term in &import.search_terms {
            let mut report = CategoryReport::new(term);
            let result = self.import_category(&mut session, term, &summary.run_id, &mut report);
            if result.is_err() {
                let discarded = std::mem::take(&mut session.pending);
                session.lost += discarded;
                report.imported = report.imported.saturating_sub(discarded);
            }
            summary.total_imported += report.imported;
            summary.categories.push(report);

            if let Err(e) = result {
                if let Some(store) = session.store.as_mut() {
                    if let Err(rb) = store.rollback() {
                        warn!("rollback after fatal error failed: {rb:#}");
                    }
                }
                error!("import aborted: {e}");
                summary.aborted = Some(e.to_string());
                break;
            }
        }

        summary.commits = session.commits;
        summary.reconnects = session.reconnects;
        summary.lost_writes = session.lost;
        drop(session);

        info!(
            run_id = %summary.run_id,
            "import finished: {} foods imported",
            summary.total_imported
        );
        Ok(summary)
    }

    fn import_category(
        &self,
        session: &mut Session<'_, C>,
        term: &str,
        run_id: &str,
        report: &mut CategoryReport,
    ) -> Result<(), ImportError> {
        let import = &self.settings.import;
        info!("importing category '{term}'");

        let category_id = session.store()?.resolve_category(term)?;
        session
            .store()?
            .commit()
            .with_context(|| format!("Failed to commit category '{term}'"))?;
        report.category_id = Some(category_id);

        let items = match self.source.search(term, import.page) {
            Ok(items) => items,
            Err(e) if !e.is_fatal() => {
                warn!("{e}");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        report.found = items.len();

        let batch = import.commit_every();
        let delay = import.item_delay();
        let take = items.len().min(import.max_per_category);

        for (i, item) in items.iter().take(take).enumerate() {
            let food = parse_search_food(item, self.settings.source.brand);

            if self.is_duplicate(session, &food)? {
                debug!(fdc_id = food.fdc_id, "skipping already imported food");
                report.skipped_duplicates += 1;
                continue;
            }

            match session.store()?.write_food(category_id, &food, run_id) {
                Ok(written) => {
                    report.imported += 1;
                    if !written.nutrition_recorded {
                        report.nutrition_missing += 1;
                    }
                    session.pending += 1;
                    if session.pending >= batch {
                        if let CommitOutcome::Reconnected { lost } = session.commit_batch()? {
                            report.imported = report.imported.saturating_sub(lost);
                        }
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    warn!("failed to import '{}': {e:#}", food.name);
                }
            }

            if i + 1 < take && !delay.is_zero() {
                thread::sleep(delay);
            }
        }

        if session.pending > 0 {
            if let CommitOutcome::Reconnected { lost } = session.commit_batch()? {
                report.imported = report.imported.saturating_sub(lost);
            }
        }

        info!(
            "imported {} of {} foods for '{term}'",
            report.imported, report.found
        );
        Ok(())
    }

    fn is_duplicate(&self, session: &mut Session<'_, C>, food: &ParsedFood) -> Result<bool, ImportError> {
        if self.settings.import.duplicates != DuplicatePolicy::SkipExisting {
            return Ok(false);
        }
        let Some(fdc_id) = food.fdc_id else {
            return Ok(false);
        };
        match session.store()?.contains_fdc_id(fdc_id) {
            Ok(exists) => Ok(exists),
            Err(e) => {
                warn!(fdc_id, "duplicate check failed, importing anyway: {e:#}");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::rc::Rc;
    use std::time::Duration;

    use rusqlite::Connection;

    use super::*;
    use crate::config::{ImportConfig, SourceConfig};
    use crate::db::{Database, SqliteConnector};
    use crate::usda::SearchNutrient;

    #[derive(Default)]
    struct MockState {
        connects: u32,
        fail_connects: u32,
        commit_calls: usize,
        fail_commit_at: Vec<usize>,
        /// Writes flushed by each successful commit, in order.
        commit_log: Vec<usize>,
        committed: usize,
        categories: Vec<String>,
        existing: HashSet<i64>,
        next_food_id: i64,
        rollbacks: usize,
        /// Stores connected and not yet dropped.
        live: usize,
        /// Refuse to connect while another store is live, like a file lock.
        exclusive: bool,
    }

    type Shared = Rc<RefCell<MockState>>;

    struct MockStore {
        state: Shared,
        pending: usize,
    }

    impl ImportStore for MockStore {
        fn resolve_category(&mut self, name: &str) -> anyhow::Result<i64> {
            let mut state = self.state.borrow_mut();
            let pos = match state.categories.iter().position(|c| c == name) {
                Some(pos) => pos,
                None => {
                    state.categories.push(name.to_string());
                    state.categories.len() - 1
                }
            };
            Ok(i64::try_from(pos).unwrap() + 1)
        }

        fn write_food(
            &mut self,
            _category_id: i64,
            food: &ParsedFood,
            _run_id: &str,
        ) -> anyhow::Result<WrittenFood> {
            if food.name.starts_with("bad") {
                return Err(anyhow!("Failed to insert food '{}'", food.name));
            }
            let mut state = self.state.borrow_mut();
            state.next_food_id += 1;
            self.pending += 1;
            Ok(WrittenFood {
                food_id: state.next_food_id,
                nutrition_recorded: food.calories().is_some(),
            })
        }

        fn contains_fdc_id(&mut self, fdc_id: i64) -> anyhow::Result<bool> {
            Ok(self.state.borrow().existing.contains(&fdc_id))
        }

        fn commit(&mut self) -> anyhow::Result<()> {
            let mut state = self.state.borrow_mut();
            state.commit_calls += 1;
            let call = state.commit_calls;
            if state.fail_commit_at.contains(&call) {
                return Err(anyhow!("server has gone away"));
            }
            state.commit_log.push(self.pending);
            state.committed += self.pending;
            self.pending = 0;
            Ok(())
        }

        fn rollback(&mut self) -> anyhow::Result<()> {
            self.state.borrow_mut().rollbacks += 1;
            self.pending = 0;
            Ok(())
        }
    }

    impl Drop for MockStore {
        fn drop(&mut self) {
            self.state.borrow_mut().live -= 1;
        }
    }

    struct MockConnector {
        state: Shared,
    }

    impl StoreConnector for MockConnector {
        type Store = MockStore;

        fn connect(&self) -> anyhow::Result<MockStore> {
            let mut state = self.state.borrow_mut();
            state.connects += 1;
            if state.connects <= state.fail_connects {
                return Err(anyhow!("connection refused"));
            }
            if state.exclusive && state.live > 0 {
                return Err(anyhow!("database is locked"));
            }
            state.live += 1;
            Ok(MockStore {
                state: Rc::clone(&self.state),
                pending: 0,
            })
        }
    }

    #[derive(Default)]
    struct MockSource {
        results: HashMap<String, Vec<SearchFood>>,
        unavailable: HashSet<String>,
        calls: RefCell<Vec<String>>,
    }

    impl MockSource {
        fn with(term: &str, foods: Vec<SearchFood>) -> Self {
            let mut source = Self::default();
            source.results.insert(term.to_string(), foods);
            source
        }
    }

    impl FoodSource for &MockSource {
        fn search(&self, term: &str, _page: u32) -> Result<Vec<SearchFood>, ImportError> {
            self.calls.borrow_mut().push(term.to_string());
            if self.unavailable.contains(term) {
                return Err(ImportError::SourceUnavailable {
                    term: term.to_string(),
                    source: anyhow!("HTTP status server error (503 Service Unavailable)"),
                });
            }
            Ok(self.results.get(term).cloned().unwrap_or_default())
        }
    }

    fn food(fdc_id: i64, name: &str, calories: Option<f64>) -> SearchFood {
        let mut food_nutrients = vec![SearchNutrient {
            nutrient_id: Some(1003),
            value: Some(2.5),
            ..SearchNutrient::default()
        }];
        if let Some(kcal) = calories {
            food_nutrients.push(SearchNutrient {
                nutrient_id: Some(1008),
                value: Some(kcal),
                ..SearchNutrient::default()
            });
        }
        SearchFood {
            fdc_id: Some(fdc_id),
            description: name.to_string(),
            food_nutrients,
            ..SearchFood::default()
        }
    }

    fn foods(n: i64) -> Vec<SearchFood> {
        (1..=n)
            .map(|i| food(i, &format!("Food {i}"), Some(100.0)))
            .collect()
    }

    fn settings(terms: &[&str]) -> Settings {
        Settings {
            source: SourceConfig {
                api_key: Some("test-key".to_string()),
                ..SourceConfig::default()
            },
            import: ImportConfig {
                search_terms: terms.iter().map(ToString::to_string).collect(),
                item_delay_ms: 0,
                connect_delay_ms: 0,
                ..ImportConfig::default()
            },
        }
    }

    fn run_with(settings: Settings, source: &MockSource, state: &Shared) -> Result<ImportSummary, ImportError> {
        let connector = MockConnector {
            state: Rc::clone(state),
        };
        Importer::new(settings, source, connector).run()
    }

    #[test]
    fn test_commits_every_batch() {
        let state = Shared::default();
        let source = MockSource::with("apple", foods(45));
        let summary = run_with(settings(&["apple"]), &source, &state).unwrap();

        // Category commit, then 20 + 20 + 5
        assert_eq!(state.borrow().commit_log, vec![0, 20, 20, 5]);
        assert_eq!(summary.commits, 3);
        assert_eq!(summary.total_imported, 45);
        assert_eq!(summary.categories[0].found, 45);
        assert_eq!(summary.categories[0].category_id, Some(1));
        assert!(summary.aborted.is_none());
        assert!(Uuid::parse_str(&summary.run_id).is_ok());
    }

    #[test]
    fn test_exact_batch_has_no_trailing_commit() {
        let state = Shared::default();
        let source = MockSource::with("apple", foods(40));
        let summary = run_with(settings(&["apple"]), &source, &state).unwrap();
        assert_eq!(state.borrow().commit_log, vec![0, 20, 20]);
        assert_eq!(summary.commits, 2);
    }

    #[test]
    fn test_commit_failure_reconnects_and_continues() {
        let state = Shared::default();
        // Calls: 1 category, 2 first batch, 3 second batch
        state.borrow_mut().fail_commit_at = vec![3];
        let source = MockSource::with("apple", foods(45));
        let summary = run_with(settings(&["apple"]), &source, &state).unwrap();

        let state = state.borrow();
        assert_eq!(state.connects, 2);
        assert_eq!(state.commit_log, vec![0, 20, 5]);
        assert_eq!(state.committed, 25);
        assert_eq!(summary.reconnects, 1);
        assert_eq!(summary.lost_writes, 20);
        assert_eq!(summary.commits, 2);
        assert_eq!(summary.total_imported, 25);
        assert!(summary.aborted.is_none());
        assert_eq!(state.rollbacks, 1);
    }

    #[test]
    fn test_reconnect_releases_old_connection_first() {
        let state = Shared::default();
        {
            let mut state = state.borrow_mut();
            state.exclusive = true;
            state.fail_commit_at = vec![3];
        }
        let source = MockSource::with("apple", foods(45));
        let summary = run_with(settings(&["apple"]), &source, &state).unwrap();

        assert!(summary.aborted.is_none());
        assert_eq!(summary.reconnects, 1);
        assert_eq!(summary.total_imported, 25);
        let state = state.borrow();
        assert_eq!(state.connects, 2);
        assert_eq!(state.live, 0);
    }

    #[test]
    fn test_reconnect_budget_exhausted_aborts() {
        let state = Shared::default();
        state.borrow_mut().fail_commit_at = vec![3, 4];
        let source = MockSource::with("apple", foods(45));
        let mut settings = settings(&["apple", "rice"]);
        settings.import.max_reconnects = 1;

        let summary = run_with(settings, &source, &state).unwrap();

        assert!(summary.aborted.unwrap().contains("1 reconnect"));
        assert_eq!(summary.reconnects, 1);
        assert_eq!(summary.lost_writes, 25);
        assert_eq!(summary.total_imported, 20);
        assert_eq!(summary.categories.len(), 1);
        // One before the reconnect, one when the run aborts
        assert_eq!(state.borrow().rollbacks, 2);
        assert_eq!(*source.calls.borrow(), vec!["apple"]);
    }

    #[test]
    fn test_connect_retries_then_succeeds() {
        let state = Shared::default();
        state.borrow_mut().fail_connects = 2;
        let source = MockSource::with("apple", foods(3));
        let summary = run_with(settings(&["apple"]), &source, &state).unwrap();
        assert_eq!(state.borrow().connects, 3);
        assert_eq!(summary.total_imported, 3);
    }

    #[test]
    fn test_connect_exhausted_is_fatal() {
        let state = Shared::default();
        state.borrow_mut().fail_connects = 3;
        let source = MockSource::with("apple", foods(3));
        let err = run_with(settings(&["apple"]), &source, &state).unwrap_err();
        assert!(matches!(err, ImportError::Connect { attempts: 3, .. }));
        assert!(source.calls.borrow().is_empty());
    }

    #[test]
    fn test_missing_credential_checked_first() {
        let state = Shared::default();
        let source = MockSource::with("apple", foods(3));
        let mut settings = settings(&["apple"]);
        settings.source.api_key = None;

        let err = run_with(settings, &source, &state).unwrap_err();
        assert!(matches!(err, ImportError::MissingCredential));
        assert_eq!(state.borrow().connects, 0);
        assert!(source.calls.borrow().is_empty());
    }

    #[test]
    fn test_source_error_moves_to_next_category() {
        let state = Shared::default();
        let mut source = MockSource::with("apple", foods(3));
        source.unavailable.insert("broken".to_string());

        let summary = run_with(settings(&["broken", "apple"]), &source, &state).unwrap();

        assert!(summary.aborted.is_none());
        assert_eq!(summary.categories.len(), 2);
        assert_eq!(summary.categories[0].name, "broken");
        assert_eq!(summary.categories[0].category_id, Some(1));
        assert_eq!(summary.categories[0].found, 0);
        assert_eq!(summary.categories[1].imported, 3);
        assert_eq!(state.borrow().categories, vec!["broken", "apple"]);
    }

    #[test]
    fn test_max_per_category_caps_items() {
        let state = Shared::default();
        let source = MockSource::with("apple", foods(10));
        let mut settings = settings(&["apple"]);
        settings.import.max_per_category = 4;

        let summary = run_with(settings, &source, &state).unwrap();
        assert_eq!(summary.categories[0].found, 10);
        assert_eq!(summary.total_imported, 4);
    }

    #[test]
    fn test_write_failure_skips_item() {
        let state = Shared::default();
        let source = MockSource::with(
            "apple",
            vec![
                food(1, "Apple", Some(52.0)),
                food(2, "bad apple", Some(52.0)),
                food(3, "Apple juice", None),
            ],
        );
        let summary = run_with(settings(&["apple"]), &source, &state).unwrap();

        let report = &summary.categories[0];
        assert_eq!(report.imported, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.nutrition_missing, 1);
        assert_eq!(state.borrow().committed, 2);
    }

    #[test]
    fn test_duplicate_policy() {
        let source = MockSource::with("apple", foods(3));

        let state = Shared::default();
        state.borrow_mut().existing.insert(2);
        let summary = run_with(settings(&["apple"]), &source, &state).unwrap();
        assert_eq!(summary.total_imported, 3);
        assert_eq!(summary.categories[0].skipped_duplicates, 0);

        let state = Shared::default();
        state.borrow_mut().existing.insert(2);
        let mut settings = settings(&["apple"]);
        settings.import.duplicates = DuplicatePolicy::SkipExisting;
        let summary = run_with(settings, &source, &state).unwrap();
        assert_eq!(summary.total_imported, 2);
        assert_eq!(summary.categories[0].skipped_duplicates, 1);
    }

    #[test]
    fn test_end_to_end_with_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("larder.db");
        let source = MockSource::with(
            "Fruits",
            vec![
                food(171_688, "Apples, raw, with skin", Some(52.0)),
                food(173_944, "Bananas, raw", Some(89.0)),
                food(2_094_019, "Fruit snacks", None),
            ],
        );

        let mut settings = settings(&["Fruits"]);
        settings.import.duplicates = DuplicatePolicy::SkipExisting;

        let first = Importer::new(settings.clone(), &source, SqliteConnector::new(&path))
            .run()
            .unwrap();
        assert_eq!(first.total_imported, 3);
        assert_eq!(first.commits, 1);

        let second = Importer::new(settings, &source, SqliteConnector::new(&path))
            .run()
            .unwrap();
        assert_eq!(second.total_imported, 0);
        assert_eq!(second.categories[0].skipped_duplicates, 3);
        assert_eq!(second.categories[0].category_id, first.categories[0].category_id);

        let db = Database::open(&path).unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.food_count, 3);
        assert_eq!(stats.nutrition_count, 2);
        assert_eq!(stats.categories.len(), 1);
        let stored = db.get_food(stats.samples[0].food_id).unwrap();
        assert_eq!(stored.import_run.as_deref(), Some(first.run_id.as_str()));
    }

    type Reader = Rc<RefCell<Option<Connection>>>;

    /// Returns foods, and leaves a second connection holding a read
    /// transaction on the database so the next batch commit gets `SQLITE_BUSY`.
    struct ReadLockingSource {
        path: std::path::PathBuf,
        reader: Reader,
    }

    impl FoodSource for ReadLockingSource {
        fn search(&self, _term: &str, _page: u32) -> Result<Vec<SearchFood>, ImportError> {
            let conn = Connection::open(&self.path).unwrap();
            conn.execute_batch("BEGIN").unwrap();
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM foods", [], |r| r.get(0))
                .unwrap();
            assert_eq!(count, 0);
            *self.reader.borrow_mut() = Some(conn);
            Ok(foods(5))
        }
    }

    /// Ends the read transaction once the importer asks for a new connection.
    struct ReleasingConnector {
        inner: SqliteConnector,
        reader: Reader,
    }

    impl StoreConnector for ReleasingConnector {
        type Store = Database;

        fn connect(&self) -> anyhow::Result<Database> {
            drop(self.reader.borrow_mut().take());
            self.inner.connect()
        }
    }

    #[test]
    fn test_sqlite_busy_commit_reconnects_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("larder.db");
        let reader = Reader::default();
        let source = ReadLockingSource {
            path: path.clone(),
            reader: Rc::clone(&reader),
        };
        let connector = ReleasingConnector {
            inner: SqliteConnector::new(&path).with_busy_timeout(Some(Duration::from_millis(50))),
            reader: Rc::clone(&reader),
        };
        let mut settings = settings(&["apple"]);
        settings.import.batch_size = 2;

        let summary = Importer::new(settings, source, connector).run().unwrap();

        assert!(summary.aborted.is_none(), "{:?}", summary.aborted);
        assert_eq!(summary.reconnects, 1);
        assert_eq!(summary.lost_writes, 2);
        assert_eq!(summary.commits, 2);
        assert_eq!(summary.total_imported, 3);
        let db = Database::open(&path).unwrap();
        assert_eq!(db.stats().unwrap().food_count, 3);
    }
}
