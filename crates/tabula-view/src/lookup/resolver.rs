use futures::FutureExt;
use std::sync::Arc;
use tabula_core::{ForeignKeyInfo, LookupSource, Value};

use super::cache::{LookupCache, LookupKey, LookupOutcome};
use super::chain::LookupColumn;
use super::editor::{Expansion, ExpansionRequest};

/// Display state of one derived lookup cell
#[derive(Debug, Clone, PartialEq)]
pub enum LookupValue {
    /// Some level of the chain has not been fetched yet
    Pending,
    /// The FK value (or an intermediate value) is NULL
    Null,
    Value(Value),
    NotFound,
    Failed(String),
}

impl LookupValue {
    /// Value carried into exports and formatters; every non-value state is NULL
    pub fn into_value(self) -> Value {
        match self {
            Self::Value(value) => value,
            _ => Value::Null,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    fn from_outcome(outcome: &LookupOutcome) -> Option<Self> {
        match outcome {
            LookupOutcome::Found(_) => None,
            LookupOutcome::NotFound => Some(Self::NotFound),
            LookupOutcome::Failed(message) => Some(Self::Failed(message.clone())),
        }
    }
}

/// Resolves foreign-key values through a [`LookupSource`], caching records
/// for the lifetime of a view session.
pub struct LookupResolver {
    source: Arc<dyn LookupSource>,
    cache: LookupCache,
    max_depth: usize,
}

impl std::fmt::Debug for LookupResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupResolver")
            .field("cache", &self.cache)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl LookupResolver {
    pub fn new(source: Arc<dyn LookupSource>, max_depth: usize) -> Self {
        Self {
            source,
            cache: LookupCache::new(),
            max_depth: max_depth.max(1),
        }
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Drop all cached records, e.g. when the row set changes
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// Fetch the record referenced by `value` in `fk_column`.
    ///
    /// Failures are returned as [`LookupOutcome::Failed`] and logged; they
    /// never surface as errors.
    pub async fn fetch_record(
        &self,
        fk_column: &str,
        value: &Value,
        fk: &ForeignKeyInfo,
    ) -> LookupOutcome {
        self.fetch_keyed(LookupKey::new(fk_column, value), fk_column, value, fk)
            .await
    }

    async fn fetch_keyed(
        &self,
        key: LookupKey,
        fk_column: &str,
        value: &Value,
        fk: &ForeignKeyInfo,
    ) -> LookupOutcome {
        if value.is_null() {
            return LookupOutcome::NotFound;
        }
        let source = self.source.clone();
        let fk_column = fk_column.to_string();
        let value = value.clone();
        let fk = fk.clone();
        self.cache
            .get_or_fetch(key, move || {
                async move {
                    match source.fetch_foreign_record(&fk_column, &value, &fk).await {
                        Ok(Some(record)) => LookupOutcome::Found(Arc::new(record)),
                        Ok(None) => LookupOutcome::NotFound,
                        Err(e) => {
                            tracing::warn!(
                                column = %fk_column,
                                value = %value,
                                table = %fk.referenced_table,
                                error = %e,
                                "foreign record lookup failed"
                            );
                            LookupOutcome::Failed(e.to_string())
                        }
                    }
                }
                .boxed()
            })
            .await
    }

    /// Walk a lookup chain starting at `value` of `fk_column`.
    ///
    /// Each level waits for the previous one, since its FK value is read
    /// from the previous level's record.
    pub async fn resolve_chain(
        &self,
        fk_column: &str,
        value: &Value,
        lookup: &LookupColumn,
    ) -> LookupValue {
        let mut current = value.clone();
        for (key_column, fetch_column, level) in self.chain_steps(fk_column, lookup) {
            if current.is_null() {
                return LookupValue::Null;
            }
            let key = LookupKey::new(key_column, &current);
            let outcome = self
                .fetch_keyed(key, &fetch_column, &current, level.owning_fk())
                .await;
            if let Some(state) = LookupValue::from_outcome(&outcome) {
                return state;
            }
            current = outcome
                .record()
                .and_then(|record| record.get(level.lookup_column()))
                .cloned()
                .unwrap_or(Value::Null);
        }
        LookupValue::Value(current)
    }

    /// Cache-only variant of [`resolve_chain`](Self::resolve_chain) used while
    /// rendering; never fetches.
    pub fn peek_chain(&self, fk_column: &str, value: &Value, lookup: &LookupColumn) -> LookupValue {
        let mut current = value.clone();
        for (key_column, _, level) in self.chain_steps(fk_column, lookup) {
            if current.is_null() {
                return LookupValue::Null;
            }
            let Some(outcome) = self.cache.get(&LookupKey::new(key_column, &current)) else {
                return LookupValue::Pending;
            };
            if let Some(state) = LookupValue::from_outcome(&outcome) {
                return state;
            }
            current = outcome
                .record()
                .and_then(|record| record.get(level.lookup_column()))
                .cloned()
                .unwrap_or(Value::Null);
        }
        LookupValue::Value(current)
    }

    /// `(cache key column, column passed to the source, level)` per hop.
    ///
    /// The first hop is keyed by the view's own FK column; deeper hops by the
    /// table-qualified column the previous level read, so equal column names
    /// in different tables do not share entries.
    fn chain_steps<'a>(
        &self,
        fk_column: &str,
        lookup: &'a LookupColumn,
    ) -> Vec<(String, String, &'a LookupColumn)> {
        let mut steps = Vec::new();
        let mut previous: Option<&LookupColumn> = None;
        for level in lookup.levels().take(self.max_depth) {
            let (key_column, fetch_column) = match previous {
                None => (fk_column.to_string(), fk_column.to_string()),
                Some(parent) => (
                    format!(
                        "{}.{}",
                        parent.owning_fk().referenced_table,
                        parent.lookup_column()
                    ),
                    parent.lookup_column().to_string(),
                ),
            };
            steps.push((key_column, fetch_column, level));
            previous = Some(level);
        }
        if lookup.depth() > self.max_depth {
            tracing::warn!(
                column = fk_column,
                depth = lookup.depth(),
                max_depth = self.max_depth,
                "lookup chain truncated at the depth limit"
            );
        }
        steps
    }

    /// Fetch what the chain editor needs to offer the next level
    pub async fn expand(&self, request: &ExpansionRequest) -> tabula_core::Result<Expansion> {
        let (columns, table_fks) = futures::try_join!(
            self.source
                .fetch_referenced_columns(&request.fk_column, &request.fk),
            self.source
                .fetch_referenced_table_fks(&request.fk.referenced_table),
        )?;
        tracing::debug!(
            column = %request.fk_column,
            table = %request.fk.referenced_table,
            columns = columns.len(),
            foreign_keys = table_fks.len(),
            "fetched lookup level"
        );
        Ok(Expansion { columns, table_fks })
    }
}
