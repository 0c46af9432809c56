//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tabula_core::{
    Column, ForeignKeyInfo, LookupSource, Record, Result, ResultSet, TabulaError, Value,
};
use tabula_view::{LookupColumn, ViewProjector, ViewSettings};
use tokio::sync::Semaphore;

/// In-memory lookup source over a small record graph.
///
/// Tables are lists of records; a foreign record is found by matching the
/// referenced column. Fetches can be held behind a gate to test in-flight
/// de-duplication, and individual values can be made to fail.
pub struct MockLookupSource {
    pub tables: HashMap<String, Vec<Record>>,
    pub table_fks: HashMap<String, Vec<ForeignKeyInfo>>,
    /// `(table, rendered value)` pairs whose fetch fails
    pub failing: Vec<(String, String)>,
    pub should_fail_schema: bool,
    gate: Option<Arc<Semaphore>>,
    pub fetch_count: Arc<parking_lot::Mutex<usize>>,
    /// `(table, value)` of every record fetch, in call order
    pub fetch_log: Arc<parking_lot::Mutex<Vec<(String, String)>>>,
}

impl MockLookupSource {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            table_fks: HashMap::new(),
            failing: Vec::new(),
            should_fail_schema: false,
            gate: None,
            fetch_count: Arc::new(parking_lot::Mutex::new(0)),
            fetch_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    pub fn with_table(mut self, table: &str, records: Vec<Record>) -> Self {
        self.tables.insert(table.to_string(), records);
        self
    }

    pub fn with_table_fk(mut self, table: &str, fk: ForeignKeyInfo) -> Self {
        self.table_fks.entry(table.to_string()).or_default().push(fk);
        self
    }

    /// Make fetches of `value` from `table` fail
    pub fn with_failing_value(mut self, table: &str, value: impl Into<Value>) -> Self {
        self.failing
            .push((table.to_string(), value.into().to_plain_string()));
        self
    }

    pub fn with_schema_failure(mut self) -> Self {
        self.should_fail_schema = true;
        self
    }

    /// Hold record fetches until [`release`](Self::release) is called
    pub fn with_gate(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let held fetches through
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetch_count.lock()
    }

    pub fn fetch_log(&self) -> Vec<(String, String)> {
        self.fetch_log.lock().clone()
    }
}

#[async_trait]
impl LookupSource for MockLookupSource {
    async fn fetch_foreign_record(
        &self,
        fk_column: &str,
        value: &Value,
        fk: &ForeignKeyInfo,
    ) -> Result<Option<Record>> {
        let table = fk.referenced_table.clone();
        let rendered = value.to_plain_string();
        *self.fetch_count.lock() += 1;
        self.fetch_log.lock().push((table.clone(), rendered.clone()));

        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| TabulaError::Cancelled)?;
        }

        if self
            .failing
            .iter()
            .any(|(t, v)| t == &table && v == &rendered)
        {
            return Err(TabulaError::Lookup(format!(
                "connection reset while reading {table}"
            )));
        }

        let referenced = fk.referenced_column_for(fk_column).ok_or_else(|| {
            TabulaError::Schema(format!("{fk_column} is not part of the foreign key"))
        })?;
        let record = self.tables.get(&table).and_then(|records| {
            records
                .iter()
                .find(|record| {
                    record
                        .get(referenced)
                        .is_some_and(|v| v.to_plain_string() == rendered)
                })
                .cloned()
        });
        Ok(record)
    }

    async fn fetch_referenced_columns(
        &self,
        _fk_column: &str,
        fk: &ForeignKeyInfo,
    ) -> Result<Vec<String>> {
        if self.should_fail_schema {
            return Err(TabulaError::Schema("introspection failed".into()));
        }
        let mut columns: Vec<String> = self
            .tables
            .get(&fk.referenced_table)
            .and_then(|records| records.first())
            .map(|record| record.keys().cloned().collect())
            .unwrap_or_default();
        columns.sort();
        Ok(columns)
    }

    async fn fetch_referenced_table_fks(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        if self.should_fail_schema {
            return Err(TabulaError::Schema("introspection failed".into()));
        }
        Ok(self.table_fks.get(table).cloned().unwrap_or_default())
    }
}

pub fn record(fields: &[(&str, Value)]) -> Record {
    fields
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub fn orders_customer_fk() -> ForeignKeyInfo {
    ForeignKeyInfo::single("customer_id", "customers", "id").with_name("orders_customer_fk")
}

pub fn customers_country_fk() -> ForeignKeyInfo {
    ForeignKeyInfo::single("country_id", "countries", "id").with_name("customers_country_fk")
}

/// orders -> customers -> countries
///
/// Customers 1-4 live in countries 10, 20, 10 and none; customer 5 does
/// not exist.
pub fn shop_source() -> MockLookupSource {
    MockLookupSource::new()
        .with_table(
            "customers",
            vec![
                record(&[
                    ("id", Value::Int64(1)),
                    ("email", "ada@example.com".into()),
                    ("country_id", Value::Int64(10)),
                ]),
                record(&[
                    ("id", Value::Int64(2)),
                    ("email", "grace@example.com".into()),
                    ("country_id", Value::Int64(20)),
                ]),
                record(&[
                    ("id", Value::Int64(3)),
                    ("email", "linus@example.com".into()),
                    ("country_id", Value::Int64(10)),
                ]),
                record(&[
                    ("id", Value::Int64(4)),
                    ("email", "ken@example.com".into()),
                    ("country_id", Value::Null),
                ]),
            ],
        )
        .with_table(
            "countries",
            vec![
                record(&[
                    ("id", Value::Int64(10)),
                    ("name", "Finland".into()),
                    ("code", "FI".into()),
                ]),
                record(&[
                    ("id", Value::Int64(20)),
                    ("name", "Japan".into()),
                    ("code", "JP".into()),
                ]),
            ],
        )
        .with_table_fk("customers", customers_country_fk())
}

/// Twelve orders cycling over customers 1, 2, 3, 4, 5 and NULL
pub fn orders() -> ResultSet {
    let customers = [
        Value::Int64(1),
        Value::Int64(2),
        Value::Int64(3),
        Value::Int64(4),
        Value::Int64(5),
        Value::Null,
    ];
    ResultSet::from_values(
        vec![
            Column::new("id").with_type("integer"),
            Column::new("customer_id").with_type("integer"),
            Column::new("total").with_type("numeric"),
        ],
        (0..12i64)
            .map(|i| {
                vec![
                    Value::Int64(i + 1),
                    customers[i as usize % customers.len()].clone(),
                    Value::Float64((i + 1) as f64 * 12.5),
                ]
            })
            .collect(),
    )
}

pub fn country_name_lookup() -> LookupColumn {
    LookupColumn::chained(
        orders_customer_fk(),
        "country_id",
        LookupColumn::leaf(customers_country_fk(), "name"),
        &[customers_country_fk()],
    )
    .expect("country_id is a foreign key of customers")
}

/// An orders view with lookups enabled through `source`
pub fn orders_view(source: Arc<MockLookupSource>) -> ViewProjector {
    let mut view =
        ViewProjector::new(ViewSettings::default()).with_lookup_source(source as Arc<dyn LookupSource>);
    view.set_result(orders());
    view.set_foreign_keys(vec![orders_customer_fk()]);
    view
}
