//! Tests for lookup chains, the lookup cache and the request gates

use super::*;

use crate::error::ViewError;
use futures::FutureExt;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tabula_core::{ForeignKeyInfo, Record, Value};

fn orders_customer_fk() -> ForeignKeyInfo {
    ForeignKeyInfo::single("customer_id", "customers", "id")
}

fn customers_country_fk() -> ForeignKeyInfo {
    ForeignKeyInfo::single("country_id", "countries", "id")
}

fn country_name_chain() -> LookupColumn {
    LookupColumn::chained(
        orders_customer_fk(),
        "country_id",
        LookupColumn::leaf(customers_country_fk(), "name"),
        &[customers_country_fk()],
    )
    .unwrap()
}

// ============ Chain Tests ============

mod chain_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_leaf_chain() {
        let lookup = LookupColumn::leaf(orders_customer_fk(), "email");
        assert_eq!(lookup.depth(), 1);
        assert!(lookup.nested().is_none());
        assert_eq!(lookup.column_key("customer_id"), "customer_id.email");
        assert_eq!(lookup.label(), "customers.email");
    }

    #[test]
    fn test_two_level_chain() {
        let lookup = country_name_chain();
        assert_eq!(lookup.depth(), 2);
        assert_eq!(lookup.deepest().lookup_column(), "name");
        assert_eq!(lookup.column_key("customer_id"), "customer_id.country_id.name");
        assert_eq!(lookup.label(), "countries.name");
    }

    #[test]
    fn test_nested_through_non_fk_column_is_rejected() {
        let err = LookupColumn::chained(
            orders_customer_fk(),
            "email",
            LookupColumn::leaf(customers_country_fk(), "name"),
            &[customers_country_fk()],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ViewError::NotForeignKey {
                table: "customers".into(),
                column: "email".into()
            }
        );
    }

    #[test]
    fn test_nested_fk_not_declared_on_parent_table_is_rejected() {
        // country_id exists, but customers declares no such foreign key
        let result = LookupColumn::chained(
            orders_customer_fk(),
            "country_id",
            LookupColumn::leaf(customers_country_fk(), "name"),
            &[],
        );
        assert!(matches!(result, Err(ViewError::NotForeignKey { .. })));
    }

    #[test]
    fn test_truncation() {
        let lookup = country_name_chain();
        let one = lookup.truncated(1).unwrap();
        assert_eq!(one, LookupColumn::leaf(orders_customer_fk(), "country_id"));
        assert_eq!(lookup.truncated(2).unwrap(), lookup);
        assert_eq!(lookup.truncated(5).unwrap(), lookup);
        assert!(lookup.truncated(0).is_none());
    }

    #[test]
    fn test_depth_guard() {
        let lookup = country_name_chain();
        assert!(lookup.check_depth(2).is_ok());
        assert_eq!(lookup.check_depth(1), Err(ViewError::DepthExceeded { max: 1 }));
    }

    #[test]
    fn test_serde_round_trip_keeps_nesting() {
        let lookup = country_name_chain();
        let json = serde_json::to_string(&lookup).unwrap();
        let parsed: LookupColumn = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, lookup);
    }

    #[test]
    fn test_deserialize_rejects_nested_key_on_other_column() {
        let mut json = serde_json::to_value(country_name_chain()).unwrap();
        json["lookup_column"] = serde_json::json!("email");

        let err = serde_json::from_value::<LookupColumn>(json).unwrap_err();
        assert!(err.to_string().contains("'email' is not a foreign key"));
    }
}

// ============ LookupConfig Tests ============

mod config_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_and_dedup() {
        let mut config = LookupConfig::new();
        let lookup = LookupColumn::leaf(orders_customer_fk(), "email");
        assert_eq!(config.add("customer_id", lookup.clone()), Ok(true));
        assert_eq!(config.add("customer_id", lookup.clone()), Ok(false));
        assert_eq!(config.add("customer_id", country_name_chain()), Ok(true));
        assert_eq!(config.len(), 2);
        assert_eq!(config.entries_for("customer_id").len(), 2);
        assert!(config.entries_for("other").is_empty());
    }

    #[test]
    fn test_add_rejects_unrelated_fk() {
        let mut config = LookupConfig::new();
        let lookup = LookupColumn::leaf(orders_customer_fk(), "email");
        assert!(matches!(
            config.add("product_id", lookup),
            Err(ViewError::ForeignKeyMismatch { .. })
        ));
        assert!(config.is_empty());
    }

    #[test]
    fn test_config_retain() {
        let mut config = LookupConfig::new();
        config
            .add("customer_id", LookupColumn::leaf(orders_customer_fk(), "email"))
            .unwrap();
        config.add("customer_id", country_name_chain()).unwrap();

        assert_eq!(config.retain(|_, lookup| lookup.depth() == 1), 1);
        assert_eq!(config.len(), 1);
        assert_eq!(config.retain(|_, _| false), 1);
        assert!(config.is_empty());
    }

    #[test]
    fn test_remove_prunes_empty_columns() {
        let mut config = LookupConfig::new();
        let lookup = LookupColumn::leaf(orders_customer_fk(), "email");
        config.add("customer_id", lookup.clone()).unwrap();
        assert!(config.remove("customer_id", &lookup));
        assert!(!config.remove("customer_id", &lookup));
        assert!(config.is_empty());
    }

    #[test]
    fn test_iter_order() {
        let mut config = LookupConfig::new();
        config
            .add("customer_id", LookupColumn::leaf(orders_customer_fk(), "email"))
            .unwrap();
        config.add("customer_id", country_name_chain()).unwrap();
        let keys: Vec<String> = config
            .iter()
            .map(|(column, lookup)| lookup.column_key(column))
            .collect();
        assert_eq!(
            keys,
            vec!["customer_id.email", "customer_id.country_id.name"]
        );
    }

    #[test]
    fn test_retain_depth() {
        let mut config = LookupConfig::new();
        config
            .add("customer_id", LookupColumn::leaf(orders_customer_fk(), "email"))
            .unwrap();
        config.add("customer_id", country_name_chain()).unwrap();
        assert_eq!(config.retain_depth(1), 1);
        assert_eq!(config.len(), 1);
    }
}

// ============ LookupCache Tests ============

mod cache_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(name: &str) -> LookupOutcome {
        let mut record = Record::new();
        record.insert("name".into(), Value::from(name));
        LookupOutcome::Found(Arc::new(record))
    }

    #[tokio::test]
    async fn test_hit_after_fetch() {
        let cache = LookupCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = LookupKey::new("customer_id", &Value::Int32(1));

        for _ in 0..3 {
            let calls = calls.clone();
            let outcome = cache
                .get_or_fetch(key.clone(), move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { record("Ada") }.boxed()
                })
                .await;
            assert_eq!(outcome, record("Ada"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(&key), Some(record("Ada")));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let cache = LookupCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let (release, released) = futures::channel::oneshot::channel::<()>();
        let released = released.shared();
        let key = LookupKey::new("customer_id", &Value::Int32(1));

        let fetch = |calls: Arc<AtomicUsize>| {
            let released = released.clone();
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    let _ = released.await;
                    record("Ada")
                }
                .boxed()
            }
        };

        let first = cache.get_or_fetch(key.clone(), fetch(calls.clone()));
        let second = cache.get_or_fetch(key.clone(), fetch(calls.clone()));
        let releaser = async {
            tokio::task::yield_now().await;
            assert!(cache.is_loading(&key));
            let _ = release.send(());
        };
        let (a, b, ()) = tokio::join!(first, second, releaser);

        assert_eq!(a, record("Ada"));
        assert_eq!(b, record("Ada"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!cache.is_loading(&key));
    }

    #[tokio::test]
    async fn test_invalidate_drops_in_flight_result() {
        let cache = LookupCache::new();
        let (release, released) = futures::channel::oneshot::channel::<()>();
        let key = LookupKey::new("customer_id", &Value::Int32(1));

        let pending = cache.get_or_fetch(key.clone(), move || {
            async move {
                let _ = released.await;
                record("Ada")
            }
            .boxed()
        });
        let invalidator = async {
            tokio::task::yield_now().await;
            cache.invalidate();
            let _ = release.send(());
        };
        let (outcome, ()) = tokio::join!(pending, invalidator);

        // the caller still gets its answer, the cache does not keep it
        assert_eq!(outcome, record("Ada"));
        assert_eq!(cache.get(&key), None);
        assert_eq!(cache.generation(), 1);
    }

    #[tokio::test]
    async fn test_clear_failed() {
        let cache = LookupCache::new();
        let failed = LookupKey::new("customer_id", &Value::Int32(1));
        let missing = LookupKey::new("customer_id", &Value::Int32(2));
        cache
            .get_or_fetch(failed.clone(), || {
                async { LookupOutcome::Failed("timeout".into()) }.boxed()
            })
            .await;
        cache
            .get_or_fetch(missing.clone(), || async { LookupOutcome::NotFound }.boxed())
            .await;

        assert_eq!(cache.clear_failed(), 1);
        assert_eq!(cache.get(&failed), None);
        assert_eq!(cache.get(&missing), Some(LookupOutcome::NotFound));
    }

    #[test]
    fn test_keys_distinguish_null_from_empty_string() {
        assert_ne!(
            LookupKey::new("c", &Value::Null),
            LookupKey::new("c", &Value::from(""))
        );
        assert_eq!(
            LookupKey::new("c", &Value::Int32(7)),
            LookupKey::new("c", &Value::Int64(7))
        );
    }
}

// ============ Gate and Preview Tests ============

mod preview_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_gate_only_latest_token_is_current() {
        let mut gate = RequestGate::new();
        let first = gate.issue();
        let second = gate.issue();
        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));
        gate.invalidate();
        assert!(!gate.is_current(second));
    }

    #[test]
    fn test_stale_preview_result_is_ignored() {
        let mut preview = LookupPreview::new();
        let first = preview.open("customer_id", Value::Int32(1));
        let second = preview.open("customer_id", Value::Int32(2));

        assert!(!preview.apply(first, LookupOutcome::NotFound));
        assert_eq!(
            preview.state(),
            &PreviewState::Loading {
                fk_column: "customer_id".into(),
                value: Value::Int32(2)
            }
        );

        assert!(preview.apply(second, LookupOutcome::NotFound));
        assert!(matches!(preview.state(), PreviewState::Ready { .. }));
    }

    #[test]
    fn test_result_after_close_is_ignored() {
        let mut preview = LookupPreview::new();
        let token = preview.open("customer_id", Value::Int32(1));
        preview.close();
        assert!(!preview.apply(token, LookupOutcome::NotFound));
        assert_eq!(preview.state(), &PreviewState::Closed);
        assert!(!preview.is_open());
    }
}

// ============ Chain Editor Tests ============

mod editor_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn customers_level() -> Expansion {
        Expansion {
            columns: vec!["id".into(), "email".into(), "country_id".into()],
            table_fks: vec![customers_country_fk()],
        }
    }

    fn countries_level() -> Expansion {
        Expansion {
            columns: vec!["id".into(), "name".into()],
            table_fks: vec![],
        }
    }

    #[test]
    fn test_build_two_level_chain() {
        let mut editor = LookupChainEditor::new("customer_id", orders_customer_fk(), 5);
        let root = editor.start();
        assert!(editor.apply_expansion(&root, customers_level()));

        let next = editor.select(0, "country_id").unwrap().unwrap();
        assert_eq!(next.level, 1);
        assert_eq!(next.fk, customers_country_fk());
        assert!(editor.apply_expansion(&next, countries_level()));
        assert_eq!(editor.select(1, "name").unwrap(), None);

        assert_eq!(editor.build().unwrap(), country_name_chain());
    }

    #[test]
    fn test_unselected_trailing_level_is_ignored() {
        let mut editor = LookupChainEditor::new("customer_id", orders_customer_fk(), 5);
        let root = editor.start();
        editor.apply_expansion(&root, customers_level());
        let next = editor.select(0, "country_id").unwrap().unwrap();
        editor.apply_expansion(&next, countries_level());

        assert_eq!(
            editor.build().unwrap(),
            LookupColumn::leaf(orders_customer_fk(), "country_id")
        );
    }

    #[test]
    fn test_reselecting_discards_deeper_levels_and_pending_expansions() {
        let mut editor = LookupChainEditor::new("customer_id", orders_customer_fk(), 5);
        let root = editor.start();
        editor.apply_expansion(&root, customers_level());

        let pending = editor.select(0, "country_id").unwrap().unwrap();
        assert_eq!(editor.select(0, "email").unwrap(), None);
        assert!(!editor.apply_expansion(&pending, countries_level()));
        assert_eq!(editor.levels().len(), 1);
        assert_eq!(
            editor.build().unwrap(),
            LookupColumn::leaf(orders_customer_fk(), "email")
        );
    }

    #[test]
    fn test_cancel_drops_pending_expansion() {
        let mut editor = LookupChainEditor::new("customer_id", orders_customer_fk(), 5);
        let root = editor.start();
        editor.cancel();
        assert!(!editor.apply_expansion(&root, customers_level()));
        assert_eq!(editor.build(), Err(ViewError::EmptyChain));
    }

    #[test]
    fn test_select_validates_level_and_column() {
        let mut editor = LookupChainEditor::new("customer_id", orders_customer_fk(), 5);
        assert!(matches!(
            editor.select(0, "email"),
            Err(ViewError::IncompleteChain(_))
        ));
        let root = editor.start();
        editor.apply_expansion(&root, customers_level());
        assert_eq!(
            editor.select(0, "nope"),
            Err(ViewError::UnknownColumn("nope".into()))
        );
    }

    #[test]
    fn test_depth_limit_stops_expansion() {
        let mut editor = LookupChainEditor::new("customer_id", orders_customer_fk(), 1);
        let root = editor.start();
        editor.apply_expansion(&root, customers_level());
        assert_eq!(editor.select(0, "country_id").unwrap(), None);
        assert_eq!(editor.levels()[0].table(), "customers");
        assert!(editor.levels()[0].is_fk_column("country_id"));
    }
}
