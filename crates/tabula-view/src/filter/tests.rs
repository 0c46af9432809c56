use super::*;
use pretty_assertions::assert_eq;
use tabula_core::{Column, ResultSet};

fn rows(values: Vec<Vec<Value>>) -> ResultSet {
    ResultSet::from_values(vec![Column::new("a"), Column::new("b")], values)
}

fn ids(rows: &[&Row]) -> Vec<u64> {
    rows.iter().map(|r| r.id().0).collect()
}

mod spec_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_spec() {
        assert!(FilterSpec::default().is_empty());
        assert!(!FilterSpec::not_null().is_empty());
        assert!(!FilterSpec::range(Some(1.0), None).is_empty());
    }

    #[test]
    fn test_null_handling() {
        assert!(FilterSpec::default().matches(&Value::Null));
        assert!(!FilterSpec::not_null().matches(&Value::Null));
        assert!(FilterSpec::only_null().matches(&Value::Null));
        assert!(!FilterSpec::only_null().matches(&Value::Int32(1)));
        // null skips bound checks entirely
        let spec = FilterSpec::range(Some(5.0), None);
        assert!(spec.matches(&Value::Null));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let spec = FilterSpec::range(Some(1.0), Some(3.0));
        assert!(spec.matches(&Value::Int32(1)));
        assert!(spec.matches(&Value::Float64(3.0)));
        assert!(!spec.matches(&Value::Int32(4)));
        assert!(!spec.matches(&Value::Float64(0.5)));
    }

    #[test]
    fn test_non_numeric_value_fails_bound() {
        let spec = FilterSpec::range(Some(0.0), None);
        assert!(!spec.matches(&Value::from("abc")));
        assert!(spec.matches(&Value::from("12")));
    }

    #[test]
    fn test_equals_number_against_string_cell() {
        // numeric equals coerces the cell
        let spec = FilterSpec::equals(42i64);
        assert!(spec.matches(&Value::from("42")));
        assert!(spec.matches(&Value::Float64(42.0)));
        assert!(!spec.matches(&Value::from("forty-two")));
    }

    #[test]
    fn test_equals_string_compares_plain_strings() {
        let spec = FilterSpec::equals("42");
        assert!(spec.matches(&Value::Int64(42)));
        assert!(!spec.matches(&Value::Float64(42.5)));
    }

    #[test]
    fn test_equals_bool_is_identity() {
        let spec = FilterSpec::equals(true);
        assert!(spec.matches(&Value::Bool(true)));
        assert!(!spec.matches(&Value::from("true")));
        assert!(!spec.matches(&Value::Int32(1)));
    }

    #[test]
    fn test_filter_kind_for_column() {
        assert_eq!(
            FilterKind::for_column(&Column::new("n").with_type("integer")),
            FilterKind::Range
        );
        assert_eq!(
            FilterKind::for_column(&Column::new("s").with_type("text")),
            FilterKind::Equality
        );
        assert_eq!(
            FilterKind::for_column(&Column::new("j").with_type("jsonb")),
            FilterKind::NullOnly
        );
    }
}

mod set_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_spec_is_pruned() {
        let mut set = FilterSet::new();
        assert!(set.set("a", FilterSpec::not_null()));
        assert_eq!(set.len(), 1);
        assert!(set.set("a", FilterSpec::default()));
        assert!(set.is_empty());
        assert!(!set.set("b", FilterSpec::default()));
    }

    #[test]
    fn test_deserialize_prunes_empty_specs() {
        let set: FilterSet = serde_json::from_str(
            r#"{"total": {}, "status": {"allow_null": true}, "id": {"min": 3}}"#,
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("id"), Some(&FilterSpec::range(Some(3.0), None)));
        assert_eq!(
            serde_json::to_string(&set).unwrap(),
            r#"{"id":{"min":3.0,"max":null,"equals":null,"allow_null":true,"allow_non_null":true}}"#
        );
    }

    #[test]
    fn test_setting_same_spec_is_not_a_change() {
        let mut set = FilterSet::new();
        assert!(set.set("a", FilterSpec::equals("x")));
        assert!(!set.set("a", FilterSpec::equals("x")));
    }

    #[test]
    fn test_apply_without_filters_is_identity() {
        let set = rows(vec![
            vec![Value::Int32(1), Value::Null],
            vec![Value::Null, Value::from("x")],
        ]);
        let out = apply(&set.rows, &FilterSet::new());
        assert_eq!(ids(&out), vec![0, 1]);
    }

    #[test]
    fn test_apply_ands_columns() {
        let set = rows(vec![
            vec![Value::Int32(1), Value::from("x")],
            vec![Value::Int32(5), Value::from("x")],
            vec![Value::Int32(5), Value::from("y")],
            vec![Value::Null, Value::from("x")],
        ]);
        let filters: FilterSet = [
            ("a".to_string(), FilterSpec::range(Some(2.0), None)),
            ("b".to_string(), FilterSpec::equals("x")),
        ]
        .into_iter()
        .collect();

        let out = apply(&set.rows, &filters);
        // null passes the range filter because allow_null is still set
        assert_eq!(ids(&out), vec![1, 3]);
    }

    #[test]
    fn test_missing_column_counts_as_null() {
        let set = rows(vec![vec![Value::Int32(1), Value::Int32(2)]]);
        let mut filters = FilterSet::new();
        filters.set("nope", FilterSpec::not_null());
        assert!(apply(&set.rows, &filters).is_empty());
    }
}

mod expression_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_serialize() {
        let mut filters = FilterSet::new();
        filters.set(
            "age",
            FilterSpec {
                min: Some(18.0),
                max: Some(65.5),
                allow_null: false,
                ..Default::default()
            },
        );
        filters.set("name", FilterSpec::equals("bob"));
        filters.set("deleted_at", FilterSpec::only_null());

        assert_eq!(
            FilterExpression::serialize(&filters),
            "age:min(18),max(65.5),noNull name:equals(bob) deleted_at:noNonNull"
        );
    }

    #[test]
    fn test_serialize_empty() {
        assert_eq!(FilterExpression::serialize(&FilterSet::new()), "");
    }

    #[test]
    fn test_parse_reads_back_serialized_form() {
        let parsed =
            FilterExpression::parse("age:min(18),max(65.5),noNull active:equals(true) n:equals(7)")
                .unwrap();
        assert_eq!(parsed.get("age").unwrap().min, Some(18.0));
        assert_eq!(parsed.get("age").unwrap().max, Some(65.5));
        assert!(!parsed.get("age").unwrap().allow_null);
        assert_eq!(parsed.get("active").unwrap().equals, Some(Value::Bool(true)));
        assert_eq!(parsed.get("n").unwrap().equals, Some(Value::Int64(7)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(FilterExpression::parse("nocolon").is_err());
        assert!(FilterExpression::parse("a:min(x)").is_err());
        assert!(FilterExpression::parse("a:between(1)").is_err());
        assert!(FilterExpression::parse(":min(1)").is_err());
    }

    #[test]
    fn test_parse_equals_with_comma() {
        let parsed = FilterExpression::parse("tags:equals(a,b),noNull").unwrap();
        let spec = parsed.get("tags").unwrap();
        assert_eq!(spec.equals, Some(Value::from("a,b")));
        assert!(!spec.allow_null);
    }

    #[test]
    fn test_text_with_separators_is_quoted() {
        let mut filters = FilterSet::new();
        filters.set("name", FilterSpec::equals("John Smith"));
        filters.set("note", FilterSpec::equals(r#"say "hi" (\o/)"#));

        let expr = FilterExpression::serialize(&filters);
        assert_eq!(
            expr,
            r#"name:equals("John Smith") note:equals("say \"hi\" (\\o/)")"#
        );
        assert_eq!(FilterExpression::parse(&expr).unwrap(), filters);
    }

    #[test]
    fn test_text_spelling_a_literal_stays_text() {
        let mut filters = FilterSet::new();
        filters.set("flag", FilterSpec::equals("true"));
        filters.set("code", FilterSpec::equals("042"));

        let expr = FilterExpression::serialize(&filters);
        assert_eq!(expr, r#"flag:equals("true") code:equals("042")"#);

        let parsed = FilterExpression::parse(&expr).unwrap();
        assert_eq!(parsed, filters);
        assert_eq!(parsed.get("flag").unwrap().equals, Some(Value::from("true")));
        assert!(parsed.get("flag").unwrap().matches(&Value::from("true")));
    }

    #[test]
    fn test_quoted_column_name() {
        let mut filters = FilterSet::new();
        filters.set("unit price", FilterSpec::range(Some(1.0), None));
        filters.set("a:b", FilterSpec::not_null());

        let expr = FilterExpression::serialize(&filters);
        assert_eq!(expr, r#""unit price":min(1) "a:b":noNull"#);
        assert_eq!(FilterExpression::parse(&expr).unwrap(), filters);
    }

    #[test]
    fn test_parse_rejects_unterminated_quote() {
        assert!(FilterExpression::parse(r#"name:equals("John)"#).is_err());
        assert!(FilterExpression::parse(r#""name:min(1)"#).is_err());
        assert!(FilterExpression::parse(r#"name:equals("a"b)"#).is_err());
    }
}
