//! Property-based tests for the query builders
//!
//! These tests verify that, for arbitrary identifiers and values:
//! - Values never leak into SQL text; they are always bound as parameters
//! - Placeholder count matches the number of bound values
//! - Row arity mismatches in batch inserts are always rejected
//! - An absent WHERE clause is always rendered as `true`

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use relinkdb::core::db::builder::{
        delete_by_condition, insert_by_fields, insert_many, quote_identifier,
        select_by_condition, update_by_condition,
    };
    use relinkdb::{DbError, Value};

    fn arb_identifier() -> impl Strategy<Value = String> {
        "[a-zA-Z_][a-zA-Z0-9_`]{0,29}"
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<i64>().prop_map(Value::Int),
            any::<bool>().prop_map(Value::Bool),
            "[ -~]{0,20}".prop_map(Value::Text),
            prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
        ]
    }

    fn arb_fields() -> impl Strategy<Value = Vec<(String, Value)>> {
        prop::collection::vec((arb_identifier(), arb_value()), 1..8)
    }

    proptest! {
        /// Placeholders and bound values always line up
        #[test]
        fn prop_insert_binds_every_value(table in arb_identifier(), fields in arb_fields()) {
            let stmt = insert_by_fields(&table, fields.clone()).unwrap();
            prop_assert_eq!(stmt.sql.matches('?').count(), fields.len());
            let expected: Vec<Value> = fields.into_iter().map(|(_, v)| v).collect();
            prop_assert_eq!(stmt.params, expected);
        }

        /// Text values are never spliced into the statement
        #[test]
        fn prop_values_never_appear_in_sql(text in "'[a-z]{3,10}'") {
            let stmt = update_by_condition("t", vec![("a", Value::Text(text.clone()))], None).unwrap();
            prop_assert!(!stmt.sql.contains(&text));
            prop_assert_eq!(stmt.sql, "UPDATE `t` SET `a` = ? WHERE true");
        }

        /// Quoted identifiers are always a balanced backtick literal
        #[test]
        fn prop_quoted_identifier_is_balanced(name in arb_identifier()) {
            let quoted = quote_identifier(&name).unwrap();
            prop_assert!(quoted.starts_with('`') && quoted.ends_with('`'));
            let inner = &quoted[1..quoted.len() - 1];
            prop_assert_eq!(inner.replace("``", ""), name.replace('`', ""));
        }

        /// Every row of a batch must match the field count
        #[test]
        fn prop_insert_many_rejects_ragged_rows(
            width in 1usize..6,
            good_rows in 0usize..4,
            bad_width in 0usize..8,
        ) {
            prop_assume!(bad_width != width);
            let names: Vec<String> = (0..width).map(|i| format!("c{i}")).collect();
            let mut rows = vec![vec![Value::Int(1); width]; good_rows];
            rows.push(vec![Value::Int(1); bad_width]);

            let result = insert_many("t", &names, rows);
            prop_assert!(matches!(result, Err(DbError::Validation(_))));
        }

        /// Missing WHERE clauses always become the always-true predicate
        #[test]
        fn prop_absent_where_is_true(table in arb_identifier()) {
            let select = select_by_condition(&table, None).unwrap();
            let delete = delete_by_condition(&table, None).unwrap();
            prop_assert!(select.sql.ends_with(" WHERE true"));
            prop_assert!(delete.sql.ends_with(" WHERE true"));
        }
    }
}
