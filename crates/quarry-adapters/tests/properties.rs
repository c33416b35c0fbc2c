//! Property tests for both compilers.
//!
//! Random WHERE chains over a small field set, with text and nested-select
//! subqueries and a grouped HAVING subquery, check that placeholder order,
//! placeholder count, and output are stable for every dialect.

use proptest::prelude::*;
use quarry_adapters::document;
use quarry_adapters::sql::{Dialect, SqlCompiler};
use quarry_common::Value;
use quarry_core::options::{
    cond, group_by, having, in_subquery, not_in_subquery, select, where_condition,
};
use quarry_core::{
    Condition, Operator, Query, QueryCompiler, QueryOption, SubQuery, SubQuerySource,
};

const FIELDS: [&str; 4] = ["a", "b", "c", "d"];

fn arb_field() -> impl Strategy<Value = String> {
    prop::sample::select(FIELDS.to_vec()).prop_map(str::to_string)
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Int64),
        any::<bool>().prop_map(Value::Bool),
        "[a-z?$']{0,6}".prop_map(Value::String),
    ]
}

/// A basic condition plus the arguments it must bind, in order.
fn arb_basic() -> impl Strategy<Value = (Condition, Vec<Value>)> {
    let scalar_op = prop::sample::select(vec![
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Lte,
    ]);
    prop_oneof![
        (arb_field(), scalar_op, arb_scalar())
            .prop_map(|(f, op, v)| (cond(f, op, v.clone()), vec![v])),
        (arb_field(), "[a-z%_]{0,6}").prop_map(|(f, pattern)| {
            let v = Value::String(pattern);
            (cond(f, Operator::Like, v.clone()), vec![v])
        }),
        (arb_field(), prop::collection::vec(arb_scalar(), 0..4)).prop_map(|(f, items)| {
            (cond(f, Operator::In, Value::List(items.clone())), items)
        }),
        (arb_field(), arb_scalar(), arb_scalar()).prop_map(|(f, lo, hi)| {
            (
                cond(f, Operator::Between, Value::List(vec![lo.clone(), hi.clone()])),
                vec![lo, hi],
            )
        }),
        arb_field().prop_map(|f| (cond(f, Operator::IsNull, Value::Null), vec![])),
    ]
}

/// Nested AND/OR/NOT trees over basic conditions.
fn arb_condition() -> impl Strategy<Value = (Condition, Vec<Value>)> {
    arb_basic().prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(|children| {
                let args = children.iter().flat_map(|(_, a)| a.clone()).collect();
                (Condition::and(children.into_iter().map(|(c, _)| c)), args)
            }),
            prop::collection::vec(inner.clone(), 0..4).prop_map(|children| {
                let args = children.iter().flat_map(|(_, a)| a.clone()).collect();
                (Condition::or(children.into_iter().map(|(c, _)| c)), args)
            }),
            inner.prop_map(|(c, a)| (Condition::not(c), a)),
        ]
    })
}

/// A subquery condition and the arguments it binds: either caller text with
/// `?` markers, or a nested select carrying its own condition tree.
fn arb_subquery() -> impl Strategy<Value = (QueryOption, Vec<Value>)> {
    prop_oneof![
        arb_scalar().prop_map(|value| {
            let option = in_subquery(
                "a",
                "SELECT id FROM t WHERE note <> '?' AND k = ?",
                vec![value.clone()],
            )
            .unwrap();
            (option, vec![value])
        }),
        arb_condition().prop_map(|(condition, args)| {
            let inner = Query::build(&[select(["id"]), where_condition(condition)]);
            let option =
                not_in_subquery("b", SubQuerySource::select("u", inner), vec![]).unwrap();
            (option, args)
        }),
    ]
}

/// A WHERE chain with an optional subquery spliced at a random position, and
/// an optional grouped HAVING subquery whose arguments follow WHERE.
fn arb_query() -> impl Strategy<Value = (Vec<QueryOption>, Vec<Value>)> {
    (
        prop::collection::vec(arb_condition(), 0..6),
        prop::option::of((any::<prop::sample::Index>(), arb_subquery())),
        prop::option::of(arb_scalar()),
    )
        .prop_map(|(conditions, subquery, having_arg)| {
            let mut options = Vec::new();
            let mut args = Vec::new();
            for (condition, bound) in conditions {
                options.push(where_condition(condition));
                args.push(bound);
            }
            if let Some((index, (option, bound))) = subquery {
                let at = index.index(options.len() + 1);
                options.insert(at, option);
                args.insert(at, bound);
            }
            if let Some(value) = having_arg {
                let subquery = SubQuery::scalar(
                    "COUNT(c)",
                    Operator::Gt,
                    "SELECT MAX(n) FROM t WHERE k = ?",
                    vec![value.clone()],
                )
                .unwrap();
                options.push(group_by(["d"]));
                options.push(having(Condition::subquery(subquery)));
                args.push(vec![value]);
            }
            (options, args.into_iter().flatten().collect())
        })
}

fn count_placeholders(dialect: Dialect, text: &str) -> usize {
    dialect.count_placeholders(text).unwrap()
}

proptest! {
    #[test]
    fn prop_args_follow_placeholder_order((options, expected) in arb_query()) {
        let query = Query::build(&options);
        for dialect in Dialect::ALL {
            let fragments = SqlCompiler::new(dialect).compile(&query).unwrap();
            prop_assert_eq!(fragments.args(), expected.as_slice());

            let found = count_placeholders(dialect, fragments.where_clause().unwrap_or(""))
                + count_placeholders(dialect, fragments.having().unwrap_or(""));
            prop_assert_eq!(found, expected.len());
        }
    }

    #[test]
    fn prop_postgres_placeholders_are_sequential((options, expected) in arb_query()) {
        let query = Query::build(&options);
        let fragments = SqlCompiler::new(Dialect::Postgres).compile(&query).unwrap();
        let sql = fragments.to_select("t").unwrap().sql;

        let numbers: Vec<usize> = sql
            .split('$')
            .skip(1)
            .filter_map(|rest| {
                let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().ok()
            })
            .collect();
        let sequential: Vec<usize> = (1..=expected.len()).collect();
        prop_assert_eq!(numbers, sequential);
    }

    #[test]
    fn prop_compilation_is_deterministic((options, _) in arb_query()) {
        let query = Query::build(&options);
        let rebuilt = Query::build(&options);
        for dialect in Dialect::ALL {
            let compiler = SqlCompiler::new(dialect);
            prop_assert_eq!(compiler.compile(&query).unwrap(), compiler.compile(&rebuilt).unwrap());
        }
    }

    #[test]
    fn prop_document_top_level_and(conditions in prop::collection::vec(arb_condition(), 2..6)) {
        let count = conditions.len();
        let options: Vec<_> = conditions.into_iter().map(|(c, _)| where_condition(c)).collect();
        let command = document::compile(&Query::build(&options)).unwrap();

        let and = command.filter.get("$and").and_then(|v| v.as_array()).map(Vec::len);
        prop_assert_eq!(and, Some(count));
        prop_assert_eq!(command.filter.len(), 1);
    }
}
