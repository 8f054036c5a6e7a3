//! Property-based tests for typeforge-cli.
//!
//! Properties tested:
//! - Property 1: Type Syntax Round-Trip
//! - Property 2: Query Pair Grouping
//! - Property 3: Flag Merging Only Enables

use std::collections::HashMap;

use proptest::prelude::*;
use typeforge::TypeExpr;
use typeforge_cli::config::{CliArgs, Config, ConfigManager};
use typeforge_cli::type_parser::TypeParser;
use typeforge_cli::CheckInput;

// =============================================================================
// Generators for property tests
// =============================================================================

fn arb_primitive() -> impl Strategy<Value = TypeExpr> {
    prop_oneof![
        Just(TypeExpr::Int),
        Just(TypeExpr::Float),
        Just(TypeExpr::Decimal),
        Just(TypeExpr::Str),
        Just(TypeExpr::Bool),
        Just(TypeExpr::Bytes),
        Just(TypeExpr::Uuid),
        Just(TypeExpr::Date),
        Just(TypeExpr::DateTime),
        Just(TypeExpr::Any),
    ]
}

/// Generate nested container types over primitives.
fn arb_type() -> impl Strategy<Value = TypeExpr> {
    arb_primitive().prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(TypeExpr::list),
            (arb_primitive(), inner.clone()).prop_map(|(k, v)| TypeExpr::dict(k, v)),
            prop::collection::vec(inner.clone(), 1..4).prop_map(TypeExpr::tuple),
            inner.clone().prop_map(TypeExpr::optional),
            prop::collection::vec("[a-z]{1,5}", 1..4)
                .prop_map(|values| TypeExpr::literal(values)),
        ]
    })
}

fn arb_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-c]", "[a-z0-9]{0,4}"), 0..12)
}

// =============================================================================
// Property 1: Type Syntax Round-Trip
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1: Type Syntax Round-Trip**
    ///
    /// *For any* type built from primitives and containers, parsing its
    /// rendered text SHALL produce a type that renders identically.
    #[test]
    fn prop_type_syntax_round_trip(ty in arb_type()) {
        let generics = HashMap::new();
        let parser = TypeParser::new(&generics, &[]);
        let text = ty.to_string();
        let parsed = parser.parse(&text).unwrap();
        prop_assert_eq!(parsed.to_string(), text);
    }
}

// =============================================================================
// Property 2: Query Pair Grouping
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 2: Query Pair Grouping**
    ///
    /// *For any* sequence of key=value pairs, grouping SHALL keep every value
    /// under its key in the order given.
    #[test]
    fn prop_query_pairs_grouped_in_order(pairs in arb_pairs()) {
        let input = CheckInput::query(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let CheckInput::Query(params) = input else {
            panic!("expected query input");
        };

        let total: usize = params.values().map(Vec::len).sum();
        prop_assert_eq!(total, pairs.len());
        for (key, values) in &params {
            let expected: Vec<&String> = pairs
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v)
                .collect();
            prop_assert_eq!(values.iter().collect::<Vec<_>>(), expected);
        }
    }
}

// =============================================================================
// Property 3: Flag Merging Only Enables
// =============================================================================

proptest! {
    /// **Property 3: Flag Merging Only Enables**
    ///
    /// *For any* file setting and flag, the merged `omit_none` SHALL be the
    /// logical or of the two.
    #[test]
    fn prop_flags_only_enable(from_file in any::<bool>(), flag in any::<bool>()) {
        let mut config = Config::default();
        config.serializer.omit_none = from_file;
        let args = CliArgs { omit_none: flag, ..Default::default() };

        let merged = ConfigManager::merge_cli_args(config, &args);
        prop_assert_eq!(merged.serializer.omit_none, from_file || flag);
    }
}
