//! Property tests for the resolution engine.

use preset_script::script::{Definition, Registry, Script, Value};
use proptest::prelude::*;
use std::collections::BTreeSet;

const INPUTS: [&str; 3] = ["in0", "in1", "in2"];

/// A layered graph: input variables, then derived variables that reference only
/// inputs or earlier derived variables, so it never has a cycle.
fn arb_definitions() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(prop::collection::vec(0usize..8, 1..3), 1..8).prop_map(|layers| {
        let mut definitions: Vec<(String, String)> = INPUTS
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), format!("v{}", i)))
            .collect();
        for (i, references) in layers.iter().enumerate() {
            let available = INPUTS.len() + i;
            let body: String = references
                .iter()
                .map(|r| {
                    let index = r % available;
                    let name = &definitions[index].0;
                    format!("{{{}}}", name)
                })
                .collect::<Vec<_>>()
                .join("-");
            definitions.push((format!("d{}", i), body));
        }
        definitions
    })
}

const INPUT_VALUES: [&str; 3] = ["{''}", "x", "y"];
const FUNCTION_BODIES: [&str; 4] = ["[{$0}]", "{$0}+", "{%upper($0)}", "{$0}:{in1}"];

/// Like [`arb_definitions`], but derived variables also branch on inputs and call
/// the custom function `%f`, whose body may itself read an input.
fn arb_program() -> impl Strategy<Value = Vec<(String, String)>> {
    (
        prop::collection::vec(prop::sample::select(INPUT_VALUES.to_vec()), INPUTS.len()),
        prop::sample::select(FUNCTION_BODIES.to_vec()),
        prop::collection::vec((0usize..5, 0usize..16, 0usize..16, 0usize..16), 1..8),
    )
        .prop_map(|(values, function, layers)| {
            let mut definitions = vec![("%f".to_string(), function.to_string())];
            let mut names: Vec<String> = Vec::new();
            for (name, value) in INPUTS.iter().zip(values) {
                definitions.push((name.to_string(), value.to_string()));
                names.push(name.to_string());
            }
            for (i, (kind, a, b, c)) in layers.into_iter().enumerate() {
                let a = &names[a % names.len()];
                let b = &names[b % names.len()];
                let c = &names[c % names.len()];
                let body = match kind {
                    0 => format!("{{{}}}-{{{}}}", a, b),
                    1 => format!("{{%if({}, {}, {})}}", a, b, c),
                    2 => format!("{{%if_passthrough({}, {})}}", a, b),
                    3 => format!("{{%f({})}}", a),
                    _ => format!("{{%f(%if({}, {}, 'none'))}}", a, b),
                };
                let name = format!("d{}", i);
                definitions.push((name.clone(), body));
                names.push(name);
            }
            definitions
        })
}

fn registry(definitions: &[(String, String)]) -> Registry {
    let mut registry = Registry::new();
    for (name, source) in definitions {
        registry.register(name, source).unwrap();
    }
    registry
}

fn arb_unresolvable() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(prop::sample::select(INPUTS.to_vec()), 0..=INPUTS.len())
        .prop_map(|names| names.into_iter().map(str::to_string).collect())
}

proptest! {
    #[test]
    fn prop_resolution_is_deterministic(
        definitions in arb_definitions(),
        unresolvable in arb_unresolvable(),
    ) {
        let mut first = Script::new(registry(&definitions));
        let mut second = Script::new(registry(&definitions));
        prop_assert_eq!(
            first.resolve(&unresolvable, true).unwrap().into_values(),
            second.resolve(&unresolvable, false).unwrap().into_values()
        );
    }

    #[test]
    fn prop_second_resolve_does_no_work(
        definitions in arb_definitions(),
        unresolvable in arb_unresolvable(),
    ) {
        let mut script = Script::new(registry(&definitions));
        let first = script.resolve(&unresolvable, true).unwrap();
        let second = script.resolve(&unresolvable, true).unwrap();
        prop_assert_eq!(second.evaluated(), 0);
        prop_assert_eq!(first.into_values(), second.into_values());
    }

    #[test]
    fn prop_incremental_matches_fresh(
        definitions in arb_definitions(),
        before in arb_unresolvable(),
        after in arb_unresolvable(),
    ) {
        let mut incremental = Script::new(registry(&definitions));
        incremental.resolve(&before, true).unwrap();
        let incremental = incremental.resolve(&after, true).unwrap().into_values();

        let mut fresh = Script::new(registry(&definitions));
        prop_assert_eq!(incremental, fresh.resolve(&after, true).unwrap().into_values());
    }

    #[test]
    fn prop_add_matches_fresh(
        program in arb_program(),
        before in arb_unresolvable(),
        after in arb_unresolvable(),
        changed_input in prop::sample::select(INPUTS.to_vec()),
        new_value in prop::sample::select(INPUT_VALUES.to_vec()),
        new_function in prop::sample::select(FUNCTION_BODIES.to_vec()),
    ) {
        let changes = vec![
            (changed_input.to_string(), new_value.to_string()),
            ("%f".to_string(), new_function.to_string()),
        ];
        let mut merged = registry(&program);
        merged.extend(registry(&changes));

        let mut incremental = Script::new(registry(&program));
        incremental.resolve(&before, true).unwrap();
        incremental.add(registry(&changes), &after).unwrap();
        let values = incremental.resolve(&after, true).unwrap().into_values();
        let mut fresh = Script::new(merged.clone());
        prop_assert_eq!(values, fresh.resolve(&after, true).unwrap().into_values());

        // Moving back to the first set must not reuse values from before the add.
        let values = incremental.resolve(&before, true).unwrap().into_values();
        let mut fresh = Script::new(merged);
        prop_assert_eq!(values, fresh.resolve(&before, true).unwrap().into_values());
    }

    #[test]
    fn prop_unresolvable_propagates(
        definitions in arb_definitions(),
        unresolvable in arb_unresolvable(),
    ) {
        let definitions = registry(&definitions);
        let mut script = Script::new(definitions.clone());
        let resolution = script.resolve(&unresolvable, true).unwrap();
        for name in definitions.variables() {
            let value = resolution.get(name).unwrap();
            let depends_on_withheld = depends_on(&definitions, name, &unresolvable);
            prop_assert_eq!(value.is_unresolvable(), depends_on_withheld, "{}", name);
        }
    }

    #[test]
    fn prop_adding_values_never_adds_unresolved(
        definitions in arb_definitions(),
        unresolvable in arb_unresolvable(),
        released in prop::sample::select(INPUTS.to_vec()),
    ) {
        let mut script = Script::new(registry(&definitions));
        let before: BTreeSet<String> = script
            .resolve(&unresolvable, true)
            .unwrap()
            .unresolved()
            .map(str::to_string)
            .collect();

        let mut remaining = unresolvable.clone();
        remaining.remove(released);
        let mut value = Registry::new();
        value.insert(released, Definition::value(Value::from("new")));
        script.add(value, &remaining).unwrap();
        let after: BTreeSet<String> = script
            .resolve(&remaining, true)
            .unwrap()
            .unresolved()
            .map(str::to_string)
            .collect();
        prop_assert!(after.is_subset(&before));
    }
}

fn depends_on(registry: &Registry, name: &str, withheld: &BTreeSet<String>) -> bool {
    if withheld.contains(name) {
        return true;
    }
    registry
        .get(name)
        .map(|definition| {
            definition
                .template()
                .variables()
                .into_iter()
                .any(|dependency| depends_on(registry, dependency, withheld))
        })
        .unwrap_or(false)
}
