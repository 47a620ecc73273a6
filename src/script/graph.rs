//! Static analysis of the dependency graph between definitions.
//!
//! Nodes are variables and custom functions. A variable depends on every variable
//! it references and every custom function it calls; custom functions are shown as
//! `%name` in errors. Both branches of lazy conditionals count as dependencies, so
//! a broken definition is reported even while the branch that uses it is not taken.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::script::ast::Template;
use crate::script::error::ScriptError;
use crate::script::functions::FunctionRegistry;
use crate::script::registry::{Definition, Lookup, Registry};

/// Check every definition reachable from `roots`.
///
/// Names in `unresolvable` are leaves. Variables for which `settled` returns true
/// already hold a valid value and are not descended into.
pub(crate) fn validate<'a>(
    lookup: Lookup<'a>,
    functions: &FunctionRegistry,
    unresolvable: &BTreeSet<String>,
    roots: impl IntoIterator<Item = &'a str>,
    settled: &dyn Fn(&str) -> bool,
) -> Result<(), ScriptError> {
    let mut walk = Walk {
        lookup,
        functions,
        unresolvable,
        settled,
        path: Vec::new(),
        done: HashSet::new(),
    };
    for root in roots {
        if let Some(Definition::Variable(template)) = lookup.get(root) {
            walk.visit(root.to_string(), template)?;
        }
    }
    Ok(())
}

struct Walk<'a, 'b> {
    lookup: Lookup<'a>,
    functions: &'b FunctionRegistry,
    unresolvable: &'b BTreeSet<String>,
    settled: &'b dyn Fn(&str) -> bool,
    path: Vec<String>,
    done: HashSet<String>,
}

impl<'a> Walk<'a, '_> {
    fn visit(&mut self, node: String, template: &'a Template) -> Result<(), ScriptError> {
        if self.done.contains(&node) {
            return Ok(());
        }
        if let Some(pos) = self.path.iter().position(|n| *n == node) {
            let mut cycle = self.path[pos..].to_vec();
            cycle.push(node);
            return Err(ScriptError::CycleDetected { cycle });
        }

        self.path.push(node.clone());
        self.visit_references(&node, template)?;
        self.path.pop();
        self.done.insert(node);
        Ok(())
    }

    fn visit_references(&mut self, node: &str, template: &'a Template) -> Result<(), ScriptError> {
        for name in template.variables() {
            if self.unresolvable.contains(name) {
                continue;
            }
            match self.lookup.get(name) {
                None => {
                    return Err(ScriptError::UndefinedReference {
                        name: name.to_string(),
                        referenced_by: node.to_string(),
                    })
                }
                Some(Definition::Function(_)) => {
                    return Err(ScriptError::NotAVariable {
                        name: name.to_string(),
                        referenced_by: node.to_string(),
                    })
                }
                Some(Definition::Variable(dependency)) => {
                    if !(self.settled)(name) {
                        self.visit(name.to_string(), dependency)?;
                    }
                }
            }
        }

        for (name, argc) in template.calls() {
            if let Some(Definition::Function(function)) = self.lookup.get(name) {
                if function.arity() != argc {
                    return Err(ScriptError::FunctionArity {
                        function: name.to_string(),
                        expected: function.arity().to_string(),
                        actual: argc,
                    });
                }
                self.visit(format!("%{}", name), function.body())?;
                continue;
            }
            check_builtin(self.functions, name, argc, node)?;
        }
        Ok(())
    }
}

fn check_builtin(
    functions: &FunctionRegistry,
    name: &str,
    argc: usize,
    referenced_by: &str,
) -> Result<(), ScriptError> {
    let builtin = functions
        .lookup(name)
        .ok_or_else(|| ScriptError::UndefinedFunction {
            name: name.to_string(),
            referenced_by: referenced_by.to_string(),
        })?;
    if !builtin.arity().accepts(argc) {
        return Err(ScriptError::FunctionArity {
            function: name.to_string(),
            expected: builtin.arity().to_string(),
            actual: argc,
        });
    }
    Ok(())
}

/// Shallow check of incoming definitions: every name they reference directly must
/// be defined (in `lookup`) or unresolvable, and every call must name a function.
pub(crate) fn check_references(
    lookup: Lookup<'_>,
    functions: &FunctionRegistry,
    unresolvable: &BTreeSet<String>,
    definitions: &Registry,
) -> Result<(), ScriptError> {
    for (name, definition) in definitions {
        let template = definition.template();
        for reference in template.variables() {
            if lookup.get(reference).is_none() && !unresolvable.contains(reference) {
                return Err(ScriptError::UndefinedReference {
                    name: reference.to_string(),
                    referenced_by: name.clone(),
                });
            }
        }
        for (function, argc) in template.calls() {
            if !matches!(lookup.get(function), Some(Definition::Function(_))) {
                check_builtin(functions, function, argc, name)?;
            }
        }
    }
    Ok(())
}

/// Names whose value can depend on any of `changed`, including `changed` itself.
pub(crate) fn affected(lookup: Lookup<'_>, changed: &BTreeSet<String>) -> BTreeSet<String> {
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, definition) in lookup.iter() {
        let template = definition.template();
        let calls = template.calls().into_iter().map(|(function, _)| function);
        for dependency in template.variables().into_iter().chain(calls) {
            dependents.entry(dependency).or_default().push(name);
        }
    }

    let mut affected: BTreeSet<String> = changed.clone();
    let mut queue: VecDeque<&str> = changed.iter().map(String::as_str).collect();
    while let Some(name) = queue.pop_front() {
        for &dependent in dependents.get(name).into_iter().flatten() {
            if affected.insert(dependent.to_string()) {
                queue.push_back(dependent);
            }
        }
    }
    affected
}
