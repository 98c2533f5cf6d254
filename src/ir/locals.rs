//! Local-variable inference (spec §4.4.7): scans a function's entry
//! actions and state commands for assignments, recording each distinct
//! variable name. Entry-action assignments whose right-hand side is a
//! bare integer literal are hoisted into `local_init_values` so the
//! generator can emit a declare-with-initialiser instead of a
//! declare-then-assign (avoids a dead-store on the declaration).

use std::collections::{BTreeMap, BTreeSet};

use super::model::IrCommand;

fn collect_assigned_vars(commands: &[IrCommand], locals: &mut BTreeSet<String>) {
    for cmd in commands {
        match cmd {
            IrCommand::Assign { var, .. } | IrCommand::AddAssign { var, .. } | IrCommand::SubAssign { var, .. } => {
                locals.insert(var.clone());
            }
            IrCommand::Conditional(clauses) => {
                for (_, body) in clauses {
                    collect_assigned_vars(body, locals);
                }
            }
            _ => {}
        }
    }
}

/// Takes every command list in the function (entry
/// actions, each state's cases and EOF handler, the function-level EOF
/// handler) so locals assigned only inside a state are still captured.
pub fn infer_from_lists<'a>(lists: impl IntoIterator<Item = &'a [IrCommand]>) -> BTreeSet<String> {
    let mut locals = BTreeSet::new();
    for list in lists {
        collect_assigned_vars(list, &mut locals);
    }
    locals
}

/// Hoist entry-action assignments with a literal-integer right-hand side
/// into declare-with-initialiser values.
pub fn hoist_init_values(entry_actions: &[IrCommand]) -> BTreeMap<String, i64> {
    let mut values = BTreeMap::new();
    for cmd in entry_actions {
        if let IrCommand::Assign { var, expr } = cmd {
            if let Ok(n) = expr.trim().parse::<i64>() {
                values.insert(var.clone(), n);
            }
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hoists_literal_int_assignment() {
        let entry = vec![IrCommand::Assign { var: "depth".into(), expr: "1".into() }];
        let values = hoist_init_values(&entry);
        assert_eq!(values.get("depth"), Some(&1));
    }

    #[test]
    fn non_literal_assignment_is_not_hoisted() {
        let entry = vec![IrCommand::Assign { var: "depth".into(), expr: "depth + 1".into() }];
        assert!(hoist_init_values(&entry).is_empty());
    }

    #[test]
    fn locals_collected_across_states_and_conditionals() {
        let entry: &[IrCommand] = &[];
        let state_cmds: &[IrCommand] = &[IrCommand::Conditional(vec![("p == 1".into(), vec![IrCommand::AddAssign { var: "depth".into(), expr: "1".into() }])])];
        let locals = infer_from_lists([entry, state_cmds]);
        assert!(locals.contains("depth"));
    }
}
