//! Custom error-code collection (spec §4.4.9): gathers the code argument
//! of every `/error(Code)` call across the whole parser, including calls
//! nested inside conditional clauses, deduplicated and sorted for enum
//! generation.

use std::collections::BTreeSet;

use super::model::IrCommand;

fn collect(commands: &[IrCommand], codes: &mut BTreeSet<String>) {
    for cmd in commands {
        match cmd {
            IrCommand::ErrorCmd(Some(code)) => {
                codes.insert(code.trim().to_string());
            }
            IrCommand::Conditional(clauses) => {
                for (_, body) in clauses {
                    collect(body, codes);
                }
            }
            _ => {}
        }
    }
}

pub fn collect_from_lists<'a>(lists: impl IntoIterator<Item = &'a [IrCommand]>) -> Vec<String> {
    let mut codes = BTreeSet::new();
    for list in lists {
        collect(list, &mut codes);
    }
    codes.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_and_dedups_error_codes() {
        let a: &[IrCommand] = &[IrCommand::ErrorCmd(Some("UnclosedString".into()))];
        let b: &[IrCommand] = &[IrCommand::Conditional(vec![(
            "p == 1".into(),
            vec![IrCommand::ErrorCmd(Some("UnclosedString".into())), IrCommand::ErrorCmd(Some("BadEscape".into()))],
        )])];
        let codes = collect_from_lists([a, b]);
        assert_eq!(codes, vec!["BadEscape".to_string(), "UnclosedString".to_string()]);
    }

    #[test]
    fn bare_error_with_no_code_is_ignored() {
        let a: &[IrCommand] = &[IrCommand::ErrorCmd(None)];
        assert!(collect_from_lists([a]).is_empty());
    }
}
