//! Inline-emit/return fix-up (spec §4.4.8): when a case contains an
//! inline emit immediately followed by a bare `return`, the `return` is
//! marked `suppress_auto_emit` so the generator does not fire the
//! function's automatic return-event a second time.

use super::model::IrCommand;

fn is_inline_emit(cmd: &IrCommand) -> bool {
    matches!(cmd, IrCommand::InlineEmitBare(_) | IrCommand::InlineEmitMark(_) | IrCommand::InlineEmitLiteral(..))
}

/// Mutates `commands` in place, recursing into conditional clauses.
pub fn apply(commands: &mut [IrCommand]) {
    let mut saw_inline_emit = false;
    for cmd in commands.iter_mut() {
        match cmd {
            IrCommand::Return { suppress_auto_emit, .. } if saw_inline_emit => {
                *suppress_auto_emit = true;
                saw_inline_emit = false;
            }
            IrCommand::Conditional(clauses) => {
                for (_, body) in clauses.iter_mut() {
                    apply(body);
                }
                saw_inline_emit = false;
            }
            other => {
                saw_inline_emit = is_inline_emit(other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_after_inline_emit_is_suppressed() {
        let mut commands = vec![
            IrCommand::InlineEmitMark("Float".into()),
            IrCommand::Return { emit_spec: None, suppress_auto_emit: false },
        ];
        apply(&mut commands);
        assert!(matches!(commands[1], IrCommand::Return { suppress_auto_emit: true, .. }));
    }

    #[test]
    fn return_without_preceding_emit_is_untouched() {
        let mut commands = vec![IrCommand::Return { emit_spec: None, suppress_auto_emit: false }];
        apply(&mut commands);
        assert!(matches!(commands[0], IrCommand::Return { suppress_auto_emit: false, .. }));
    }

    #[test]
    fn fixup_recurses_into_conditionals() {
        let mut commands = vec![IrCommand::Conditional(vec![(
            "p == 1".into(),
            vec![
                IrCommand::InlineEmitBare("Foo".into()),
                IrCommand::Return { emit_spec: None, suppress_auto_emit: false },
            ],
        )])];
        apply(&mut commands);
        if let IrCommand::Conditional(clauses) = &commands[0] {
            assert!(matches!(clauses[0].1[1], IrCommand::Return { suppress_auto_emit: true, .. }));
        } else {
            panic!("expected conditional");
        }
    }
}
