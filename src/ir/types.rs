//! Type resolution (spec §4.4.1): each [`TypeDecl`] becomes a [`TypeInfo`];
//! `BRACKET` types emit a start and end event, `CONTENT`/`INTERNAL` do not.

use crate::ast::{Machine, TypeKind};
use crate::error::ValidationError;

use super::model::TypeInfo;

pub fn resolve(machine: &Machine) -> Result<Vec<TypeInfo>, ValidationError> {
    let mut seen = std::collections::HashSet::new();
    let mut types = Vec::with_capacity(machine.types.len());
    for decl in &machine.types {
        if !seen.insert(decl.name.clone()) {
            return Err(ValidationError::new(decl.lineno, format!("duplicate type declaration '{}'", decl.name)));
        }
        let emits_bracket = decl.kind == TypeKind::Bracket;
        types.push(TypeInfo {
            name: decl.name.clone(),
            kind: decl.kind.clone(),
            emits_start: emits_bracket,
            emits_end: emits_bracket,
            lineno: decl.lineno,
        });
    }
    Ok(types)
}

/// Whether a function with the given return type emits events at all
/// (`BRACKET` or `CONTENT`; `INTERNAL` and untyped functions do not).
pub fn function_emits_events(return_type: &Option<String>, types: &[TypeInfo]) -> bool {
    match return_type {
        None => false,
        Some(name) => types
            .iter()
            .find(|t| &t.name == name)
            .map(|t| matches!(t.kind, TypeKind::Bracket | TypeKind::Content))
            .unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TypeDecl;

    #[test]
    fn bracket_type_emits_start_and_end() {
        let machine = Machine {
            name: "D".into(),
            entry_point: "main".into(),
            types: vec![TypeDecl { name: "Obj".into(), kind: TypeKind::Bracket, lineno: 1 }],
            functions: vec![],
            keywords: vec![],
        };
        let types = resolve(&machine).unwrap();
        assert!(types[0].emits_start && types[0].emits_end);
    }

    #[test]
    fn duplicate_type_is_an_error() {
        let machine = Machine {
            name: "D".into(),
            entry_point: "main".into(),
            types: vec![
                TypeDecl { name: "Obj".into(), kind: TypeKind::Bracket, lineno: 1 },
                TypeDecl { name: "Obj".into(), kind: TypeKind::Content, lineno: 2 },
            ],
            functions: vec![],
            keywords: vec![],
        };
        assert!(resolve(&machine).is_err());
    }
}
