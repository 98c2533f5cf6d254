//! Generator (spec §4.6): renders an already-validated [`crate::ir::IrParser`]
//! through a target's template directory and returns the post-processed
//! source text. Stitches together render-context construction, helper
//! analysis, the Handlebars filter set, the partial-loading convention,
//! and the final whitespace pass.

pub mod context;
pub mod filters;
pub mod helpers;
pub mod postprocess;
pub mod templates;

use std::path::Path;

use tracing::instrument;

use crate::error::{Error, GenerateError};
use crate::ir::IrParser;

pub use context::RenderContext;
pub use templates::TemplateSet;

/// Invocation-scoped knobs for one `generate` call (spec §5.3 — no
/// persisted config, arguments only).
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub target: String,
    pub templates_dir: std::path::PathBuf,
    pub trace: bool,
}

impl GenerateOptions {
    pub fn new(target: impl Into<String>, templates_dir: impl Into<std::path::PathBuf>) -> Self {
        Self { target: target.into(), templates_dir: templates_dir.into(), trace: false }
    }
}

/// The renderable (non-partial) template every target directory must
/// contain, named after the Template contract (spec §6): `parser.<tmpl>`.
const ENTRY_TEMPLATE: &str = "parser";

/// Render `ir` through `options.target`'s template directory: spec §6's
/// Template contract says "a target directory contains `parser.<tmpl>`
/// and optional partials `_<name>.<tmpl>`", so `--templates <dir>
/// --target <name>` resolves to `<dir>/<name>/parser.<tmpl>`.
#[instrument(level = "debug", skip(ir, options), fields(target = %options.target))]
pub fn generate(ir: &IrParser, options: &GenerateOptions) -> Result<String, Error> {
    let target_dir = options.templates_dir.join(&options.target);
    let set = TemplateSet::load(Path::new(&target_dir))?;
    let ctx = context::build(ir, &options.target, options.trace);

    if !set.template_names().iter().any(|n| n == ENTRY_TEMPLATE) {
        return Err(Error::from(GenerateError::new(format!(
            "no '{}.<tmpl>' template found in '{}'",
            ENTRY_TEMPLATE,
            target_dir.display()
        ))));
    }

    let rendered = set.render(ENTRY_TEMPLATE, &ctx)?;
    Ok(postprocess::run(&rendered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parser::parse as parse_ast;
    use crate::ir::build;
    use crate::lexer::tokenize;
    use std::fs;

    #[test]
    fn generate_renders_and_post_processes_a_template() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("rust")).unwrap();
        fs::write(dir.path().join("rust/parser.rs"), "pub struct {{pascalcase parser_name}}Parser;\nfn main() {}\n").unwrap();

        let tokens = tokenize("parser[demo] | entry_point[main] | function[main] | state[s] | default | -> | >>").unwrap();
        let machine = parse_ast(&tokens).unwrap();
        let ir = build(&machine).unwrap();

        let options = GenerateOptions::new("rust", dir.path());
        let output = generate(&ir, &options).unwrap();
        assert!(output.contains("pub struct DemoParser;"));
        assert!(output.contains("\n\nfn main() {}"));
    }

    #[test]
    fn missing_target_directory_is_a_generate_error() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = tokenize("parser[demo] | entry_point[main] | function[main] | state[s] | default | -> | >>").unwrap();
        let machine = parse_ast(&tokens).unwrap();
        let ir = build(&machine).unwrap();

        let options = GenerateOptions::new("missing", dir.path());
        let err = generate(&ir, &options).unwrap_err();
        assert!(matches!(err, Error::Generate(_)));
    }

    #[test]
    fn target_directory_without_a_parser_template_is_a_generate_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("rust")).unwrap();
        fs::write(dir.path().join("rust/_header.rs"), "// header only\n").unwrap();
        let tokens = tokenize("parser[demo] | entry_point[main] | function[main] | state[s] | default | -> | >>").unwrap();
        let machine = parse_ast(&tokens).unwrap();
        let ir = build(&machine).unwrap();

        let options = GenerateOptions::new("rust", dir.path());
        let err = generate(&ir, &options).unwrap_err();
        assert!(matches!(err, Error::Generate(_)));
    }
}
