//! The `_name.<suffix>` partial convention (spec §4.6) layered on top of
//! Handlebars' own partial registry: scanning a template directory,
//! files whose stem starts with `_` are registered as partials (included
//! via `{{> name}}`, never rendered directly); every other file becomes
//! a directly renderable top-level template named after its stem.

use std::fs;
use std::path::Path;

use handlebars::Handlebars;

use crate::error::GenerateError;

use super::context::RenderContext;
use super::filters;

pub struct TemplateSet<'reg> {
    registry: Handlebars<'reg>,
    template_names: Vec<String>,
}

impl<'reg> TemplateSet<'reg> {
    /// Scan `dir` (one level, non-recursive) and register every file it
    /// finds per the `_name.<suffix>` convention.
    pub fn load(dir: &Path) -> Result<Self, GenerateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_escape_fn(handlebars::no_escape);
        filters::register(&mut registry);
        let mut template_names = Vec::new();

        let entries = fs::read_dir(dir).map_err(|e| GenerateError::new(format!("cannot read template directory '{}': {}", dir.display(), e)))?;

        for entry in entries {
            let entry = entry.map_err(|e| GenerateError::new(format!("cannot read template directory entry: {}", e)))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let file_stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
            if file_stem.is_empty() {
                continue;
            }
            let content = fs::read_to_string(&path).map_err(|e| GenerateError::new(format!("cannot read template '{}': {}", path.display(), e)))?;

            if let Some(partial_name) = file_stem.strip_prefix('_') {
                registry
                    .register_partial(partial_name, content)
                    .map_err(|e| GenerateError::new(format!("invalid partial '{}': {}", partial_name, e)))?;
            } else {
                registry
                    .register_template_string(&file_stem, content)
                    .map_err(|e| GenerateError::new(format!("invalid template '{}': {}", file_stem, e)))?;
                template_names.push(file_stem);
            }
        }

        Ok(Self { registry, template_names })
    }

    /// Names of the directly renderable (non-partial) templates found.
    pub fn template_names(&self) -> &[String] {
        &self.template_names
    }

    pub fn render(&self, template_name: &str, ctx: &RenderContext) -> Result<String, GenerateError> {
        self.registry
            .render(template_name, ctx)
            .map_err(|e| GenerateError::new(format!("failed to render template '{}': {}", template_name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::build;
    use crate::ast::parser::parse as parse_ast;
    use crate::lexer::tokenize;

    fn sample_context() -> RenderContext {
        let tokens = tokenize("parser[D] | entry_point[main] | function[main] | state[s] | default | -> | >>").unwrap();
        let machine = parse_ast(&tokens).unwrap();
        let ir = build(&machine).unwrap();
        super::super::context::build(&ir, "rust", false)
    }

    #[test]
    fn underscore_files_register_as_partials_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("_header.rs"), "// parser: {{parser_name}}").unwrap();
        fs::write(dir.path().join("main.rs"), "{{> header}}\nfn entry() {}\n").unwrap();

        let set = TemplateSet::load(dir.path()).unwrap();
        assert_eq!(set.template_names(), &["main".to_string()]);

        let rendered = set.render("main", &sample_context()).unwrap();
        assert!(rendered.contains("// parser: D"));
        assert!(rendered.contains("fn entry() {}"));
    }

    #[test]
    fn pascalcase_helper_is_available_in_templates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.rs"), "{{pascalcase parser_name}}").unwrap();
        let set = TemplateSet::load(dir.path()).unwrap();
        let rendered = set.render("main", &sample_context()).unwrap();
        assert_eq!(rendered, "D");
    }
}
