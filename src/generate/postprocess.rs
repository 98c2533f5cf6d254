//! Post-processing of rendered template output (spec §4.6): Handlebars
//! whitespace control only gets a template author so far, so the
//! generator collapses runs of blank lines and makes sure exactly one
//! blank line separates top-level items, the way `rustfmt` would if it
//! ran afterwards (it isn't invoked here — no Non-goal covers shipping a
//! rustfmt dependency, but none requires it either, and the corpus's own
//! codegen tools don't assume one is on `PATH`).

const TOP_LEVEL_PREFIXES: &[&str] = &["pub fn ", "fn ", "pub struct ", "struct ", "pub enum ", "enum ", "pub trait ", "trait ", "impl ", "pub mod ", "mod "];

fn is_top_level_item(line: &str) -> bool {
    TOP_LEVEL_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// Collapse two or more consecutive blank lines into one.
fn collapse_blank_runs(lines: &[&str]) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut prev_blank = false;
    for line in lines {
        let blank = line.trim().is_empty();
        if blank && prev_blank {
            continue;
        }
        out.push(line.trim_end().to_string());
        prev_blank = blank;
    }
    out
}

/// Insert a blank line before every top-level item that doesn't already
/// have one above it (and isn't the first line of the file).
fn space_top_level_items(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i > 0 && is_top_level_item(line) {
            let prev_blank = out.last().map(|l: &String| l.trim().is_empty()).unwrap_or(true);
            if !prev_blank {
                out.push(String::new());
            }
        }
        out.push(line.clone());
    }
    out
}

/// Run the full post-processing pass over one rendered template's text.
pub fn run(rendered: &str) -> String {
    let lines: Vec<&str> = rendered.lines().collect();
    let collapsed = collapse_blank_runs(&lines);
    let spaced = space_top_level_items(collapsed);

    let mut text = spaced.join("\n");
    while text.ends_with('\n') {
        text.pop();
    }
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_multiple_blank_lines() {
        let input = "fn a() {}\n\n\n\nfn b() {}\n";
        let output = run(input);
        assert_eq!(output, "fn a() {}\n\nfn b() {}\n");
    }

    #[test]
    fn inserts_blank_line_before_top_level_item() {
        let input = "use std::fmt;\nstruct Foo;\n";
        let output = run(input);
        assert_eq!(output, "use std::fmt;\n\nstruct Foo;\n");
    }

    #[test]
    fn does_not_touch_nested_items() {
        let input = "fn a() {\n    fn inner() {}\n}\n";
        let output = run(input);
        assert_eq!(output, input);
    }

    #[test]
    fn always_ends_with_single_trailing_newline() {
        let input = "fn a() {}\n\n\n\n";
        let output = run(input);
        assert_eq!(output, "fn a() {}\n");
    }
}
