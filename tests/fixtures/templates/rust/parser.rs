{{> header}}
impl {{pascalcase parser_name}}Parser {
    pub fn entry_point(&self) -> &'static str {
        "{{entry_point}}"
    }
}
{{#each functions}}
fn {{name}}_state() {}
{{/each}}
