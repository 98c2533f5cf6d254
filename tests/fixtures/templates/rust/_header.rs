// Generated by descent for target "{{target}}". Do not edit by hand.
pub struct {{pascalcase parser_name}}Parser;
