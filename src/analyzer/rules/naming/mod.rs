pub use crate::analyzer::rules::{DiagnosticRule, helpers};

pub mod camel_case_variable;

pub use camel_case_variable::CamelCaseVariableRule;
