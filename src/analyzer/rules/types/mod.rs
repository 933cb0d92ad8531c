pub use crate::analyzer::rules::{DiagnosticRule, helpers};

pub mod forbidden_types;

pub use forbidden_types::ForbiddenTypesRule;
