pub use crate::analyzer::rules::{DiagnosticRule, helpers};

pub mod forbidden_aliased_import;

pub use forbidden_aliased_import::ForbiddenAliasedImportRule;
