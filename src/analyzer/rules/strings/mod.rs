pub use crate::analyzer::rules::{DiagnosticRule, helpers};

pub mod single_quotes;

pub use single_quotes::SingleQuotesRule;
