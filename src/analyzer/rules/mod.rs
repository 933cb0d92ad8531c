use super::config::AnalyzerConfig;
use super::names::FileContext;
use crate::analyzer::fix::ChangeSet;
use crate::analyzer::parser;

pub mod classes;
pub mod comments;
pub mod functions;
pub mod helpers;
pub mod namespaces;
pub mod naming;
pub mod strings;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use classes::{ForbiddenPublicPropertyRule, ReadonlyClassRule, ReadonlyPropertyRule};
pub use comments::CommentFormatRule;
pub use functions::{
    ForbiddenDefaultArgumentRule, ForbiddenGlobalFunctionRule, ForbiddenVariadicRule,
};
pub use namespaces::ForbiddenAliasedImportRule;
pub use naming::CamelCaseVariableRule;
pub use strings::SingleQuotesRule;
pub use types::ForbiddenTypesRule;

/// A rule inspects one file's token stream. Rules are immutable after construction
/// and are shared between worker threads.
pub trait DiagnosticRule: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, parsed: &parser::ParsedSource, context: &FileContext)
    -> Vec<super::Diagnostic>;

    fn fix(&self, _parsed: &parser::ParsedSource, _context: &FileContext) -> Vec<ChangeSet> {
        Vec::new()
    }
}

/// Builds every rule enabled by `config`, with its settings applied once up front.
pub fn build_rules(config: &AnalyzerConfig) -> Vec<Box<dyn DiagnosticRule>> {
    let rules: Vec<Box<dyn DiagnosticRule>> = vec![
        Box::new(ForbiddenTypesRule::new(&config.forbidden_types)),
        Box::new(ForbiddenVariadicRule::new()),
        Box::new(ForbiddenDefaultArgumentRule::new()),
        Box::new(ForbiddenGlobalFunctionRule::new()),
        Box::new(ForbiddenPublicPropertyRule::new(&config.public_properties)),
        Box::new(ReadonlyPropertyRule::new()),
        Box::new(ReadonlyClassRule::new(&config.readonly_classes)),
        Box::new(ForbiddenAliasedImportRule::new()),
        Box::new(SingleQuotesRule::new()),
        Box::new(CamelCaseVariableRule::new()),
        Box::new(CommentFormatRule::new()),
    ];

    rules
        .into_iter()
        .filter(|rule| config.enabled(rule.name()))
        .collect()
}
