pub use crate::analyzer::rules::{DiagnosticRule, helpers};

pub mod block;
pub mod format;

pub use format::CommentFormatRule;
