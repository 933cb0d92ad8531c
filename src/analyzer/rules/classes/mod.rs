pub use crate::analyzer::rules::{DiagnosticRule, helpers};

pub mod forbidden_public_property;
pub mod readonly_class;
pub mod readonly_property;

pub use forbidden_public_property::ForbiddenPublicPropertyRule;
pub use readonly_class::ReadonlyClassRule;
pub use readonly_property::ReadonlyPropertyRule;
