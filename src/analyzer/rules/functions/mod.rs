pub use crate::analyzer::rules::{DiagnosticRule, helpers};

pub mod forbidden_default_argument;
pub mod forbidden_global_function;
pub mod forbidden_variadic;

pub use forbidden_default_argument::ForbiddenDefaultArgumentRule;
pub use forbidden_global_function::ForbiddenGlobalFunctionRule;
pub use forbidden_variadic::ForbiddenVariadicRule;
