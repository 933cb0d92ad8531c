//! Structural questions rules ask about a token position: is this name a type
//! declaration, which parenthesis is a parameter list, what does a class header
//! or a property declaration look like.

use super::tokens::TokenStream;

/// Modifiers that may precede a property type.
pub const PROPERTY_MODIFIERS: &[&str] = &["public", "protected", "private", "static", "readonly", "var"];
pub const VISIBILITY: &[&str] = &["public", "protected", "private"];
pub const CLASS_LIKE: &[&str] = &["class", "interface", "trait", "enum"];

const MEMBER_MODIFIERS: &[&str] = &[
    "public", "protected", "private", "static", "readonly", "var", "final", "abstract",
];
const PROMOTION_MODIFIERS: &[&str] = &["public", "protected", "private", "readonly"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeContext {
    Parameter,
    Return,
    Property,
}

/// Decides whether the name at `idx` sits in a parameter, return or property type.
pub fn type_declaration_context(tokens: &TokenStream, idx: usize) -> Option<TypeContext> {
    let mut start = idx;
    let boundary = loop {
        let prev = tokens.prev_code(start)?;
        let token = &tokens[prev];
        if token.is_name()
            || token.is_ns_separator()
            || token.is_punct("|")
            || token.is_punct("&")
            || token.is_punct("?")
        {
            start = prev;
            continue;
        }
        if token.is_punct("]") {
            if let Some(open) = token.matching.filter(|&open| tokens[open].is_punct("#[")) {
                start = open;
                continue;
            }
        }
        break prev;
    };

    let token = &tokens[boundary];
    if token.is_any_keyword(PROPERTY_MODIFIERS) {
        return followed_by_variable(tokens, idx).then_some(TypeContext::Property);
    }

    if token.is_punct("(") || token.is_punct(",") {
        let open = if token.is_punct("(") {
            boundary
        } else {
            tokens.enclosing_paren(boundary)?
        };
        return (is_parameter_list(tokens, open) && followed_by_variable(tokens, idx))
            .then_some(TypeContext::Parameter);
    }

    if token.is_punct(":") {
        return is_return_type_colon(tokens, boundary).then_some(TypeContext::Return);
    }

    None
}

fn followed_by_variable(tokens: &TokenStream, idx: usize) -> bool {
    let mut cursor = idx;
    while let Some(next) = tokens.next_code(cursor) {
        let token = &tokens[next];
        if token.is_variable() {
            return true;
        }
        let continues = token.is_name()
            || token.is_ns_separator()
            || ["|", "&", "?", "..."].iter().any(|p| token.is_punct(p));
        if !continues {
            return false;
        }
        cursor = next;
    }
    false
}

fn is_return_type_colon(tokens: &TokenStream, colon: usize) -> bool {
    let Some(close) = tokens.prev_code(colon) else {
        return false;
    };
    if !tokens[close].is_punct(")") {
        return false;
    }
    let Some(open) = tokens.matching(close) else {
        return false;
    };
    if is_parameter_list(tokens, open) {
        return true;
    }

    // closure `use (...)` list between the parameters and the return type
    let Some(use_kw) = tokens.prev_code(open) else {
        return false;
    };
    if !tokens[use_kw].is_keyword("use") {
        return false;
    }
    tokens
        .prev_code(use_kw)
        .filter(|&params_close| tokens[params_close].is_punct(")"))
        .and_then(|params_close| tokens.matching(params_close))
        .is_some_and(|params_open| is_parameter_list(tokens, params_open))
}

/// The `function`/`fn` keyword owning the parameter list opened at `open`.
pub fn parameter_list_owner(tokens: &TokenStream, open: usize) -> Option<usize> {
    if !tokens[open].is_punct("(") {
        return None;
    }
    let mut cursor = tokens.prev_code(open)?;
    if tokens[cursor].is_name() {
        cursor = tokens.prev_code(cursor)?;
    }
    if tokens[cursor].is_punct("&") {
        cursor = tokens.prev_code(cursor)?;
    }
    tokens[cursor]
        .is_any_keyword(&["function", "fn"])
        .then_some(cursor)
}

pub fn is_parameter_list(tokens: &TokenStream, open: usize) -> bool {
    parameter_list_owner(tokens, open).is_some()
}

/// Name token of a named function declaration.
pub fn function_name(tokens: &TokenStream, function_kw: usize) -> Option<usize> {
    let mut next = tokens.next_code(function_kw)?;
    if tokens[next].is_punct("&") {
        next = tokens.next_code(next)?;
    }
    tokens[next].is_name().then_some(next)
}

/// Opening parenthesis of a function declaration's parameter list.
pub fn function_parameters_open(tokens: &TokenStream, function_kw: usize) -> Option<usize> {
    let mut next = tokens.next_code(function_kw)?;
    if tokens[next].is_punct("&") {
        next = tokens.next_code(next)?;
    }
    if tokens[next].is_name() {
        next = tokens.next_code(next)?;
    }
    tokens[next].is_punct("(").then_some(next)
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub first: usize,
    pub variable: usize,
    pub modifiers: Vec<usize>,
    pub has_type: bool,
    pub variadic: Option<usize>,
    pub default: Option<usize>,
}

impl Parameter {
    pub fn has_modifier(&self, tokens: &TokenStream, word: &str) -> bool {
        self.modifiers.iter().any(|&idx| tokens[idx].is_keyword(word))
    }

    pub fn is_promoted(&self) -> bool {
        !self.modifiers.is_empty()
    }
}

/// Parameters of the list opened at `open`, split on top-level commas.
pub fn parameters(tokens: &TokenStream, open: usize) -> Vec<Parameter> {
    let Some(close) = tokens.matching(open) else {
        return Vec::new();
    };

    let mut params = Vec::new();
    let mut segment: Vec<usize> = Vec::new();
    let mut idx = open + 1;
    while idx < close {
        let token = &tokens[idx];
        if token.is_punct(",") {
            params.extend(parse_parameter(tokens, &segment));
            segment.clear();
        } else if token.is_code() {
            segment.push(idx);
            let nested = ["(", "[", "{", "#["].iter().any(|p| token.is_punct(p));
            if nested {
                if let Some(end) = token.matching.filter(|&end| end < close) {
                    idx = end;
                }
            }
        }
        idx += 1;
    }
    params.extend(parse_parameter(tokens, &segment));
    params
}

fn parse_parameter(tokens: &TokenStream, segment: &[usize]) -> Option<Parameter> {
    let mut first = None;
    let mut modifiers = Vec::new();
    let mut has_type = false;
    let mut variadic = None;
    let mut variable = None;
    let mut default = None;

    for &idx in segment {
        let token = &tokens[idx];
        if variable.is_some() {
            if default.is_none() && token.is_punct("=") {
                default = Some(idx);
            }
            continue;
        }
        if token.is_punct("#[") {
            continue;
        }
        first.get_or_insert(idx);

        if token.is_any_keyword(PROMOTION_MODIFIERS) {
            modifiers.push(idx);
        } else if token.is_punct("...") {
            variadic = Some(idx);
        } else if token.is_variable() {
            variable = Some(idx);
        } else if token.is_name()
            || token.is_ns_separator()
            || token.is_punct("?")
            || token.is_punct("(")
        {
            has_type = true;
        }
    }

    Some(Parameter {
        first: first?,
        variable: variable?,
        modifiers,
        has_type,
        variadic,
        default,
    })
}

#[derive(Debug, Clone)]
pub struct ClassDeclaration {
    pub keyword: usize,
    pub name: Option<usize>,
    pub opener: usize,
    pub closer: usize,
    pub final_modifier: Option<usize>,
    pub abstract_modifier: Option<usize>,
    pub readonly_modifier: Option<usize>,
    pub extends: bool,
}

/// Header facts of the class declared by the `class` keyword at `keyword`.
pub fn class_declaration(tokens: &TokenStream, keyword: usize) -> Option<ClassDeclaration> {
    if !tokens[keyword].is_keyword("class") {
        return None;
    }
    if let Some(prev) = tokens.prev_code(keyword) {
        if tokens[prev].is_punct("::") {
            return None;
        }
    }

    let opener = tokens.scope_opener(keyword)?;
    let closer = tokens.matching(opener)?;
    let name = tokens
        .next_code(keyword)
        .filter(|&next| tokens[next].is_name());

    let mut final_modifier = None;
    let mut abstract_modifier = None;
    let mut readonly_modifier = None;
    let mut cursor = keyword;
    while let Some(prev) = tokens.prev_code(cursor) {
        let token = &tokens[prev];
        if token.is_keyword("final") {
            final_modifier = Some(prev);
        } else if token.is_keyword("abstract") {
            abstract_modifier = Some(prev);
        } else if token.is_keyword("readonly") {
            readonly_modifier = Some(prev);
        } else {
            break;
        }
        cursor = prev;
    }

    let extends = tokens
        .find_next(keyword + 1, opener, |token| token.is_keyword("extends"))
        .is_some();

    Some(ClassDeclaration {
        keyword,
        name,
        opener,
        closer,
        final_modifier,
        abstract_modifier,
        readonly_modifier,
        extends,
    })
}

#[derive(Debug, Clone)]
pub struct Property {
    pub variable: usize,
    pub visibility: Option<usize>,
    pub readonly: Option<usize>,
    pub is_static: bool,
    pub has_type: bool,
    pub promoted: bool,
}

/// Properties declared in the class-like body opened at `opener`, including
/// constructor-promoted parameters.
pub fn class_properties(tokens: &TokenStream, opener: usize) -> Vec<Property> {
    let Some(closer) = tokens.matching(opener) else {
        return Vec::new();
    };

    let mut properties = Vec::new();
    let mut cursor = opener;
    while let Some(start) = tokens.next_code(cursor) {
        if start >= closer {
            break;
        }
        cursor = scan_member(tokens, start, closer, &mut properties);
    }
    properties
}

fn scan_member(
    tokens: &TokenStream,
    start: usize,
    closer: usize,
    properties: &mut Vec<Property>,
) -> usize {
    let mut idx = start;
    let mut modifiers = Vec::new();
    loop {
        let token = &tokens[idx];
        if token.is_punct("#[") {
            let Some(end) = token.matching else {
                return closer;
            };
            idx = end;
        } else if token.is_any_keyword(MEMBER_MODIFIERS) {
            modifiers.push(idx);
        } else {
            break;
        }
        match tokens.next_code(idx) {
            Some(next) if next < closer => idx = next,
            _ => return closer,
        }
    }

    let token = &tokens[idx];
    if token.is_keyword("function") {
        collect_promoted(tokens, idx, properties);
        return skip_statement(tokens, idx, closer);
    }

    let starts_property = token.is_variable()
        || token.is_name()
        || token.is_ns_separator()
        || token.is_punct("?")
        || token.is_punct("(");
    if modifiers.is_empty() || !starts_property {
        return skip_statement(tokens, idx, closer);
    }

    let keyword = |word: &str| modifiers.iter().copied().find(|&m| tokens[m].is_keyword(word));
    let visibility = modifiers
        .iter()
        .copied()
        .find(|&m| tokens[m].is_any_keyword(VISIBILITY));
    let readonly = keyword("readonly");
    let is_static = keyword("static").is_some();

    let mut has_type = false;
    let mut expect_variable = true;
    let mut cursor = idx;
    while cursor < closer {
        let token = &tokens[cursor];
        if token.is_punct(";") {
            return cursor;
        }
        if token.is_punct(",") {
            expect_variable = true;
        } else if token.is_variable() && expect_variable {
            properties.push(Property {
                variable: cursor,
                visibility,
                readonly,
                is_static,
                has_type,
                promoted: false,
            });
            expect_variable = false;
        } else if token.is_code() && expect_variable {
            has_type = true;
        }

        let nested = ["(", "[", "{", "#["].iter().any(|p| token.is_punct(p));
        if nested && !(expect_variable && token.is_punct("(")) {
            cursor = token.matching.unwrap_or(closer);
        }
        cursor += 1;
    }
    closer
}

fn collect_promoted(tokens: &TokenStream, function_kw: usize, properties: &mut Vec<Property>) {
    let is_constructor = function_name(tokens, function_kw)
        .is_some_and(|name| tokens[name].text.eq_ignore_ascii_case("__construct"));
    if !is_constructor {
        return;
    }
    let Some(open) = function_parameters_open(tokens, function_kw) else {
        return;
    };

    for param in parameters(tokens, open) {
        if !param.is_promoted() {
            continue;
        }
        properties.push(Property {
            variable: param.variable,
            visibility: param
                .modifiers
                .iter()
                .copied()
                .find(|&m| tokens[m].is_any_keyword(VISIBILITY)),
            readonly: param
                .modifiers
                .iter()
                .copied()
                .find(|&m| tokens[m].is_keyword("readonly")),
            is_static: false,
            has_type: param.has_type,
            promoted: true,
        });
    }
}

/// Index of the `;` or closing `}` ending the statement starting at `idx`.
fn skip_statement(tokens: &TokenStream, idx: usize, closer: usize) -> usize {
    let mut cursor = idx;
    while cursor < closer {
        let token = &tokens[cursor];
        if token.is_punct(";") {
            return cursor;
        }
        if token.is_punct("{") {
            return token.matching.unwrap_or(closer);
        }
        if ["(", "[", "#["].iter().any(|p| token.is_punct(p)) {
            cursor = token.matching.unwrap_or(closer);
        }
        cursor += 1;
    }
    closer
}

/// Variable of the property declared right after `idx`, if the next code is one.
pub fn property_variable_after(tokens: &TokenStream, idx: usize) -> Option<usize> {
    let mut cursor = tokens.next_code(idx)?;
    let mut has_member_modifier = false;
    while tokens[cursor].is_any_keyword(PROPERTY_MODIFIERS) {
        has_member_modifier |= !tokens[cursor].is_keyword("static");
        cursor = tokens.next_code(cursor)?;
    }
    if !has_member_modifier {
        return None;
    }
    loop {
        let token = &tokens[cursor];
        if token.is_variable() {
            return Some(cursor);
        }
        let type_part = token.is_name()
            || token.is_ns_separator()
            || ["?", "|", "&", "(", ")"].iter().any(|p| token.is_punct(p));
        if !type_part {
            return None;
        }
        cursor = tokens.next_code(cursor)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rules::test_utils::parse_php;

    fn index_of(tokens: &TokenStream, text: &str, nth: usize) -> usize {
        tokens
            .iter()
            .filter(|(_, token)| token.text == text)
            .nth(nth)
            .map(|(idx, _)| idx)
            .unwrap_or_else(|| panic!("token {text:?} #{nth} not found"))
    }

    #[test]
    fn detects_parameter_return_and_property_types() {
        let source = r#"<?php
final class Service
{
    private ?Clock $clock;

    public function run(Input|Other $input, \App\Flag ...$flags): Result
    {
        $x = new Thing();
        return Factory::make(CONSTANT);
    }
}
"#;
        let parsed = parse_php(source);
        let tokens = &parsed.tokens;

        let context = |text: &str| type_declaration_context(tokens, index_of(tokens, text, 0));
        assert_eq!(context("Clock"), Some(TypeContext::Property));
        assert_eq!(context("Input"), Some(TypeContext::Parameter));
        assert_eq!(context("Other"), Some(TypeContext::Parameter));
        assert_eq!(context("Flag"), Some(TypeContext::Parameter));
        assert_eq!(context("Result"), Some(TypeContext::Return));
        assert_eq!(context("Thing"), None);
        assert_eq!(context("Factory"), None);
        assert_eq!(context("CONSTANT"), None);
    }

    #[test]
    fn closure_use_list_return_type() {
        let source = "<?php\n$f = function (int $a) use ($b): Outcome { return $b; };\n";
        let parsed = parse_php(source);
        let tokens = &parsed.tokens;
        let outcome = index_of(tokens, "Outcome", 0);
        assert_eq!(type_declaration_context(tokens, outcome), Some(TypeContext::Return));
    }

    #[test]
    fn parameters_report_defaults_and_variadics() {
        let source = "<?php\nfunction f(int $a, $b = [1, 2], string ...$rest) {}\n";
        let parsed = parse_php(source);
        let tokens = &parsed.tokens;
        let open = index_of(tokens, "(", 0);
        let params = parameters(tokens, open);

        assert_eq!(params.len(), 3);
        assert!(params[0].has_type);
        assert!(params[0].default.is_none());
        assert!(!params[1].has_type);
        assert!(params[1].default.is_some());
        assert!(params[2].variadic.is_some());
        assert_eq!(tokens[params[2].variable].text, "$rest");
    }

    #[test]
    fn class_properties_include_promoted_parameters() {
        let source = r#"<?php
final class Point
{
    public const ORIGIN = 0;
    private readonly int $x, $y;
    public static $count = 0;

    public function __construct(private readonly float $z, string $label)
    {
    }
}
"#;
        let parsed = parse_php(source);
        let tokens = &parsed.tokens;
        let class_kw = index_of(tokens, "class", 0);
        let class = class_declaration(tokens, class_kw).expect("class declaration");
        assert!(class.final_modifier.is_some());
        assert!(!class.extends);

        let properties = class_properties(tokens, class.opener);
        let names: Vec<&str> = properties
            .iter()
            .map(|p| tokens[p.variable].text.as_str())
            .collect();
        assert_eq!(names, vec!["$x", "$y", "$count", "$z"]);
        assert!(properties[0].readonly.is_some() && properties[0].has_type);
        assert!(properties[2].is_static && !properties[2].has_type);
        assert!(properties[3].promoted && properties[3].readonly.is_some());
    }
}
