//! Folding object-like macros into typed constants.
//!
//! Only macros whose replacement list is built from literals, punctuation and
//! previously accepted macros are translated; anything else would need a C
//! preprocessor to evaluate.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::ast::{Macro, Token, TokenKind};
use crate::session::Session;

/// Why a macro was not turned into a constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rejection {
    /// The macro has no replacement list.
    Empty,
    /// Names starting with `_` belong to the implementation.
    Reserved,
    /// `NAME(` with no space in between.
    FunctionLike,
    /// The replacement list contains a keyword.
    Keyword(String),
    /// The replacement list names something that is not an accepted macro.
    Unresolved(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => f.write_str("no replacement text"),
            Rejection::Reserved => f.write_str("reserved name"),
            Rejection::FunctionLike => f.write_str("function-like macro"),
            Rejection::Keyword(k) => write!(f, "uses keyword `{k}`"),
            Rejection::Unresolved(s) => write!(f, "references unknown symbol `{s}`"),
        }
    }
}

/// A macro that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FoldedMacro {
    pub(crate) name: String,
    pub(crate) value: String,
}

/// Validate a macro definition and expand the identifiers it uses.
///
/// The checks run in a fixed order and the first failing one decides the
/// rejection.
pub(crate) fn fold_macro(
    tokens: &[Token],
    symbols: &HashMap<String, String>,
) -> Result<FoldedMacro, Rejection> {
    let tokens = tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Comment)
        .collect::<Vec<_>>();

    let [name, first, ..] = tokens.as_slice() else {
        return Err(Rejection::Empty);
    };
    if name.spelling.starts_with('_') {
        return Err(Rejection::Reserved);
    }
    if first.spelling.starts_with('(') && name.end_column == first.start_column {
        return Err(Rejection::FunctionLike);
    }

    let mut expansion = Vec::with_capacity(tokens.len() - 1);
    for token in &tokens[1..] {
        match token.kind {
            TokenKind::Keyword => return Err(Rejection::Keyword(token.spelling.clone())),
            TokenKind::Identifier => match symbols.get(&token.spelling) {
                Some(value) => expansion.push(value.as_str()),
                None => return Err(Rejection::Unresolved(token.spelling.clone())),
            },
            _ => expansion.push(token.spelling.as_str()),
        }
    }

    Ok(FoldedMacro {
        name: name.spelling.clone(),
        value: expansion.join(" "),
    })
}

impl Session {
    /// Emit a macro as a constant if it can be folded.
    pub(crate) fn emit_macro(&mut self, definition: &Macro) {
        match fold_macro(&definition.tokens, &self.extant_symbols) {
            Ok(FoldedMacro { name, value }) => {
                self.out
                    .line(format!("public static let {name} = {value};"));
                self.extant_symbols.insert(name, value);
            }
            Err(reason) => {
                let name = definition
                    .tokens
                    .first()
                    .map_or("<empty>", |t| t.spelling.as_str());
                debug!("skipping macro `{name}`: {reason}");
            }
        }
    }
}
