//! Emitters for enums, typedefs, functions and constant globals.

use log::debug;
use regex::Regex;

use crate::Result;
use crate::ast::{Decl, Enum, EnumConstant, Function, Type, Typedef, Var, strip_words};
use crate::session::Session;

/// Names `va_list` goes by, before and after typedef resolution.
const VA_LIST_NAMES: [&str; 5] = [
    "va_list",
    "__gnuc_va_list",
    "__builtin_va_list",
    "__va_list_tag",
    "__va_list",
];

fn is_va_list(ty: &Type) -> bool {
    let canonical = ty.canonical();
    [ty, canonical, canonical.innermost()]
        .into_iter()
        .any(|ty| VA_LIST_NAMES.contains(&ty.clean_spelling().as_str()))
}

/// Rewrites applied to enum names and cases.
#[derive(Debug, Clone, Default)]
pub(crate) struct EnumRules {
    unscoped: Vec<Regex>,
    remove_prefixes: Vec<Regex>,
    remove_cases: Vec<Regex>,
    fallback_prefix: String,
}

impl EnumRules {
    /// Compile the user supplied patterns.
    ///
    /// `unscoped` and `remove_cases` must match whole names, prefix patterns
    /// may match anywhere inside the common prefix.
    pub(crate) fn new(
        unscoped: &[String],
        remove_prefixes: &[String],
        remove_cases: &[String],
        fallback_prefix: &str,
    ) -> Result<Self> {
        let anchored = |p: &String| Regex::new(&format!("^(?:{p})$"));
        Ok(Self {
            unscoped: unscoped.iter().map(anchored).collect::<Result<_, _>>()?,
            remove_prefixes: remove_prefixes
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<_, _>>()?,
            remove_cases: remove_cases.iter().map(anchored).collect::<Result<_, _>>()?,
            fallback_prefix: fallback_prefix.to_string(),
        })
    }

    pub(crate) fn is_unscoped(&self, name: &str) -> bool {
        self.unscoped.iter().any(|re| re.is_match(name))
    }

    /// Drop unwanted cases and strip the removable part of their common prefix.
    pub(crate) fn rewrite_cases(&self, constants: &[EnumConstant]) -> Vec<(String, i128)> {
        let mut cases: Vec<(String, i128)> = constants
            .iter()
            .filter(|c| !self.remove_cases.iter().any(|re| re.is_match(&c.name)))
            .map(|c| (c.name.clone(), c.value))
            .collect();

        let Some(prefix) = common_prefix(cases.iter().map(|(name, _)| name.as_str())) else {
            return cases;
        };

        // The longest match wins; among equally long ones the first pattern.
        let mut removal = (0, 0);
        for re in &self.remove_prefixes {
            if let Some(m) = re.find(prefix) {
                if m.len() > removal.1 {
                    removal = (m.start(), m.len());
                }
            }
        }
        let (start, len) = removal;
        if len == 0 {
            return cases;
        }

        for (name, _) in &mut cases {
            // Removing the whole name would leave nothing to call the case.
            if len == name.len() {
                continue;
            }
            let stripped = format!("{}{}", &name[..start], &name[start + len..]);
            if stripped.starts_with(|c: char| c.is_ascii_digit()) {
                if !self.fallback_prefix.is_empty() {
                    *name = format!("{}{stripped}", self.fallback_prefix);
                }
            } else {
                *name = stripped;
            }
        }
        cases
    }
}

/// The longest prefix shared by every name, `None` when there are no names.
fn common_prefix<'a>(mut names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut prefix = names.next()?;
    for name in names {
        let shared = prefix
            .char_indices()
            .zip(name.chars())
            .find(|((_, a), b)| a != b)
            .map(|((i, _), _)| i)
            .unwrap_or_else(|| prefix.len().min(name.len()));
        prefix = &prefix[..shared];
    }
    Some(prefix)
}

impl Session {
    /// Emit an enum once per name.
    ///
    /// `synthetic_name` is given for anonymous enums nested in a record. A
    /// completely anonymous top-level enum only contributes its cases, as
    /// global constants.
    pub(crate) fn emit_enum(&mut self, decl: &Decl, enumeration: &Enum, synthetic_name: Option<&str>) {
        let underlying = self.translator.translate_type(&enumeration.integer_type);
        let cases = self.enum_rules.rewrite_cases(&enumeration.constants);

        let Some(name) = synthetic_name.or(decl.name.as_deref()) else {
            for (case, value) in cases {
                self.out
                    .line(format!("public static const {underlying} {case} = {value};"));
            }
            return;
        };

        if synthetic_name.is_none() && !self.declared_types.insert(name.to_string()) {
            return;
        }

        if self.enum_rules.is_unscoped(name) {
            self.out.line("[UnscopedEnum]");
        }
        self.out.line(format!("public enum {name} : {underlying} {{"));
        self.out.push_indent();
        for (case, value) in cases {
            self.out.line(format!("{case} = {value},"));
        }
        self.out.pop_indent();
        self.out.line("};");
    }

    /// Emit a typedef unless it merely restates a tag name.
    pub(crate) fn emit_typedef(&mut self, decl: &Decl, typedef: &Typedef) {
        let name = decl.name.clone().unwrap_or_else(|| typedef.ty.spelling.clone());
        if self.declared_types.contains(&name) {
            return;
        }
        // `typedef struct Foo Foo;` says nothing new.
        if typedef.underlying.untagged_spelling() == name {
            return;
        }
        let target = self.translator.translate_type(&typedef.underlying);
        self.out.line(format!("public typealias {name} = {target};"));
        self.declared_types.insert(name);
    }

    /// Emit a function prototype, unless it takes variable arguments.
    pub(crate) fn emit_function(&mut self, decl: &Decl, function: &Function) {
        let Some(name) = decl.name.as_deref() else {
            return;
        };
        let takes_va_list = function.params.iter().any(|param| is_va_list(&param.ty));
        if function.is_variadic || takes_va_list {
            debug!("skipping variadic function `{name}`");
            return;
        }

        let params = function
            .params
            .iter()
            .map(|param| {
                let ty = self.translator.translate_type(&param.ty);
                match &param.name {
                    Some(name) => format!("{ty} {name}"),
                    None => ty,
                }
            })
            .collect::<Vec<_>>();
        let result = self.translator.translate_type(&function.result);
        self.out.line(format!(
            "public __extern_cpp {result} {name}({});",
            params.join(", ")
        ));
    }

    /// Emit a `const` global initialized with an integer literal.
    pub(crate) fn emit_var(&mut self, decl: &Decl, var: &Var) {
        let Some(name) = decl.name.as_deref() else {
            return;
        };
        let (true, Some(value)) = (var.ty.is_const, var.init.as_deref()) else {
            debug!("skipping non-constant global `{name}`");
            return;
        };
        let ty = self.translator.translate_type(&var.ty);
        let ty = strip_words(&ty, &["struct", "enum", "union", "const"]);
        self.out
            .line(format!("public static const {ty} {name} = {value};"));
    }
}
