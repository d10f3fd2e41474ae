use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use log::{debug, trace};

use crate::ast::{Decl, DeclKind, TranslationUnit};
use crate::emitter::EnumRules;
use crate::translator::Translator;

const INDENT: &str = "    ";

/// Indented line sink for the generated declarations.
#[derive(Debug, Default)]
pub(crate) struct Output {
    lines: Vec<String>,
    indent: usize,
    silent: bool,
}

impl Output {
    pub(crate) fn line(&mut self, text: impl AsRef<str>) {
        if !self.silent {
            self.lines
                .push(format!("{}{}", INDENT.repeat(self.indent), text.as_ref()));
        }
    }

    pub(crate) fn push_indent(&mut self) {
        self.indent += 1;
    }

    pub(crate) fn pop_indent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }
}

/// One generator run: every registry the translation needs, plus the output.
///
/// All state lives here rather than in globals, so independent runs never
/// observe each other.
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) translator: Translator,
    pub(crate) out: Output,
    pub(crate) enum_rules: EnumRules,
    /// Records and enums whose body has been emitted, plus every name that
    /// has been finalized in some other way.
    pub(crate) declared_types: HashSet<String>,
    /// Records seen only as `struct Foo;` so far.
    pub(crate) forward_declarations: IndexSet<String>,
    /// Validated macro replacement text by macro name.
    pub(crate) extant_symbols: HashMap<String, String>,
    silent: bool,
}

impl Session {
    pub(crate) fn new(enum_rules: EnumRules, byte_bool: bool) -> Self {
        Self {
            translator: Translator::new(byte_bool),
            out: Output::default(),
            enum_rules,
            declared_types: HashSet::new(),
            forward_declarations: IndexSet::new(),
            extant_symbols: HashMap::new(),
            silent: false,
        }
    }

    /// Indent every emitted line by `levels` on top of its nesting.
    pub(crate) fn with_base_indent(mut self, levels: usize) -> Self {
        self.out.indent = levels;
        self
    }

    pub(crate) fn allow_file(&mut self, path: PathBuf) {
        self.translator.allow_file(path);
    }

    /// Suppress all output while still populating the registries.
    pub(crate) fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
        self.out.silent = silent;
        self.translator.set_recording(!silent);
    }

    pub(crate) fn is_silent(&self) -> bool {
        self.silent
    }

    /// Emit every top-level declaration of `unit` that originates in `file`.
    pub(crate) fn emit_unit(&mut self, unit: &TranslationUnit, file: &Path) {
        for decl in &unit.decls {
            match decl.file.as_deref() {
                Some(origin) if normalize(origin) == file => self.emit_top_level(decl),
                _ => {}
            }
        }
    }

    /// Emit a top-level declaration together with every named tag declared
    /// inside it.
    ///
    /// C puts nested tag names into file scope, so they are hoisted out of
    /// their parent and handled as top-level declarations of their own.
    pub(crate) fn emit_top_level(&mut self, decl: &Decl) {
        let mut pending = VecDeque::from([decl]);
        while let Some(decl) = pending.pop_front() {
            self.emit_decl(decl, &mut pending);
        }
    }

    fn emit_decl<'d>(&mut self, decl: &'d Decl, pending: &mut VecDeque<&'d Decl>) {
        match &decl.kind {
            DeclKind::Record(record) => self.emit_record(decl, record, None, pending),
            DeclKind::Enum(enumeration) => self.emit_enum(decl, enumeration, None),
            DeclKind::Typedef(typedef) => self.emit_typedef(decl, typedef),
            DeclKind::Function(function) => self.emit_function(decl, function),
            DeclKind::Var(var) => self.emit_var(decl, var),
            DeclKind::Macro(definition) => self.emit_macro(definition),
            DeclKind::Field(_) => trace!("ignoring stray field {:?}", decl.name),
        }
    }

    /// Reconcile forward declarations and synthesize declarations for every
    /// foreign type the output refers to.
    pub(crate) fn finish(&mut self) {
        let forward = std::mem::take(&mut self.forward_declarations);
        for name in forward {
            if self.declared_types.insert(name.clone()) {
                debug!("emitting opaque declaration for `{name}`");
                self.out.line(format!("public struct {name};"));
            }
        }

        while let Some(ty) = self.translator.pop_missing() {
            let name = ty.clean_spelling();
            if self.declared_types.contains(&name) {
                continue;
            }
            self.declared_types.insert(name.clone());

            let canonical = ty.canonical();
            let canonical_name = canonical.clean_spelling();
            let undefined = canonical
                .declaration
                .as_ref()
                .is_some_and(|decl| !decl.is_definition);
            if undefined || name == canonical_name {
                debug!("backfilling `{name}` as an opaque struct");
                self.out.line(format!("public struct {name};"));
            } else {
                let target = self.translator.translate_type(canonical);
                debug!("backfilling `{name}` as an alias of `{target}`");
                self.out.line(format!("public typealias {name} = {target};"));
            }
        }
    }

    /// The emitted declarations, one per line.
    pub(crate) fn into_body(self) -> String {
        self.out.lines.join("\n")
    }
}

/// Resolve `path` to the form front-ends report declaration files in.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
