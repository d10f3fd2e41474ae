use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use log::trace;

use crate::ast::{Builtin, DeclId, Type, TypeKind};

/// Type spellings that never need a synthesized declaration.
const SAFE_TYPES: [&str; 15] = [
    "int8_t",
    "uint8_t",
    "int16_t",
    "uint16_t",
    "int32_t",
    "uint32_t",
    "int64_t",
    "uint64_t",
    "size_t",
    "uintptr_t",
    "wchar_t",
    "long",
    "unsigned long",
    "_Bool",
    "FILE",
];

/// Alias handed out for `const char *`.
pub(crate) const NATIVE_STRING: &str = "NativeString";

#[derive(Debug)]
/// A C to Slang type translator.
///
/// Besides spelling types, the translator keeps the books on which types the
/// output can name without declaring them, and which foreign types still owe
/// a declaration.
pub(crate) struct Translator {
    safe_types: HashSet<String>,
    missing_types: Vec<Type>,
    allowed_files: HashSet<PathBuf>,
    anonymous_scopes: Vec<HashMap<DeclId, String>>,
    byte_bool: bool,
    recording: bool,
}

impl Translator {
    /// Create a new translator.
    pub(crate) fn new(byte_bool: bool) -> Self {
        Self {
            safe_types: SAFE_TYPES.iter().map(|s| s.to_string()).collect(),
            missing_types: Vec::new(),
            allowed_files: HashSet::new(),
            anonymous_scopes: Vec::new(),
            byte_bool,
            recording: true,
        }
    }

    /// Mark declarations from `path` as emitted locally.
    pub(crate) fn allow_file(&mut self, path: PathBuf) {
        self.allowed_files.insert(path);
    }

    /// Toggle whether foreign types are queued for backfilling.
    pub(crate) fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    /// Make synthetic names for anonymous declarations visible while
    /// translating member types.
    pub(crate) fn push_anonymous_scope(&mut self, names: HashMap<DeclId, String>) {
        self.anonymous_scopes.push(names);
    }

    pub(crate) fn pop_anonymous_scope(&mut self) {
        self.anonymous_scopes.pop();
    }

    /// Take the most recently queued foreign type.
    pub(crate) fn pop_missing(&mut self) -> Option<Type> {
        self.missing_types.pop()
    }

    #[cfg(test)]
    pub(crate) fn missing_types(&self) -> &[Type] {
        &self.missing_types
    }

    /// Record that `ty` is used by the output.
    ///
    /// A type seen for the first time whose declaration lives outside the
    /// requested headers is queued so that a declaration can be synthesized
    /// for it once every header has been processed.
    pub(crate) fn ensure_type(&mut self, ty: &Type) {
        if self.safe_types.contains(&ty.spelling) {
            return;
        }
        if let Some(unqualified) = ty.spelling.strip_prefix("const ") {
            if self.safe_types.contains(unqualified) {
                self.safe_types.insert(ty.spelling.clone());
                return;
            }
        }
        if let Some(file) = ty.declaring_file() {
            if self.recording && !self.allowed_files.contains(file) {
                trace!("queueing foreign type `{}` from {}", ty.spelling, file.display());
                self.missing_types.push(ty.clone());
            }
        }
        self.safe_types.insert(ty.spelling.clone());
    }

    /// Translate a C type into its Slang spelling.
    pub(crate) fn translate_type(&mut self, ty: &Type) -> String {
        self.translate(ty, false)
    }

    fn translate(&mut self, ty: &Type, omit_const: bool) -> String {
        self.ensure_type(ty);

        if ty.spelling == "const char *" || ty.spelling == "const char *const" {
            return NATIVE_STRING.to_string();
        }

        let qualifier = if ty.is_const && !omit_const {
            "const "
        } else {
            ""
        };

        if let Some(known) = self.translate_known_typedef(ty) {
            return format!("{qualifier}{known}");
        }

        match &ty.kind {
            // Function pointers are not callable from the bindings, only
            // passed around.
            TypeKind::Function => "void".to_string(),
            TypeKind::Builtin(builtin) => {
                format!("{qualifier}{}", self.translate_builtin(*builtin, ty.size))
            }
            // Slang has no qualified pointees.
            TypeKind::Pointer(pointee) => format!("Ptr<{}>", self.translate(pointee, true)),
            TypeKind::IncompleteArray(element) => format!("Ptr<{}>", self.translate(element, true)),
            TypeKind::ConstantArray(element, len) => {
                format!("{}[{len}]", self.translate(element, omit_const))
            }
            TypeKind::Record | TypeKind::Enum => match self.anonymous_name(ty) {
                Some(name) => format!("{qualifier}{name}"),
                None => self.translate_named(ty, omit_const),
            },
            TypeKind::Typedef | TypeKind::Other => self.translate_named(ty, omit_const),
        }
    }

    fn translate_named(&self, ty: &Type, omit_const: bool) -> String {
        if omit_const {
            ty.clean_spelling()
        } else {
            ty.untagged_spelling()
        }
    }

    fn anonymous_name(&self, ty: &Type) -> Option<String> {
        let id = ty.declaration.as_ref()?.id;
        self.anonymous_scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&id))
            .cloned()
    }

    /// Translate well known typedefs from the C standard library.
    fn translate_known_typedef(&self, ty: &Type) -> Option<String> {
        if ty.kind != TypeKind::Typedef {
            return None;
        }
        let name = ty.clean_spelling();
        match name.as_str() {
            "int8_t" | "uint8_t" | "int16_t" | "uint16_t" | "int32_t" | "uint32_t" | "int64_t"
            | "uint64_t" | "intptr_t" | "uintptr_t" | "FILE" => Some(name),
            "size_t" | "ssize_t" | "ptrdiff_t" | "wchar_t" => {
                let canonical = ty.canonical();
                match canonical.kind {
                    TypeKind::Builtin(builtin) => {
                        Some(self.translate_builtin(builtin, canonical.size.or(ty.size)))
                    }
                    _ => Some(name),
                }
            }
            _ => None,
        }
    }

    /// Translate a C builtin into its fixed width Slang equivalent.
    fn translate_builtin(&self, builtin: Builtin, size: Option<u64>) -> String {
        match builtin {
            Builtin::Bool if self.byte_bool => "uint8_t".to_string(),
            Builtin::Bool => "bool".to_string(),
            Builtin::Void => "void".to_string(),
            Builtin::Half => "half".to_string(),
            Builtin::Float => "float".to_string(),
            Builtin::Double => "double".to_string(),
            Builtin::LongDouble => "long double".to_string(),
            integer => {
                let signed = integer.integer_signedness().unwrap_or(true);
                sized_integer(size.unwrap_or_else(|| integer.default_size()), signed)
            }
        }
    }
}

/// The Slang integer type `bytes` wide.
pub(crate) fn sized_integer(bytes: u64, signed: bool) -> String {
    let bits = match bytes {
        1 => 8,
        2 => 16,
        4 => 32,
        _ => 64,
    };
    if signed {
        format!("int{bits}_t")
    } else {
        format!("uint{bits}_t")
    }
}
