//! The declaration model a C front-end hands to the generator.
//!
//! Everything in here is owned and immutable once built: a [`Frontend`] lowers
//! its parser's AST into these types and the engine only ever reads them.
//!
//! [`Frontend`]: crate::Frontend

use std::path::{Path, PathBuf};

/// Identity of a declaration inside one translation unit.
///
/// Types refer back to the declaration that introduced them through this id,
/// which is how an anonymous nested aggregate is matched with the field that
/// uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

/// C builtin types, by the kind the front-end reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Builtin {
    Void,
    Bool,
    CharS,
    CharU,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Int128,
    UInt128,
    Char16,
    Char32,
    WCharS,
    WCharU,
    Half,
    Float,
    Double,
    LongDouble,
}

impl Builtin {
    /// The C spelling of the builtin.
    pub fn c_name(self) -> &'static str {
        match self {
            Builtin::Void => "void",
            Builtin::Bool => "_Bool",
            Builtin::CharS | Builtin::CharU => "char",
            Builtin::SChar => "signed char",
            Builtin::UChar => "unsigned char",
            Builtin::Short => "short",
            Builtin::UShort => "unsigned short",
            Builtin::Int => "int",
            Builtin::UInt => "unsigned int",
            Builtin::Long => "long",
            Builtin::ULong => "unsigned long",
            Builtin::LongLong => "long long",
            Builtin::ULongLong => "unsigned long long",
            Builtin::Int128 => "__int128",
            Builtin::UInt128 => "unsigned __int128",
            Builtin::Char16 => "char16_t",
            Builtin::Char32 => "char32_t",
            Builtin::WCharS | Builtin::WCharU => "wchar_t",
            Builtin::Half => "_Float16",
            Builtin::Float => "float",
            Builtin::Double => "double",
            Builtin::LongDouble => "long double",
        }
    }

    /// Size in bytes on an LP64 target.
    ///
    /// Only used when the front-end did not report a size.
    pub fn default_size(self) -> u64 {
        match self {
            Builtin::Void => 0,
            Builtin::Bool | Builtin::CharS | Builtin::CharU | Builtin::SChar | Builtin::UChar => 1,
            Builtin::Short | Builtin::UShort | Builtin::Char16 | Builtin::Half => 2,
            Builtin::Int
            | Builtin::UInt
            | Builtin::Char32
            | Builtin::WCharS
            | Builtin::WCharU
            | Builtin::Float => 4,
            Builtin::Long
            | Builtin::ULong
            | Builtin::LongLong
            | Builtin::ULongLong
            | Builtin::Double => 8,
            Builtin::Int128 | Builtin::UInt128 | Builtin::LongDouble => 16,
        }
    }

    /// Whether this is an integer kind, and if so whether it is signed.
    ///
    /// `Char16` and `Char32` count as signed.
    pub fn integer_signedness(self) -> Option<bool> {
        match self {
            Builtin::CharS
            | Builtin::SChar
            | Builtin::Short
            | Builtin::Int
            | Builtin::Long
            | Builtin::LongLong
            | Builtin::Int128
            | Builtin::Char16
            | Builtin::Char32
            | Builtin::WCharS => Some(true),
            Builtin::CharU
            | Builtin::UChar
            | Builtin::UShort
            | Builtin::UInt
            | Builtin::ULong
            | Builtin::ULongLong
            | Builtin::UInt128
            | Builtin::WCharU => Some(false),
            _ => None,
        }
    }
}

/// The structural kind of a [`Type`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// A builtin scalar.
    Builtin(Builtin),
    /// A pointer to the boxed type.
    Pointer(Box<Type>),
    /// `T[N]`.
    ConstantArray(Box<Type>, u64),
    /// `T[]`.
    IncompleteArray(Box<Type>),
    /// A function type, with or without prototype.
    Function,
    /// A struct or union.
    Record,
    /// An enum.
    Enum,
    /// A typedef name.
    Typedef,
    /// Anything the front-end could not classify.
    Other,
}

/// Back reference from a type to the declaration that introduced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclRef {
    /// Identity of the declaration.
    pub id: DeclId,
    /// The declared name, `None` for anonymous tags.
    pub name: Option<String>,
    /// The file the declaration lives in.
    pub file: Option<PathBuf>,
    /// Whether the declaration is a complete definition.
    pub is_definition: bool,
}

impl DeclRef {
    /// A reference to a complete, named declaration in `file`.
    pub fn new(id: DeclId, name: Option<&str>, file: Option<&Path>) -> Self {
        Self {
            id,
            name: name.map(str::to_string),
            file: file.map(Path::to_path_buf),
            is_definition: true,
        }
    }

    /// Marks the referenced declaration as a forward declaration only.
    pub fn incomplete(mut self) -> Self {
        self.is_definition = false;
        self
    }
}

/// A source type as reported by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    /// Structural kind.
    pub kind: TypeKind,
    /// The C spelling, e.g. `const char *` or `struct Foo`.
    pub spelling: String,
    /// Whether the outermost level is `const`.
    pub is_const: bool,
    /// Size in bytes; `None` for incomplete types.
    pub size: Option<u64>,
    /// Alignment in bytes; `None` for incomplete types.
    pub align: Option<u64>,
    /// The fully desugared type, when it differs from this one.
    pub canonical: Option<Box<Type>>,
    /// The declaration of a record, enum or typedef type.
    pub declaration: Option<DeclRef>,
}

const TAG_KEYWORDS: [&str; 3] = ["struct", "enum", "union"];

impl Type {
    fn with_kind(kind: TypeKind, spelling: String) -> Self {
        Self {
            kind,
            spelling,
            is_const: false,
            size: None,
            align: None,
            canonical: None,
            declaration: None,
        }
    }

    /// A builtin type with its LP64 size and alignment.
    pub fn builtin(builtin: Builtin) -> Self {
        let size = builtin.default_size();
        let mut ty = Self::with_kind(TypeKind::Builtin(builtin), builtin.c_name().to_string());
        if size > 0 {
            ty.size = Some(size);
            ty.align = Some(size);
        }
        ty
    }

    /// A pointer to `pointee`.
    pub fn pointer(pointee: Type) -> Self {
        let spelling = if pointee.spelling.ends_with('*') {
            format!("{}*", pointee.spelling)
        } else {
            format!("{} *", pointee.spelling)
        };
        let mut ty = Self::with_kind(TypeKind::Pointer(Box::new(pointee)), spelling);
        ty.size = Some(8);
        ty.align = Some(8);
        ty
    }

    /// A pointer to a function, spelled like `int (*)(int)`.
    pub fn function_pointer(spelling: &str) -> Self {
        let mut function = Self::with_kind(TypeKind::Function, spelling.replace("(*)", ""));
        function.size = Some(1);
        let mut ty = Self::pointer(function);
        ty.spelling = spelling.to_string();
        ty
    }

    /// `element[len]`.
    pub fn constant_array(element: Type, len: u64) -> Self {
        let spelling = format!("{} [{len}]", element.spelling);
        let size = element.size.map(|s| s * len);
        let align = element.align;
        let mut ty = Self::with_kind(TypeKind::ConstantArray(Box::new(element), len), spelling);
        ty.size = size;
        ty.align = align;
        ty
    }

    /// `element[]`.
    pub fn incomplete_array(element: Type) -> Self {
        let spelling = format!("{} []", element.spelling);
        Self::with_kind(TypeKind::IncompleteArray(Box::new(element)), spelling)
    }

    /// A struct or union type spelled `spelling`, declared by `decl`.
    pub fn record(spelling: &str, decl: DeclRef, size: u64, align: u64) -> Self {
        let mut ty = Self::with_kind(TypeKind::Record, spelling.to_string());
        if decl.is_definition {
            ty.size = Some(size);
            ty.align = Some(align);
        }
        ty.declaration = Some(decl);
        ty
    }

    /// An enum type whose values are stored as `integer`.
    pub fn enumeration(spelling: &str, decl: DeclRef, integer: &Type) -> Self {
        let mut ty = Self::with_kind(TypeKind::Enum, spelling.to_string());
        ty.size = integer.size;
        ty.align = integer.align;
        ty.declaration = Some(decl);
        ty
    }

    /// A typedef name aliasing `underlying`.
    pub fn typedef(decl: DeclRef, underlying: &Type) -> Self {
        let name = decl.name.clone().unwrap_or_default();
        let mut ty = Self::with_kind(TypeKind::Typedef, name);
        ty.size = underlying.size;
        ty.align = underlying.align;
        ty.canonical = Some(Box::new(underlying.canonical().clone()));
        ty.declaration = Some(decl);
        ty
    }

    /// The same type with a top-level `const` qualifier.
    pub fn constified(mut self) -> Self {
        if !self.is_const {
            self.is_const = true;
            self.spelling = if self.spelling.ends_with('*') {
                format!("{}const", self.spelling)
            } else {
                format!("const {}", self.spelling)
            };
        }
        self
    }

    /// The canonical form of this type; the type itself when already canonical.
    pub fn canonical(&self) -> &Type {
        self.canonical.as_deref().unwrap_or(self)
    }

    /// The type reached by peeling off every pointer and array level.
    pub fn innermost(&self) -> &Type {
        match &self.kind {
            TypeKind::Pointer(inner)
            | TypeKind::ConstantArray(inner, _)
            | TypeKind::IncompleteArray(inner) => inner.innermost(),
            _ => self,
        }
    }

    /// The file the type's declaration lives in, if it has one.
    pub fn declaring_file(&self) -> Option<&Path> {
        self.declaration.as_ref()?.file.as_deref()
    }

    /// The spelling without `struct`, `enum`, `union` and `const` keywords.
    pub fn clean_spelling(&self) -> String {
        strip_words(&self.spelling, &["struct", "enum", "union", "const"])
    }

    /// The spelling without elaborated tag keywords, qualifiers kept.
    pub fn untagged_spelling(&self) -> String {
        strip_words(&self.spelling, &TAG_KEYWORDS)
    }
}

pub(crate) fn strip_words(spelling: &str, words: &[&str]) -> String {
    spelling
        .split_whitespace()
        .filter(|part| !words.contains(part))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a record is a struct or a union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RecordKind {
    Struct,
    Union,
}

/// A struct or union declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Struct or union.
    pub kind: RecordKind,
    /// The type this declaration introduces.
    pub ty: Type,
    /// `false` for `struct Foo;`.
    pub is_definition: bool,
    /// Nested tag declarations and fields, in source order.
    pub members: Vec<Decl>,
}

/// A single enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    /// The enumerator name.
    pub name: String,
    /// Its value.
    pub value: i128,
}

impl EnumConstant {
    /// An enumerator called `name` with `value`.
    pub fn new(name: &str, value: i128) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

/// An enum declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    /// The type this declaration introduces.
    pub ty: Type,
    /// The integer type values are stored in.
    pub integer_type: Type,
    /// Enumerators in declaration order.
    pub constants: Vec<EnumConstant>,
}

/// A record member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Declared type.
    pub ty: Type,
    /// Width in bits for bit-fields.
    pub bit_width: Option<u32>,
}

/// A typedef declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typedef {
    /// The typedef name as a type.
    pub ty: Type,
    /// The aliased type.
    pub underlying: Type,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name, if any.
    pub name: Option<String>,
    /// Parameter type.
    pub ty: Type,
}

impl Param {
    /// A parameter called `name`.
    pub fn new(name: &str, ty: Type) -> Self {
        Self {
            name: Some(name.to_string()),
            ty,
        }
    }
}

/// A function prototype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Return type.
    pub result: Type,
    /// Named parameters; a trailing `...` is reported through `is_variadic`.
    pub params: Vec<Param>,
    /// Whether the prototype ends in `...`.
    pub is_variadic: bool,
}

/// A global variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Var {
    /// Declared type.
    pub ty: Type,
    /// The integer literal the variable is initialized with, if any.
    pub init: Option<String>,
}

/// Lexical class of a macro token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TokenKind {
    Punctuation,
    Keyword,
    Identifier,
    Literal,
    Comment,
}

/// A raw token of a macro definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lexical class.
    pub kind: TokenKind,
    /// Source text.
    pub spelling: String,
    /// Column the token starts at.
    pub start_column: u32,
    /// Column just past the token's end.
    pub end_column: u32,
}

impl Token {
    /// A token starting at `column`, ending after its spelling.
    pub fn new(kind: TokenKind, spelling: &str, column: u32) -> Self {
        let len = u32::try_from(spelling.len()).unwrap_or(u32::MAX);
        Self {
            kind,
            spelling: spelling.to_string(),
            start_column: column,
            end_column: column.saturating_add(len),
        }
    }
}

/// An object- or function-like macro definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    /// The name token followed by the replacement list.
    pub tokens: Vec<Token>,
}

/// What a declaration declares.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum DeclKind {
    Record(Record),
    Enum(Enum),
    Field(Field),
    Typedef(Typedef),
    Function(Function),
    Var(Var),
    Macro(Macro),
}

/// A declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    /// Identity, referenced from [`DeclRef::id`].
    pub id: DeclId,
    /// Declared name; `None` for anonymous tags and unnamed bit-fields.
    pub name: Option<String>,
    /// The file the declaration appears in.
    pub file: Option<PathBuf>,
    /// What is declared.
    pub kind: DeclKind,
}

impl Decl {
    /// A declaration without a location.
    pub fn new(id: DeclId, name: Option<&str>, kind: DeclKind) -> Self {
        Self {
            id,
            name: name.map(str::to_string),
            file: None,
            kind,
        }
    }

    /// Places the declaration in `file`.
    pub fn in_file<P: AsRef<Path>>(mut self, file: P) -> Self {
        self.file = Some(file.as_ref().to_path_buf());
        self
    }

    /// Whether this declares a tag without a name.
    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }
}

/// The top-level declarations of one parsed header, in parser order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationUnit {
    /// Top-level declarations, including those pulled in from other files.
    pub decls: Vec<Decl>,
}
