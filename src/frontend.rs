//! The seam between the generator and a C parser.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ast::TranslationUnit;
use crate::{Error, Result};

/// Settings forwarded to the C preprocessor and parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// `NAME` or `NAME=VALUE` definitions.
    pub defines: Vec<String>,
    /// Additional header search paths.
    pub include_dirs: Vec<PathBuf>,
    /// The target to parse for; the host when unset.
    pub target: Option<String>,
}

impl ParseOptions {
    /// The options spelled as compiler command line arguments.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(target) = &self.target {
            args.push(format!("--target={target}"));
        }
        args.extend(self.defines.iter().map(|d| format!("-D{d}")));
        args.extend(self.include_dirs.iter().map(|d| format!("-I{}", d.display())));
        args
    }
}

/// A C parser that lowers a header into the [`ast`](crate::ast) model.
///
/// Any failure to parse is fatal to the run; the generator never tries to
/// emit partial output.
pub trait Frontend {
    /// Parse `header` and return every top-level declaration it sees,
    /// including those from included files.
    fn parse(&mut self, header: &Path, options: &ParseOptions) -> Result<TranslationUnit>;
}

/// A front-end serving pre-built translation units.
///
/// Useful when the declarations come from somewhere other than a C parser,
/// and for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFrontend {
    units: HashMap<PathBuf, TranslationUnit>,
}

impl InMemoryFrontend {
    /// Creates an empty front-end.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `unit` whenever `header` is parsed.
    pub fn insert<P: AsRef<Path>>(&mut self, header: P, unit: TranslationUnit) -> &mut Self {
        self.units.insert(header.as_ref().to_path_buf(), unit);
        self
    }
}

impl Frontend for InMemoryFrontend {
    fn parse(&mut self, header: &Path, _options: &ParseOptions) -> Result<TranslationUnit> {
        self.units
            .get(header)
            .cloned()
            .ok_or_else(|| Error::Frontend {
                header: header.to_path_buf(),
                message: "no such header".to_string(),
            })
    }
}

/// The front-end used by the command line tool.
#[cfg(feature = "libclang")]
pub fn system_frontend() -> Result<Box<dyn Frontend>> {
    Ok(Box::new(clang_frontend::ClangFrontend::new()?))
}

/// The front-end used by the command line tool.
#[cfg(not(feature = "libclang"))]
pub fn system_frontend() -> Result<Box<dyn Frontend>> {
    Err(Error::Unsupported(
        "parsing C headers requires building with the `libclang` feature".to_string(),
    ))
}

#[cfg(feature = "libclang")]
pub use clang_frontend::ClangFrontend;

#[cfg(feature = "libclang")]
mod clang_frontend {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    use clang::token::TokenKind as ClangTokenKind;
    use clang::{
        Clang, Entity, EntityKind, EvaluationResult, Index, TypeKind as ClangTypeKind,
        diagnostic::Severity,
    };
    use log::info;

    use super::{Frontend, ParseOptions};
    use crate::ast::{
        Builtin, Decl, DeclId, DeclKind, DeclRef, Enum, EnumConstant, Field, Function, Macro,
        Param, Record, RecordKind, Token, TokenKind, TranslationUnit, Type, TypeKind, Typedef,
        Var,
    };
    use crate::session::normalize;
    use crate::{Error, Result};

    /// Parses headers with libclang, loaded at runtime.
    pub struct ClangFrontend {
        clang: Clang,
    }

    impl std::fmt::Debug for ClangFrontend {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ClangFrontend").finish_non_exhaustive()
        }
    }

    impl ClangFrontend {
        /// Load libclang. Only one instance may exist at a time.
        pub fn new() -> Result<Self> {
            let clang = Clang::new().map_err(|message| Error::Frontend {
                header: PathBuf::new(),
                message,
            })?;
            Ok(Self { clang })
        }
    }

    impl Frontend for ClangFrontend {
        fn parse(&mut self, header: &Path, options: &ParseOptions) -> Result<TranslationUnit> {
            let fail = |message: String| Error::Frontend {
                header: header.to_path_buf(),
                message,
            };

            info!("parsing {}", header.display());
            let index = Index::new(&self.clang, false, false);
            let args = options.to_args();
            let tu = index
                .parser(header)
                .arguments(&args[..])
                .detailed_preprocessing_record(true)
                .incomplete(true)
                .skip_function_bodies(true)
                .parse()
                .map_err(|e| fail(e.to_string()))?;

            if let Some(diagnostic) = tu
                .get_diagnostics()
                .into_iter()
                .find(|d| matches!(d.get_severity(), Severity::Error | Severity::Fatal))
            {
                return Err(fail(diagnostic.get_text()));
            }

            let mut lowering = Lowering::default();
            let decls = tu
                .get_entity()
                .get_children()
                .into_iter()
                .filter_map(|entity| lowering.decl(entity))
                .collect();
            Ok(TranslationUnit { decls })
        }
    }

    /// Converts libclang entities into the owned model, numbering
    /// declarations as they are met.
    #[derive(Default)]
    struct Lowering<'tu> {
        ids: HashMap<Entity<'tu>, DeclId>,
    }

    impl<'tu> Lowering<'tu> {
        fn id(&mut self, entity: Entity<'tu>) -> DeclId {
            let key = entity.get_canonical_entity();
            let next = DeclId(self.ids.len() as u32);
            *self.ids.entry(key).or_insert(next)
        }

        fn file(entity: Entity<'tu>) -> Option<PathBuf> {
            let file = entity.get_location()?.get_file_location().file?;
            Some(normalize(&file.get_path()))
        }

        /// The name of a declaration; anonymous tags have none, unless a
        /// typedef gave the tag its name.
        fn name(entity: Entity<'tu>) -> Option<String> {
            if !entity.is_anonymous() {
                return entity.get_name();
            }
            let spelling = entity.get_type()?.get_display_name();
            let is_identifier = !spelling.is_empty()
                && spelling
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_');
            is_identifier.then_some(spelling)
        }

        fn decl_ref(&mut self, entity: Entity<'tu>) -> DeclRef {
            DeclRef {
                id: self.id(entity),
                name: Self::name(entity),
                file: Self::file(entity),
                is_definition: entity.get_definition().is_some(),
            }
        }

        fn decl(&mut self, entity: Entity<'tu>) -> Option<Decl> {
            let kind = match entity.get_kind() {
                EntityKind::StructDecl | EntityKind::UnionDecl => {
                    let kind = if entity.get_kind() == EntityKind::UnionDecl {
                        RecordKind::Union
                    } else {
                        RecordKind::Struct
                    };
                    DeclKind::Record(Record {
                        kind,
                        ty: self.ty(entity.get_type()?),
                        is_definition: entity.is_definition(),
                        members: entity
                            .get_children()
                            .into_iter()
                            .filter_map(|child| self.decl(child))
                            .collect(),
                    })
                }
                EntityKind::EnumDecl => {
                    let integer = entity.get_enum_underlying_type()?;
                    let signed = integer.get_canonical_type().is_signed_integer();
                    let constants = entity
                        .get_children()
                        .into_iter()
                        .filter(|c| c.get_kind() == EntityKind::EnumConstantDecl)
                        .filter_map(|c| {
                            let (signed_value, unsigned_value) = c.get_enum_constant_value()?;
                            let value = if signed {
                                i128::from(signed_value)
                            } else {
                                i128::from(unsigned_value)
                            };
                            Some(EnumConstant::new(&c.get_name()?, value))
                        })
                        .collect();
                    DeclKind::Enum(Enum {
                        ty: self.ty(entity.get_type()?),
                        integer_type: self.ty(integer),
                        constants,
                    })
                }
                EntityKind::FieldDecl => DeclKind::Field(Field {
                    ty: self.ty(entity.get_type()?),
                    bit_width: entity
                        .get_bit_field_width()
                        .and_then(|w| u32::try_from(w).ok()),
                }),
                EntityKind::TypedefDecl => DeclKind::Typedef(Typedef {
                    ty: self.ty(entity.get_type()?),
                    underlying: self.ty(entity.get_typedef_underlying_type()?),
                }),
                EntityKind::FunctionDecl => DeclKind::Function(Function {
                    result: self.ty(entity.get_result_type()?),
                    params: entity
                        .get_arguments()
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|arg| {
                            Some(Param {
                                name: arg.get_name().filter(|n| !n.is_empty()),
                                ty: self.ty(arg.get_type()?),
                            })
                        })
                        .collect(),
                    is_variadic: entity.is_variadic(),
                }),
                EntityKind::VarDecl => {
                    let ty = entity.get_type()?;
                    let init = match entity.evaluate() {
                        Some(EvaluationResult::SignedInteger(v)) => Some(v.to_string()),
                        Some(EvaluationResult::UnsignedInteger(v)) => Some(v.to_string()),
                        _ => None,
                    };
                    DeclKind::Var(Var {
                        ty: self.ty(ty),
                        init,
                    })
                }
                EntityKind::MacroDefinition => DeclKind::Macro(Macro {
                    tokens: entity
                        .get_range()?
                        .tokenize()
                        .into_iter()
                        .map(|token| {
                            let kind = match token.get_kind() {
                                ClangTokenKind::Comment => TokenKind::Comment,
                                ClangTokenKind::Identifier => TokenKind::Identifier,
                                ClangTokenKind::Keyword => TokenKind::Keyword,
                                ClangTokenKind::Literal => TokenKind::Literal,
                                ClangTokenKind::Punctuation => TokenKind::Punctuation,
                            };
                            let range = token.get_range();
                            let start = range.get_start().get_spelling_location().column;
                            let end = range.get_end().get_spelling_location().column;
                            Token {
                                kind,
                                spelling: token.get_spelling(),
                                start_column: start,
                                end_column: end,
                            }
                        })
                        .collect(),
                }),
                _ => return None,
            };

            Some(Decl {
                id: self.id(entity),
                name: Self::name(entity),
                file: Self::file(entity),
                kind,
            })
        }

        fn ty(&mut self, ty: clang::Type<'tu>) -> Type {
            if ty.get_kind() == ClangTypeKind::Elaborated {
                if let Some(named) = ty.get_elaborated_type() {
                    let mut lowered = self.ty(named);
                    lowered.spelling = ty.get_display_name();
                    lowered.is_const = ty.is_const_qualified();
                    return lowered;
                }
            }

            let kind = match ty.get_kind() {
                ClangTypeKind::Void => TypeKind::Builtin(Builtin::Void),
                ClangTypeKind::Bool => TypeKind::Builtin(Builtin::Bool),
                ClangTypeKind::CharS => TypeKind::Builtin(Builtin::CharS),
                ClangTypeKind::CharU => TypeKind::Builtin(Builtin::CharU),
                ClangTypeKind::SChar => TypeKind::Builtin(Builtin::SChar),
                ClangTypeKind::UChar => TypeKind::Builtin(Builtin::UChar),
                ClangTypeKind::Short => TypeKind::Builtin(Builtin::Short),
                ClangTypeKind::UShort => TypeKind::Builtin(Builtin::UShort),
                ClangTypeKind::Int => TypeKind::Builtin(Builtin::Int),
                ClangTypeKind::UInt => TypeKind::Builtin(Builtin::UInt),
                ClangTypeKind::Long => TypeKind::Builtin(Builtin::Long),
                ClangTypeKind::ULong => TypeKind::Builtin(Builtin::ULong),
                ClangTypeKind::LongLong => TypeKind::Builtin(Builtin::LongLong),
                ClangTypeKind::ULongLong => TypeKind::Builtin(Builtin::ULongLong),
                ClangTypeKind::Int128 => TypeKind::Builtin(Builtin::Int128),
                ClangTypeKind::UInt128 => TypeKind::Builtin(Builtin::UInt128),
                ClangTypeKind::Char16 => TypeKind::Builtin(Builtin::Char16),
                ClangTypeKind::Char32 => TypeKind::Builtin(Builtin::Char32),
                ClangTypeKind::WChar if ty.is_signed_integer() => TypeKind::Builtin(Builtin::WCharS),
                ClangTypeKind::WChar => TypeKind::Builtin(Builtin::WCharU),
                ClangTypeKind::Half | ClangTypeKind::Float16 => TypeKind::Builtin(Builtin::Half),
                ClangTypeKind::Float => TypeKind::Builtin(Builtin::Float),
                ClangTypeKind::Double => TypeKind::Builtin(Builtin::Double),
                ClangTypeKind::LongDouble => TypeKind::Builtin(Builtin::LongDouble),
                ClangTypeKind::Pointer => match ty.get_pointee_type() {
                    Some(pointee) => TypeKind::Pointer(Box::new(self.ty(pointee))),
                    None => TypeKind::Other,
                },
                ClangTypeKind::ConstantArray => match ty.get_element_type() {
                    Some(element) => TypeKind::ConstantArray(
                        Box::new(self.ty(element)),
                        ty.get_size().unwrap_or(0) as u64,
                    ),
                    None => TypeKind::Other,
                },
                ClangTypeKind::IncompleteArray => match ty.get_element_type() {
                    Some(element) => TypeKind::IncompleteArray(Box::new(self.ty(element))),
                    None => TypeKind::Other,
                },
                ClangTypeKind::FunctionPrototype | ClangTypeKind::FunctionNoPrototype => {
                    TypeKind::Function
                }
                ClangTypeKind::Record => TypeKind::Record,
                ClangTypeKind::Enum => TypeKind::Enum,
                ClangTypeKind::Typedef => TypeKind::Typedef,
                _ => TypeKind::Other,
            };

            let declaration = match kind {
                TypeKind::Record | TypeKind::Enum | TypeKind::Typedef => {
                    ty.get_declaration().map(|decl| self.decl_ref(decl))
                }
                _ => None,
            };
            let canonical_type = ty.get_canonical_type();
            let canonical = (canonical_type != ty).then(|| Box::new(self.ty(canonical_type)));

            Type {
                kind,
                spelling: ty.get_display_name(),
                is_const: ty.is_const_qualified(),
                size: ty.get_sizeof().ok().map(|s| s as u64),
                align: ty.get_alignof().ok().map(|a| a as u64),
                canonical,
                declaration,
            }
        }
    }
}
