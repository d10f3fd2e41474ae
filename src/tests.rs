use std::collections::HashMap;
use std::path::Path;

use pretty_assertions::assert_eq;

use crate::aggregate::UnionOverlay;
use crate::ast::{
    Builtin, Decl, DeclId, DeclKind, DeclRef, Enum, EnumConstant, Field, Function, Macro, Param,
    Record, RecordKind, Token, TokenKind, Type, Typedef, Var,
};
use crate::emitter::EnumRules;
use crate::macros::{FoldedMacro, Rejection, fold_macro};
use crate::session::Session;
use crate::translator::Translator;

const HEADER: &str = "/virtual/api.h";
const OTHER: &str = "/virtual/other.h";

fn int() -> Type {
    Type::builtin(Builtin::Int)
}

fn uint() -> Type {
    Type::builtin(Builtin::UInt)
}

fn float() -> Type {
    Type::builtin(Builtin::Float)
}

fn session() -> Session {
    let mut session = Session::new(EnumRules::default(), false);
    session.allow_file(HEADER.into());
    session
}

fn record(id: u32, name: Option<&str>, kind: RecordKind, size: u64, members: Vec<Decl>) -> Decl {
    let tag = match kind {
        RecordKind::Struct => "struct",
        RecordKind::Union => "union",
    };
    let spelling = match name {
        Some(name) => format!("{tag} {name}"),
        None => format!("{tag} (unnamed at {HEADER}:{id})"),
    };
    let decl_ref = DeclRef::new(DeclId(id), name, Some(Path::new(HEADER)));
    let ty = Type::record(&spelling, decl_ref, size, size.min(8));
    let record = Record {
        kind,
        ty,
        is_definition: true,
        members,
    };
    Decl::new(DeclId(id), name, DeclKind::Record(record)).in_file(HEADER)
}

fn forward(id: u32, name: &str) -> Decl {
    let decl_ref = DeclRef::new(DeclId(id), Some(name), Some(Path::new(HEADER))).incomplete();
    let record = Record {
        kind: RecordKind::Struct,
        ty: Type::record(&format!("struct {name}"), decl_ref, 0, 0),
        is_definition: false,
        members: Vec::new(),
    };
    Decl::new(DeclId(id), Some(name), DeclKind::Record(record)).in_file(HEADER)
}

fn type_of(decl: &Decl) -> Type {
    match &decl.kind {
        DeclKind::Record(record) => record.ty.clone(),
        DeclKind::Enum(enumeration) => enumeration.ty.clone(),
        DeclKind::Typedef(typedef) => typedef.ty.clone(),
        other => panic!("{other:?} declares no type"),
    }
}

fn field(id: u32, name: &str, ty: Type) -> Decl {
    Decl::new(DeclId(id), Some(name), DeclKind::Field(Field { ty, bit_width: None })).in_file(HEADER)
}

fn bitfield(id: u32, name: &str, width: u32) -> Decl {
    let field = Field {
        ty: uint(),
        bit_width: Some(width),
    };
    Decl::new(DeclId(id), Some(name), DeclKind::Field(field)).in_file(HEADER)
}

fn typedef_in(file: &str, id: u32, name: &str, underlying: Type) -> Decl {
    let decl_ref = DeclRef::new(DeclId(id), Some(name), Some(Path::new(file)));
    let typedef = Typedef {
        ty: Type::typedef(decl_ref, &underlying),
        underlying,
    };
    Decl::new(DeclId(id), Some(name), DeclKind::Typedef(typedef)).in_file(file)
}

fn enumeration(id: u32, name: Option<&str>, constants: &[(&str, i128)]) -> Decl {
    let decl_ref = DeclRef::new(DeclId(id), name, Some(Path::new(HEADER)));
    let spelling = format!("enum {}", name.unwrap_or("(unnamed)"));
    let integer = uint();
    let enumeration = Enum {
        ty: Type::enumeration(&spelling, decl_ref, &integer),
        integer_type: integer,
        constants: constants
            .iter()
            .map(|(name, value)| EnumConstant::new(name, *value))
            .collect(),
    };
    Decl::new(DeclId(id), name, DeclKind::Enum(enumeration)).in_file(HEADER)
}

/// `#define <name> <body>` with every token separated by one space.
fn define(id: u32, name: &str, body: &[(TokenKind, &str)]) -> Decl {
    let mut tokens = vec![Token::new(TokenKind::Identifier, name, 9)];
    for (kind, spelling) in body {
        let column = tokens.last().map_or(9, |t| t.end_column + 1);
        tokens.push(Token::new(*kind, spelling, column));
    }
    Decl::new(DeclId(id), Some(name), DeclKind::Macro(Macro { tokens })).in_file(HEADER)
}

fn emit(session: &mut Session, decls: &[Decl]) {
    for decl in decls {
        session.emit_top_level(decl);
    }
}

#[test]
fn test_translation_is_stable_and_queued_once() {
    let mut translator = Translator::new(false);
    translator.allow_file(HEADER.into());
    let handle = typedef_in(OTHER, 1, "Handle", Type::builtin(Builtin::ULong));
    let ty = type_of(&handle);

    let first = translator.translate_type(&ty);
    let second = translator.translate_type(&ty);

    assert_eq!(first, "Handle");
    assert_eq!(first, second);
    assert_eq!(translator.missing_types().len(), 1);
}

#[test]
fn test_translation_types_from_requested_headers_are_not_queued() {
    let mut translator = Translator::new(false);
    translator.allow_file(HEADER.into());
    let local = typedef_in(HEADER, 1, "Local", int());

    assert_eq!(translator.translate_type(&type_of(&local)), "Local");
    assert!(translator.missing_types().is_empty());
}

#[test]
fn test_translation_builtins() {
    let mut translator = Translator::new(false);

    assert_eq!(translator.translate_type(&int()), "int32_t");
    assert_eq!(translator.translate_type(&uint()), "uint32_t");
    assert_eq!(translator.translate_type(&Type::builtin(Builtin::CharS)), "int8_t");
    assert_eq!(translator.translate_type(&Type::builtin(Builtin::UChar)), "uint8_t");
    assert_eq!(translator.translate_type(&Type::builtin(Builtin::Short)), "int16_t");
    assert_eq!(translator.translate_type(&Type::builtin(Builtin::ULongLong)), "uint64_t");
    assert_eq!(translator.translate_type(&Type::builtin(Builtin::Double)), "double");
    assert_eq!(translator.translate_type(&Type::builtin(Builtin::Bool)), "bool");
    assert_eq!(translator.translate_type(&int().constified()), "const int32_t");
}

#[test]
fn test_translation_byte_bool() {
    let mut translator = Translator::new(true);

    assert_eq!(translator.translate_type(&Type::builtin(Builtin::Bool)), "uint8_t");
}

#[test]
fn test_translation_type_ptr() {
    let mut translator = Translator::new(false);
    let ty = Type::pointer(Type::pointer(int().constified()));

    assert_eq!(translator.translate_type(&ty), "Ptr<Ptr<int32_t>>");
}

#[test]
fn test_translation_native_string() {
    let mut translator = Translator::new(false);
    let string = Type::pointer(Type::builtin(Builtin::CharS).constified());
    let const_string = string.clone().constified();
    let mutable = Type::pointer(Type::builtin(Builtin::CharS));

    assert_eq!(translator.translate_type(&string), "NativeString");
    assert_eq!(translator.translate_type(&const_string), "NativeString");
    assert_eq!(translator.translate_type(&mutable), "Ptr<int8_t>");
}

#[test]
fn test_translation_type_array() {
    let mut translator = Translator::new(false);

    assert_eq!(translator.translate_type(&Type::constant_array(float(), 4)), "float[4]");
    assert_eq!(translator.translate_type(&Type::incomplete_array(int())), "Ptr<int32_t>");
}

#[test]
fn test_translation_function_pointer_is_opaque() {
    let mut translator = Translator::new(false);
    let ty = Type::function_pointer("int (*)(int, float)");

    assert_eq!(translator.translate_type(&ty), "Ptr<void>");
}

#[test]
fn test_translation_known_typedefs() {
    let mut translator = Translator::new(false);
    let size_t = typedef_in("/usr/include/stddef.h", 1, "size_t", Type::builtin(Builtin::ULong));
    let int32_t = typedef_in("/usr/include/stdint.h", 2, "int32_t", int());

    assert_eq!(translator.translate_type(&type_of(&size_t)), "uint64_t");
    assert_eq!(translator.translate_type(&type_of(&int32_t)), "int32_t");
    assert!(translator.missing_types().is_empty());
}

#[test]
fn test_macro_chain_resolution() {
    let mut session = session();
    emit(
        &mut session,
        &[
            define(1, "WIDTH", &[(TokenKind::Literal, "640")]),
            define(2, "HEIGHT", &[(TokenKind::Literal, "480")]),
            define(3, "AREA", &[(TokenKind::Identifier, "WIDTH")]),
        ],
    );

    assert_eq!(
        session.into_body(),
        "public static let WIDTH = 640;\n\
         public static let HEIGHT = 480;\n\
         public static let AREA = 640;"
    );
}

#[test]
fn test_macro_rejections() {
    let symbols = HashMap::from([("ONE".to_string(), "1".to_string())]);
    let tokens = |spellings: &[(TokenKind, &str)]| {
        let mut tokens: Vec<Token> = Vec::new();
        for (kind, spelling) in spellings {
            let column = tokens.last().map_or(9, |t| t.end_column + 1);
            tokens.push(Token::new(*kind, spelling, column));
        }
        tokens
    };

    assert_eq!(
        fold_macro(&tokens(&[(TokenKind::Identifier, "EMPTY")]), &symbols),
        Err(Rejection::Empty)
    );
    assert_eq!(
        fold_macro(
            &tokens(&[(TokenKind::Identifier, "_RESERVED"), (TokenKind::Literal, "1")]),
            &symbols
        ),
        Err(Rejection::Reserved)
    );
    assert_eq!(
        fold_macro(
            &tokens(&[
                (TokenKind::Identifier, "SIZE"),
                (TokenKind::Keyword, "sizeof"),
                (TokenKind::Punctuation, "("),
                (TokenKind::Keyword, "int"),
                (TokenKind::Punctuation, ")"),
            ]),
            &symbols
        ),
        Err(Rejection::Keyword("sizeof".to_string()))
    );
    assert_eq!(
        fold_macro(
            &tokens(&[(TokenKind::Identifier, "LATER"), (TokenKind::Identifier, "UNSEEN")]),
            &symbols
        ),
        Err(Rejection::Unresolved("UNSEEN".to_string()))
    );
}

#[test]
fn test_macro_function_like_needs_adjacent_paren() {
    let symbols = HashMap::new();
    let function_like = [
        Token::new(TokenKind::Identifier, "MAX", 9),
        Token::new(TokenKind::Punctuation, "(", 12),
        Token::new(TokenKind::Literal, "2", 13),
        Token::new(TokenKind::Punctuation, ")", 14),
    ];
    let parenthesized = [
        Token::new(TokenKind::Identifier, "MAX", 9),
        Token::new(TokenKind::Punctuation, "(", 13),
        Token::new(TokenKind::Literal, "2", 14),
        Token::new(TokenKind::Punctuation, ")", 15),
    ];

    assert_eq!(
        fold_macro(&function_like, &symbols),
        Err(Rejection::FunctionLike)
    );
    assert_eq!(
        fold_macro(&parenthesized, &symbols),
        Ok(FoldedMacro {
            name: "MAX".to_string(),
            value: "( 2 )".to_string(),
        })
    );
}

#[test]
fn test_macro_skips_comments_and_expands_symbols() {
    let symbols = HashMap::from([("BASE".to_string(), "0x10".to_string())]);
    let tokens = [
        Token::new(TokenKind::Identifier, "NEXT", 9),
        Token::new(TokenKind::Identifier, "BASE", 14),
        Token::new(TokenKind::Punctuation, "+", 19),
        Token::new(TokenKind::Literal, "1", 21),
        Token::new(TokenKind::Comment, "/* next */", 23),
    ];

    assert_eq!(
        fold_macro(&tokens, &symbols).map(|folded| folded.value),
        Ok("0x10 + 1".to_string())
    );
}

#[test]
fn test_struct_fields() {
    let string = Type::pointer(Type::builtin(Builtin::CharS).constified());
    let point = record(
        1,
        Some("Point"),
        RecordKind::Struct,
        40,
        vec![
            field(2, "x", int()),
            field(3, "y", float()),
            field(4, "name", string),
            field(5, "matrix", Type::constant_array(float(), 4)),
            field(6, "callback", Type::function_pointer("void (*)(void)")),
        ],
    );
    let mut session = session();
    emit(&mut session, &[point]);

    assert_eq!(
        session.into_body(),
        "public struct Point {\n    \
             public int32_t x;\n    \
             public float y;\n    \
             public NativeString name;\n    \
             public float[4] matrix;\n    \
             public Ptr<void> callback;\n\
         };"
    );
}

#[test]
fn test_struct_emitted_once() {
    let point = record(1, Some("Point"), RecordKind::Struct, 4, vec![field(2, "x", int())]);
    let mut session = session();
    emit(&mut session, &[point.clone(), point]);

    let body = session.into_body();
    assert_eq!(body.matches("public struct Point {").count(), 1);
}

#[test]
fn test_struct_field_named_like_its_type() {
    let color = typedef_in(HEADER, 1, "Color", uint());
    let pixel = record(
        2,
        Some("Pixel"),
        RecordKind::Struct,
        4,
        vec![field(3, "Color", type_of(&color))],
    );
    let mut session = session();
    emit(&mut session, &[pixel]);

    assert!(session.into_body().contains("public Color Color_;"));
}

#[test]
fn test_struct_bitfields_share_storage() {
    let flags = record(
        1,
        Some("Flags"),
        RecordKind::Struct,
        16,
        vec![
            bitfield(2, "a", 1),
            bitfield(3, "b", 3),
            bitfield(4, "c", 30),
            field(5, "count", int()),
            bitfield(6, "d", 2),
        ],
    );
    let mut session = session();
    emit(&mut session, &[flags]);

    assert_eq!(
        session.into_body(),
        "public struct Flags {\n    \
             internal uint32_t _bitfieldBindingStorage0;\n    \
             internal uint32_t _bitfieldBindingStorage1;\n    \
             public int32_t count;\n    \
             internal uint32_t _bitfieldBindingStorage2;\n\
         };"
    );
}

#[test]
fn test_struct_member_after_bitfield_uses_spare_bytes() {
    let packed = record(
        1,
        Some("Packed"),
        RecordKind::Struct,
        4,
        vec![
            bitfield(2, "flags", 8),
            field(3, "tail", Type::builtin(Builtin::UChar)),
        ],
    );
    let mut session = session();
    emit(&mut session, &[packed]);

    assert_eq!(
        session.into_body(),
        "public struct Packed {\n    \
             internal uint8_t _bitfieldBindingStorage0;\n    \
             public uint8_t tail;\n    \
             internal uint16_t _bitfieldBindingStorage1;\n\
         };"
    );
}

#[test]
fn test_struct_mixed_width_bitfields_share_storage() {
    let narrow = Field {
        ty: Type::builtin(Builtin::UChar),
        bit_width: Some(4),
    };
    let mixed = record(
        1,
        Some("Mixed"),
        RecordKind::Struct,
        4,
        vec![
            Decl::new(DeclId(2), Some("a"), DeclKind::Field(narrow)).in_file(HEADER),
            bitfield(3, "b", 4),
        ],
    );
    let mut session = session();
    emit(&mut session, &[mixed]);

    assert_eq!(
        session.into_body(),
        "public struct Mixed {\n    \
             internal uint32_t _bitfieldBindingStorage0;\n\
         };"
    );
}

#[test]
fn test_union_overlay() {
    let value = record(
        1,
        Some("Value"),
        RecordKind::Union,
        4,
        vec![field(2, "a", int()), field(3, "b", float())],
    );
    let mut session = session();
    emit(&mut session, &[value]);

    let expected = "\
public struct Value {
    internal uint32_t _unionBindingBackingMemory[1];
    internal struct _unionBindingAdapter_a { int32_t value; };
    public property int32_t a
    {
        get {
            _unionBindingAdapter_a tmp = reinterpret<_unionBindingAdapter_a>(_unionBindingBackingMemory);
            return tmp.value;
        }
        set {
            _unionBindingAdapter_a tmp;
            tmp.value = newValue;
            _unionBindingBackingMemory = reinterpret<uint32_t[1]>(tmp);
        }
    }
    internal struct _unionBindingAdapter_b { float value; };
    public property float b
    {
        get {
            _unionBindingAdapter_b tmp = reinterpret<_unionBindingAdapter_b>(_unionBindingBackingMemory);
            return tmp.value;
        }
        set {
            _unionBindingAdapter_b tmp;
            tmp.value = newValue;
            _unionBindingBackingMemory = reinterpret<uint32_t[1]>(tmp);
        }
    }
};";
    assert_eq!(session.into_body(), expected);
}

#[test]
fn test_union_adapters_are_padded_to_backing_width() {
    let bytes = Type::constant_array(Type::builtin(Builtin::UChar), 5);
    let mixed = record(
        1,
        Some("Mixed"),
        RecordKind::Union,
        8,
        vec![field(2, "bytes", bytes), field(3, "word", int())],
    );
    let mut session = session();
    emit(&mut session, &[mixed]);

    let body = session.into_body();
    assert!(body.contains("internal uint32_t _unionBindingBackingMemory[2];"));
    assert!(body.contains(
        "internal struct _unionBindingAdapter_bytes { uint8_t[5] value; uint8_t pad[3]; };"
    ));
    assert!(body.contains(
        "internal struct _unionBindingAdapter_word { int32_t value; uint8_t pad[4]; };"
    ));
}

#[test]
fn test_union_overlay_layout() {
    assert_eq!(UnionOverlay::new(4, 4), UnionOverlay { unit: 4, len: 1 });
    assert_eq!(UnionOverlay::new(5, 4), UnionOverlay { unit: 4, len: 2 });
    assert_eq!(UnionOverlay::new(3, 1), UnionOverlay { unit: 1, len: 3 });
    assert_eq!(UnionOverlay::new(16, 16), UnionOverlay { unit: 8, len: 2 });
    assert_eq!(UnionOverlay::new(0, 0), UnionOverlay { unit: 8, len: 1 });
    assert_eq!(UnionOverlay::new(5, 4).byte_width(), 8);
    assert_eq!(UnionOverlay::new(6, 2).element_type(), "uint16_t");
}

#[test]
fn test_anonymous_naming_is_ordered() {
    let first = record(11, None, RecordKind::Struct, 4, vec![field(12, "a", int())]);
    let second = record(13, None, RecordKind::Struct, 4, vec![field(14, "b", float())]);
    let first_field = field(15, "first", type_of(&first));
    let second_field = field(16, "second", type_of(&second));
    let outer = record(
        10,
        Some("Outer"),
        RecordKind::Struct,
        8,
        vec![first, first_field, second, second_field],
    );
    let mut session = session();
    emit(&mut session, &[outer]);

    assert_eq!(
        session.into_body(),
        "public struct Outer {\n    \
             public struct _anonymousBindingDecl0 {\n        \
                 public int32_t a;\n    \
             };\n    \
             public _anonymousBindingDecl0 first;\n    \
             public struct _anonymousBindingDecl1 {\n        \
                 public float b;\n    \
             };\n    \
             public _anonymousBindingDecl1 second;\n\
         };"
    );
}

#[test]
fn test_anonymous_union_member_is_promoted() {
    let inner = record(
        11,
        None,
        RecordKind::Union,
        4,
        vec![field(12, "i", int()), field(13, "f", float())],
    );
    let variant = record(
        10,
        Some("Variant"),
        RecordKind::Struct,
        8,
        vec![field(14, "tag", int()), inner],
    );
    let mut session = session();
    emit(&mut session, &[variant]);

    let body = session.into_body();
    assert!(body.contains("    public struct _anonymousBindingDecl0 {\n"));
    assert!(body.contains("        internal uint32_t _unionBindingBackingMemory[1];\n"));
    assert!(body.contains("    internal _anonymousBindingDecl0 _anonymousBindingField0;\n"));
    assert!(body.contains(
        "    public property int32_t i\n    \
         {\n        \
             get {\n            \
                 return _anonymousBindingField0.i;\n        \
             }\n        \
             set {\n            \
                 _anonymousBindingField0.i = newValue;\n        \
             }\n    \
         }"
    ));
    assert!(body.contains("return _anonymousBindingField0.f;"));
}

#[test]
fn test_anonymous_struct_in_union_gets_adapter() {
    let halves = record(
        11,
        None,
        RecordKind::Struct,
        4,
        vec![
            field(12, "low", Type::builtin(Builtin::UShort)),
            field(13, "high", Type::builtin(Builtin::UShort)),
        ],
    );
    let word = record(
        10,
        Some("Word"),
        RecordKind::Union,
        4,
        vec![field(14, "value", uint()), halves],
    );
    let mut session = session();
    emit(&mut session, &[word]);

    let body = session.into_body();
    assert!(body.contains(
        "internal struct _unionBindingAdapter_anonymousBindingDecl0 { _anonymousBindingDecl0 value; };"
    ));
    assert!(body.contains("public property uint16_t high"));
    assert!(body.contains(
        "_unionBindingAdapter_anonymousBindingDecl0 tmp = reinterpret<_unionBindingAdapter_anonymousBindingDecl0>(_unionBindingBackingMemory);\n            \
         tmp.value.high = newValue;"
    ));
}

#[test]
fn test_nested_named_struct_is_hoisted() {
    let inner = record(2, Some("Inner"), RecordKind::Struct, 4, vec![field(3, "x", int())]);
    let inner_field = field(4, "inner", type_of(&inner));
    let outer = record(1, Some("Outer"), RecordKind::Struct, 4, vec![inner, inner_field]);
    let mut session = session();
    emit(&mut session, &[outer]);

    assert_eq!(
        session.into_body(),
        "public struct Outer {\n    \
             public Inner inner;\n\
         };\n\
         public struct Inner {\n    \
             public int32_t x;\n\
         };"
    );
}

#[test]
fn test_forward_declaration_emitted_once() {
    let foo = forward(1, "Foo");
    let foo_ptr = Type::pointer(type_of(&foo));
    let bar = record(
        2,
        Some("Bar"),
        RecordKind::Struct,
        16,
        vec![field(3, "a", foo_ptr.clone()), field(4, "b", foo_ptr)],
    );
    let mut session = session();
    emit(&mut session, &[foo.clone(), bar, foo]);
    session.finish();

    let body = session.into_body();
    assert!(body.contains("public Ptr<Foo> a;"));
    assert_eq!(body.matches("public struct Foo;").count(), 1);
    assert!(body.ends_with("public struct Foo;"));
}

#[test]
fn test_forward_declaration_of_defined_struct_is_dropped() {
    let mut session = session();
    emit(
        &mut session,
        &[
            forward(1, "Foo"),
            record(1, Some("Foo"), RecordKind::Struct, 4, vec![field(2, "x", int())]),
        ],
    );
    session.finish();

    assert!(!session.into_body().contains("public struct Foo;"));
}

#[test]
fn test_missing_types_backfilled_once() {
    let incomplete = DeclRef::new(DeclId(50), Some("ext_handle"), Some(Path::new(OTHER))).incomplete();
    let handle = typedef_in(
        OTHER,
        51,
        "ExternalHandle",
        Type::record("struct ext_handle", incomplete, 0, 0),
    );
    let id = typedef_in(OTHER, 52, "ExternalId", uint());
    let holder = record(
        1,
        Some("Holder"),
        RecordKind::Struct,
        24,
        vec![
            field(2, "first", Type::pointer(type_of(&handle))),
            field(3, "second", Type::pointer(type_of(&handle))),
            field(4, "id", type_of(&id)),
        ],
    );
    let mut session = session();
    emit(&mut session, &[holder]);
    session.finish();

    let body = session.into_body();
    assert!(body.contains("public Ptr<ExternalHandle> first;"));
    assert_eq!(body.matches("public struct ExternalHandle;").count(), 1);
    assert_eq!(body.matches("public typealias ExternalId = uint32_t;").count(), 1);
}

#[test]
fn test_missing_alias_of_foreign_struct_registers_struct() {
    let ext_s = DeclRef::new(DeclId(60), Some("ext_s"), Some(Path::new(OTHER)));
    let ext_t = typedef_in(OTHER, 61, "ext_t", Type::record("struct ext_s", ext_s, 8, 4));
    let holder = record(
        1,
        Some("Holder"),
        RecordKind::Struct,
        16,
        vec![
            field(2, "first", Type::pointer(type_of(&ext_t))),
            field(3, "second", Type::pointer(type_of(&ext_t))),
        ],
    );
    let mut session = session();
    emit(&mut session, &[holder]);
    session.finish();

    let body = session.into_body();
    assert!(body.contains("public Ptr<ext_t> second;"));
    assert_eq!(body.matches("public typealias ext_t = ext_s;").count(), 1);
    assert_eq!(body.matches("public struct ext_s;").count(), 1);
    assert!(body.ends_with("public typealias ext_t = ext_s;\npublic struct ext_s;"));
}

#[test]
fn test_silent_pass_only_registers() {
    let point = record(1, Some("Point"), RecordKind::Struct, 4, vec![field(2, "x", int())]);
    let mut session = session();
    session.set_silent(true);
    emit(&mut session, &[point.clone(), forward(3, "Opaque")]);
    session.set_silent(false);
    emit(&mut session, &[point]);
    session.finish();

    assert_eq!(session.into_body(), "");
}

#[test]
fn test_enum_rewriting() {
    let rules = EnumRules::new(
        &[".*".to_string()],
        &["COLOR_".to_string()],
        &["COLOR_MAX".to_string()],
        "e",
    )
    .unwrap();
    let color = enumeration(
        1,
        Some("Color"),
        &[("COLOR_RED", 0), ("COLOR_GREEN", 1), ("COLOR_2D", 2), ("COLOR_MAX", 3)],
    );
    let mut session = Session::new(rules, false);
    emit(&mut session, &[color]);

    assert_eq!(
        session.into_body(),
        "[UnscopedEnum]\n\
         public enum Color : uint32_t {\n    \
             RED = 0,\n    \
             GREEN = 1,\n    \
             e2D = 2,\n\
         };"
    );
}

#[test]
fn test_enum_prefix_removal_keeps_whole_names() {
    let rules = EnumRules::new(&[], &["MODE_".to_string()], &[], "").unwrap();
    let cases = [EnumConstant::new("MODE_", 0), EnumConstant::new("MODE_FAST", 1)];
    let digits = [EnumConstant::new("MODE_1", 0), EnumConstant::new("MODE_2", 1)];

    assert_eq!(
        rules.rewrite_cases(&cases),
        [("MODE_".to_string(), 0), ("FAST".to_string(), 1)]
    );
    assert_eq!(
        rules.rewrite_cases(&digits),
        [("MODE_1".to_string(), 0), ("MODE_2".to_string(), 1)]
    );
}

#[test]
fn test_enum_scoped_and_deduplicated() {
    let rules = EnumRules::new(&["Flag.*".to_string()], &[], &[], "e").unwrap();
    let mode = enumeration(1, Some("Mode"), &[("MODE_A", 0)]);
    let mut session = Session::new(rules, false);
    emit(&mut session, &[mode.clone(), mode]);

    assert_eq!(
        session.into_body(),
        "public enum Mode : uint32_t {\n    \
             MODE_A = 0,\n\
         };"
    );
}

#[test]
fn test_anonymous_enum_becomes_constants() {
    let flags = enumeration(1, None, &[("FLAG_A", 1), ("FLAG_B", 2)]);
    let mut session = session();
    emit(&mut session, &[flags]);

    assert_eq!(
        session.into_body(),
        "public static const uint32_t FLAG_A = 1;\n\
         public static const uint32_t FLAG_B = 2;"
    );
}

#[test]
fn test_typedefs() {
    let point = record(1, Some("Point"), RecordKind::Struct, 4, vec![field(2, "x", int())]);
    let restated = typedef_in(HEADER, 3, "Point", type_of(&point));
    let alias = typedef_in(HEADER, 4, "u32", uint());
    let mut session = session();
    emit(&mut session, &[point, restated, alias]);

    assert_eq!(
        session.into_body(),
        "public struct Point {\n    \
             public int32_t x;\n\
         };\n\
         public typealias u32 = uint32_t;"
    );
}

#[test]
fn test_functions() {
    let function = |id: u32, name: &str, params: Vec<Param>, is_variadic: bool| {
        let function = Function {
            result: int(),
            params,
            is_variadic,
        };
        Decl::new(DeclId(id), Some(name), DeclKind::Function(function)).in_file(HEADER)
    };
    let va_list = typedef_in(
        "/usr/include/stdarg.h",
        9,
        "va_list",
        Type::pointer(Type::builtin(Builtin::CharS)),
    );
    let mut session = session();
    emit(
        &mut session,
        &[
            function(1, "add", vec![Param::new("a", int()), Param::new("b", int())], false),
            function(2, "log_message", vec![Param::new("format", int())], true),
            function(3, "vlog_message", vec![Param::new("args", type_of(&va_list))], false),
            function(4, "get_count", Vec::new(), false),
        ],
    );

    assert_eq!(
        session.into_body(),
        "public __extern_cpp int32_t add(int32_t a, int32_t b);\n\
         public __extern_cpp int32_t get_count();"
    );
}

#[test]
fn test_functions_match_va_list_by_name() {
    let function = |id: u32, name: &str, param: Type| {
        let function = Function {
            result: int(),
            params: vec![Param::new("args", param)],
            is_variadic: false,
        };
        Decl::new(DeclId(id), Some(name), DeclKind::Function(function)).in_file(HEADER)
    };
    let tag = DeclRef::new(DeclId(10), Some("__va_list_tag"), None);
    let builtin = typedef_in(
        "/usr/include/stdarg.h",
        11,
        "arg_list_t",
        Type::pointer(Type::record("struct __va_list_tag", tag, 24, 8)),
    );
    let state = DeclRef::new(DeclId(12), Some("my_va_list_state"), Some(Path::new(HEADER)));
    let state = Type::pointer(Type::record("struct my_va_list_state", state, 16, 8));
    let mut session = session();
    emit(
        &mut session,
        &[
            function(1, "vformat", type_of(&builtin)),
            function(2, "save_state", state),
        ],
    );

    assert_eq!(
        session.into_body(),
        "public __extern_cpp int32_t save_state(Ptr<my_va_list_state> args);"
    );
}

#[test]
fn test_constant_globals() {
    let var = |id: u32, name: &str, ty: Type, init: Option<&str>| {
        let var = Var {
            ty,
            init: init.map(str::to_string),
        };
        Decl::new(DeclId(id), Some(name), DeclKind::Var(var)).in_file(HEADER)
    };
    let mut session = session();
    emit(
        &mut session,
        &[
            var(1, "LIMIT", int().constified(), Some("10")),
            var(2, "counter", int(), Some("0")),
            var(3, "EXTERNAL", int().constified(), None),
        ],
    );

    assert_eq!(session.into_body(), "public static const int32_t LIMIT = 10;");
}

#[test]
fn test_namespace_indent() {
    let mut session = Session::new(EnumRules::default(), false).with_base_indent(1);
    emit(&mut session, &[define(1, "ONE", &[(TokenKind::Literal, "1")])]);

    assert_eq!(session.into_body(), "    public static let ONE = 1;");
}
