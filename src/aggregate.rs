//! Struct and union emission.
//!
//! Slang has no unions. A union becomes a struct holding nothing but a raw
//! backing array; every member is a property that reinterprets the backing
//! bytes as a padded adapter struct holding that member, so writing one
//! member overwrites what every other member reads.

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use crate::ast::{Decl, DeclId, DeclKind, Field, Record, RecordKind, Type, TypeKind};
use crate::session::Session;
use crate::translator::sized_integer;

const ANONYMOUS_DECL: &str = "_anonymousBindingDecl";
const ANONYMOUS_FIELD: &str = "_anonymousBindingField";
const BACKING_MEMORY: &str = "_unionBindingBackingMemory";
const ADAPTER: &str = "_unionBindingAdapter";
const BITFIELD_STORAGE: &str = "_bitfieldBindingStorage";

/// How the members of one record refer to each other.
#[derive(Debug)]
struct MemberLayout<'d> {
    /// Synthetic names of anonymous nested tags, numbered in encounter order.
    names: HashMap<DeclId, String>,
    /// Anonymous nested records that no named field refers to. Their members
    /// belong to the enclosing record.
    embedded: Vec<&'d Decl>,
}

impl<'d> MemberLayout<'d> {
    fn new(members: &'d [Decl]) -> Self {
        let mut names = HashMap::new();
        let mut anonymous_records = Vec::new();
        for member in members {
            if !member.is_anonymous() {
                continue;
            }
            match member.kind {
                DeclKind::Record(_) => {
                    names.insert(member.id, format!("{ANONYMOUS_DECL}{}", names.len()));
                    anonymous_records.push(member);
                }
                DeclKind::Enum(_) => {
                    names.insert(member.id, format!("{ANONYMOUS_DECL}{}", names.len()));
                }
                _ => {}
            }
        }

        let referenced = members
            .iter()
            .filter_map(|member| match &member.kind {
                DeclKind::Field(field) => field.ty.innermost().declaration.as_ref().map(|d| d.id),
                _ => None,
            })
            .collect::<HashSet<_>>();
        let embedded = anonymous_records
            .into_iter()
            .filter(|decl| !referenced.contains(&decl.id))
            .collect();

        Self { names, embedded }
    }

    fn name_of(&self, decl: &Decl) -> Option<&str> {
        self.names.get(&decl.id).map(String::as_str)
    }

    fn is_embedded(&self, decl: &Decl) -> bool {
        self.embedded.iter().any(|embedded| embedded.id == decl.id)
    }
}

/// Byte layout of the backing store emulating a union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UnionOverlay {
    /// Width of one backing element in bytes.
    pub(crate) unit: u64,
    /// Number of backing elements.
    pub(crate) len: u64,
}

impl UnionOverlay {
    /// The smallest backing store holding `max_size` bytes in elements as
    /// wide as the strictest member alignment.
    pub(crate) fn new(max_size: u64, max_align: u64) -> Self {
        let unit = match max_align {
            1 => 1,
            2 => 2,
            4 => 4,
            _ => 8,
        };
        Self {
            unit,
            len: max_size.div_ceil(unit).max(1),
        }
    }

    fn for_record(record: &Record, layout: &MemberLayout<'_>) -> Self {
        let (size, align) = record
            .members
            .iter()
            .filter_map(|member| match &member.kind {
                DeclKind::Field(field) => Some(&field.ty),
                DeclKind::Record(inner) if layout.is_embedded(member) => Some(&inner.ty),
                _ => None,
            })
            .fold((0, 0), |(size, align), ty| {
                (size.max(ty.size.unwrap_or(0)), align.max(ty.align.unwrap_or(0)))
            });
        Self::new(size, align)
    }

    pub(crate) fn byte_width(self) -> u64 {
        self.unit * self.len
    }

    pub(crate) fn element_type(self) -> String {
        sized_integer(self.unit, false)
    }

    fn array_type(self) -> String {
        format!("{}[{}]", self.element_type(), self.len)
    }
}

/// Consecutive bit-fields sharing storage.
#[derive(Debug, Clone, Copy)]
struct BitfieldRun {
    /// Byte offset the run starts at.
    start: u64,
    /// Bits allocated from `start`, including padding to unit boundaries.
    bits: u64,
    /// Widest declared unit in bytes.
    unit: u64,
}

/// Walks the members of a struct in emission order, tracking the byte offset
/// they reach so bit-field storage covers the bytes C allocates for it.
#[derive(Debug, Default)]
struct FieldCursor {
    offset: u64,
    align: u64,
    /// Storage members emitted so far.
    storage: usize,
    run: Option<BitfieldRun>,
    has_bitfields: bool,
    /// Cleared once a member of unknown size is seen.
    sized: bool,
}

impl FieldCursor {
    fn new() -> Self {
        Self {
            sized: true,
            ..Self::default()
        }
    }

    /// Allocate a bit-field of `width` bits declared with a `unit`-byte type.
    ///
    /// A field that would straddle a unit boundary starts at the next one; a
    /// zero width only moves to the next boundary.
    fn place_bitfield(&mut self, width: u32, unit: u64) {
        self.has_bitfields = true;
        let unit = unit.max(1);
        let offset = self.offset;
        let run = self.run.get_or_insert(BitfieldRun {
            start: offset,
            bits: 0,
            unit,
        });
        run.unit = run.unit.max(unit);

        let unit_bits = unit * 8;
        let width = u64::from(width);
        let mut bit = run.start * 8 + run.bits;
        if width == 0 || bit % unit_bits + width > unit_bits {
            bit = bit.next_multiple_of(unit_bits);
        }
        run.bits = bit + width - run.start * 8;
    }

    /// End the open run, allocating storage up to its last used byte.
    fn close_run(&mut self) -> Vec<(usize, u64)> {
        self.close_run_at(0)
    }

    /// End the open run, allocating storage up to its last used byte or
    /// `min_end`, whichever is further.
    fn close_run_at(&mut self, min_end: u64) -> Vec<(usize, u64)> {
        let Some(run) = self.run.take() else {
            return Vec::new();
        };
        let end = (run.start + run.bits.div_ceil(8)).max(min_end);
        self.fill(end, run.unit)
    }

    /// Lay out an ordinary member.
    fn place(&mut self, size: Option<u64>, align: Option<u64>) {
        let (Some(size), Some(align)) = (size, align) else {
            self.sized = false;
            return;
        };
        let align = align.max(1);
        self.offset = self.offset.next_multiple_of(align) + size;
        self.align = self.align.max(align);
    }

    /// Storage for the bytes between the current offset and `end`, in the
    /// widest naturally aligned integers no wider than `max_unit`.
    fn fill(&mut self, end: u64, max_unit: u64) -> Vec<(usize, u64)> {
        let mut chunks = Vec::new();
        while self.offset < end {
            let remaining = end - self.offset;
            let width = [8, 4, 2, 1]
                .into_iter()
                .find(|&w| w <= max_unit && w <= remaining && self.offset % w == 0)
                .unwrap_or(1);
            self.place(Some(width), Some(width));
            chunks.push((self.storage, width));
            self.storage += 1;
        }
        chunks
    }

    /// Close the struct, padding it out to the `size` C gives it when
    /// bit-fields left the emitted layout short.
    fn finish(&mut self, size: Option<u64>, align: Option<u64>) -> Vec<(usize, u64)> {
        let Some(size) = size.filter(|_| self.sized) else {
            return self.close_run();
        };
        let mut chunks = self.close_run_at(size);
        if self.has_bitfields {
            let emitted = self.offset.next_multiple_of(self.align.max(1));
            if emitted < size {
                chunks.extend(self.fill(size, align.unwrap_or(1)));
            }
        }
        chunks
    }
}

/// A member of an embedded anonymous record, seen from the record embedding it.
#[derive(Debug)]
struct Promoted {
    name: String,
    path: String,
    ty: String,
}

/// A field name that does not collide with the spelling of its own type.
fn member_name(name: &str, ty: &Type) -> String {
    if ty.innermost().spelling.split_whitespace().any(|part| part == name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

impl Session {
    /// Emit a struct or union declaration.
    ///
    /// Named records are emitted once per name; `synthetic_name` is given for
    /// anonymous records nested in another record, which are always emitted
    /// in place.
    pub(crate) fn emit_record<'d>(
        &mut self,
        decl: &'d Decl,
        record: &'d Record,
        synthetic_name: Option<&str>,
        pending: &mut VecDeque<&'d Decl>,
    ) {
        let Some(name) = synthetic_name.map(str::to_string).or_else(|| decl.name.clone()) else {
            debug!("skipping anonymous record that nothing can refer to");
            return;
        };

        if !record.is_definition {
            if self.is_silent() {
                self.declared_types.insert(name);
            } else {
                self.forward_declarations.insert(name);
            }
            return;
        }
        if synthetic_name.is_none() && !self.declared_types.insert(name.clone()) {
            return;
        }

        let layout = MemberLayout::new(&record.members);
        self.translator.push_anonymous_scope(layout.names.clone());
        self.out.line(format!("public struct {name} {{"));
        self.out.push_indent();
        match record.kind {
            RecordKind::Struct => self.emit_struct_members(record, &layout, pending),
            RecordKind::Union => self.emit_union_members(record, &layout, pending),
        }
        self.out.pop_indent();
        self.out.line("};");
        self.translator.pop_anonymous_scope();
    }

    /// Emit a tag declared inside a record: anonymous ones in place, named
    /// ones later at top level.
    fn emit_nested_tag<'d>(
        &mut self,
        member: &'d Decl,
        layout: &MemberLayout<'d>,
        pending: &mut VecDeque<&'d Decl>,
    ) {
        match (&member.kind, layout.name_of(member)) {
            (DeclKind::Record(record), Some(name)) => {
                self.emit_record(member, record, Some(name), pending);
            }
            (DeclKind::Enum(enumeration), Some(name)) => {
                self.emit_enum(member, enumeration, Some(name));
            }
            (DeclKind::Record(_) | DeclKind::Enum(_), None) => pending.push_back(member),
            _ => {}
        }
    }

    fn emit_struct_members<'d>(
        &mut self,
        record: &'d Record,
        layout: &MemberLayout<'d>,
        pending: &mut VecDeque<&'d Decl>,
    ) {
        let mut cursor = FieldCursor::new();
        let mut embedded_fields = 0;
        for member in &record.members {
            match &member.kind {
                DeclKind::Record(inner) => {
                    self.emit_nested_tag(member, layout, pending);
                    let Some(type_name) = layout.name_of(member) else {
                        continue;
                    };
                    if !layout.is_embedded(member) {
                        continue;
                    }
                    let storage = cursor.close_run();
                    self.emit_bitfield_storage(storage);
                    cursor.place(inner.ty.size, inner.ty.align);
                    let field_name = format!("{ANONYMOUS_FIELD}{embedded_fields}");
                    embedded_fields += 1;
                    self.out.line(format!("internal {type_name} {field_name};"));
                    let path = format!("{field_name}.");
                    for promoted in self.promoted_fields(inner, type_name, &path) {
                        self.emit_forwarding_property(&promoted);
                    }
                }
                DeclKind::Enum(_) => self.emit_nested_tag(member, layout, pending),
                DeclKind::Field(field) => self.emit_struct_field(member, field, &mut cursor),
                _ => {}
            }
        }
        let storage = cursor.finish(record.ty.size, record.ty.align);
        self.emit_bitfield_storage(storage);
    }

    fn emit_struct_field(&mut self, decl: &Decl, field: &Field, cursor: &mut FieldCursor) {
        if let Some(width) = field.bit_width {
            cursor.place_bitfield(width, field.ty.size.unwrap_or(4));
            return;
        }
        let storage = cursor.close_run();
        self.emit_bitfield_storage(storage);

        let Some(name) = decl.name.as_deref() else {
            return;
        };
        if matches!(field.ty.kind, TypeKind::IncompleteArray(_)) {
            debug!("skipping flexible array member `{name}`");
            return;
        }
        cursor.place(field.ty.size, field.ty.align);
        let ty = self.translator.translate_type(&field.ty);
        self.out
            .line(format!("public {ty} {};", member_name(name, &field.ty)));
    }

    fn emit_bitfield_storage(&mut self, storage: Vec<(usize, u64)>) {
        for (index, width) in storage {
            self.out.line(format!(
                "internal {} {BITFIELD_STORAGE}{index};",
                sized_integer(width, false)
            ));
        }
    }

    /// Collect the named members reachable through the embedded anonymous
    /// `record`.
    ///
    /// `qualifier` is how the enclosing record spells `record`'s synthetic
    /// type, `path` the access path to `record`'s storage.
    fn promoted_fields(&mut self, record: &Record, qualifier: &str, path: &str) -> Vec<Promoted> {
        let layout = MemberLayout::new(&record.members);
        let scope = layout
            .names
            .iter()
            .map(|(id, name)| (*id, format!("{qualifier}.{name}")))
            .collect();
        self.translator.push_anonymous_scope(scope);

        let mut promoted = Vec::new();
        let mut embedded_fields = 0;
        for member in &record.members {
            match &member.kind {
                DeclKind::Field(field)
                    if field.bit_width.is_none()
                        && !matches!(field.ty.kind, TypeKind::IncompleteArray(_)) =>
                {
                    let Some(name) = member.name.as_deref() else {
                        continue;
                    };
                    let name = member_name(name, &field.ty);
                    promoted.push(Promoted {
                        ty: self.translator.translate_type(&field.ty),
                        path: format!("{path}{name}"),
                        name,
                    });
                }
                DeclKind::Record(inner) if layout.is_embedded(member) => {
                    let Some(inner_name) = layout.name_of(member) else {
                        continue;
                    };
                    let inner_path = match record.kind {
                        RecordKind::Struct => {
                            embedded_fields += 1;
                            format!("{path}{ANONYMOUS_FIELD}{}.", embedded_fields - 1)
                        }
                        // Union members are already properties of the union.
                        RecordKind::Union => path.to_string(),
                    };
                    let inner_qualifier = format!("{qualifier}.{inner_name}");
                    promoted.extend(self.promoted_fields(inner, &inner_qualifier, &inner_path));
                }
                _ => {}
            }
        }

        self.translator.pop_anonymous_scope();
        promoted
    }

    fn emit_forwarding_property(&mut self, promoted: &Promoted) {
        let Promoted { name, path, ty } = promoted;
        self.out.line(format!("public property {ty} {name}"));
        self.out.line("{");
        self.out.push_indent();
        self.out.line("get {");
        self.out.push_indent();
        self.out.line(format!("return {path};"));
        self.out.pop_indent();
        self.out.line("}");
        self.out.line("set {");
        self.out.push_indent();
        self.out.line(format!("{path} = newValue;"));
        self.out.pop_indent();
        self.out.line("}");
        self.out.pop_indent();
        self.out.line("}");
    }

    fn emit_union_members<'d>(
        &mut self,
        record: &'d Record,
        layout: &MemberLayout<'d>,
        pending: &mut VecDeque<&'d Decl>,
    ) {
        let overlay = UnionOverlay::for_record(record, layout);
        self.out.line(format!(
            "internal {} {BACKING_MEMORY}[{}];",
            overlay.element_type(),
            overlay.len
        ));

        for member in &record.members {
            if matches!(member.kind, DeclKind::Record(_) | DeclKind::Enum(_)) {
                self.emit_nested_tag(member, layout, pending);
            }
        }

        for member in &record.members {
            match &member.kind {
                DeclKind::Field(field) => {
                    if let Some(name) = member.name.as_deref() {
                        self.emit_union_field(overlay, name, &field.ty);
                    }
                }
                DeclKind::Record(inner) if layout.is_embedded(member) => {
                    if let Some(type_name) = layout.name_of(member) {
                        self.emit_union_embedded(overlay, type_name, inner);
                    }
                }
                _ => {}
            }
        }
    }

    fn emit_union_field(&mut self, overlay: UnionOverlay, name: &str, ty: &Type) {
        let type_name = self.translator.translate_type(ty);
        let name = member_name(name, ty);
        let adapter = format!("{ADAPTER}_{name}");
        self.emit_adapter(overlay, &adapter, &type_name, ty.size.unwrap_or(0));
        self.emit_overlay_property(overlay, &adapter, &type_name, &name, "value", false);
    }

    fn emit_union_embedded(&mut self, overlay: UnionOverlay, type_name: &str, record: &Record) {
        let adapter = format!("{ADAPTER}{type_name}");
        self.emit_adapter(overlay, &adapter, type_name, record.ty.size.unwrap_or(0));
        for promoted in self.promoted_fields(record, type_name, "value.") {
            self.emit_overlay_property(
                overlay,
                &adapter,
                &promoted.ty,
                &promoted.name,
                &promoted.path,
                true,
            );
        }
    }

    /// Declare a struct holding a `type_name` padded to the backing store width.
    fn emit_adapter(&mut self, overlay: UnionOverlay, adapter: &str, type_name: &str, size: u64) {
        let padding = overlay.byte_width().saturating_sub(size);
        let pad = if padding > 0 {
            format!(" uint8_t pad[{padding}];")
        } else {
            String::new()
        };
        self.out
            .line(format!("internal struct {adapter} {{ {type_name} value;{pad} }};"));
    }

    /// Expose `path` inside an adapter as a property backed by the union's
    /// storage.
    ///
    /// When the adapter holds more than the property (`partial`), a write
    /// loads the current contents first so the rest survives.
    fn emit_overlay_property(
        &mut self,
        overlay: UnionOverlay,
        adapter: &str,
        type_name: &str,
        property: &str,
        path: &str,
        partial: bool,
    ) {
        let load = format!("{adapter} tmp = reinterpret<{adapter}>({BACKING_MEMORY});");
        self.out.line(format!("public property {type_name} {property}"));
        self.out.line("{");
        self.out.push_indent();

        self.out.line("get {");
        self.out.push_indent();
        self.out.line(&load);
        self.out.line(format!("return tmp.{path};"));
        self.out.pop_indent();
        self.out.line("}");

        self.out.line("set {");
        self.out.push_indent();
        if partial {
            self.out.line(&load);
        } else {
            self.out.line(format!("{adapter} tmp;"));
        }
        self.out.line(format!("tmp.{path} = newValue;"));
        self.out.line(format!(
            "{BACKING_MEMORY} = reinterpret<{}>(tmp);",
            overlay.array_type()
        ));
        self.out.pop_indent();
        self.out.line("}");

        self.out.pop_indent();
        self.out.line("}");
    }
}
