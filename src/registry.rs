//! Runtime schema registry
//!
//! Parses a serialized `FileDescriptorSet` and resolves every message and
//! enum type it declares, nested types included, into queryable layouts
//! keyed by fully-qualified name. Construction is atomic: a descriptor set
//! that does not parse, redefines a type, or references a type it never
//! declares is rejected as a whole and no registry is created. Once built,
//! the registry is immutable and safe to share across concurrent decode and
//! encode calls.

use std::collections::HashMap;

use prost::Message as _;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorSet,
};

use crate::descriptor::{
    Cardinality, EnumDescriptor, FieldDescriptor, FieldKind, TypeDescriptor, TypeId,
};
use crate::error::{Error, Result};

#[derive(Debug)]
enum Ty {
    Message(TypeDescriptor),
    Enum(EnumDescriptor),
}

enum Pending<'a> {
    Message { proto: &'a DescriptorProto, proto3: bool },
    Enum(&'a EnumDescriptorProto),
}

/// Immutable lookup from fully-qualified type name to resolved layout
#[derive(Debug)]
pub struct Registry {
    types: Vec<Ty>,
    by_name: HashMap<String, TypeId>,
    top_level: Vec<String>,
}

impl Registry {
    /// Build a registry from serialized `FileDescriptorSet` bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let set = FileDescriptorSet::decode(bytes)
            .map_err(|e| Error::MalformedDescriptor(e.to_string()))?;
        Self::from_descriptor_set(&set)
    }

    /// Build a registry from an already-parsed descriptor set
    pub fn from_descriptor_set(set: &FileDescriptorSet) -> Result<Self> {
        // Pass 1: register every declared type name, nested types included.
        let mut pending: Vec<(String, Pending<'_>)> = Vec::new();
        let mut top_level = Vec::new();
        for file in &set.file {
            let proto3 = file.syntax() == "proto3";
            let package = file.package();
            for message in &file.message_type {
                top_level.push(join(package, message.name()));
                collect_message(package, message, proto3, &mut pending)?;
            }
            for decl in &file.enum_type {
                pending.push((join(package, decl.name()), Pending::Enum(decl)));
            }
        }

        let mut by_name = HashMap::with_capacity(pending.len());
        for (index, (name, _)) in pending.iter().enumerate() {
            if by_name.insert(name.clone(), TypeId(index)).is_some() {
                return Err(Error::MalformedDescriptor(format!(
                    "type '{name}' is defined more than once"
                )));
            }
        }

        // Pass 2: resolve field layouts against the complete name table.
        let types = pending
            .iter()
            .map(|(name, entry)| match entry {
                Pending::Message { proto, proto3 } => {
                    build_message(name, proto, *proto3, &by_name, &pending).map(Ty::Message)
                }
                Pending::Enum(decl) => Ok(Ty::Enum(build_enum(name, decl))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            types,
            by_name,
            top_level,
        })
    }

    /// Resolve a fully-qualified message type name to its layout
    pub fn lookup(&self, name: &str) -> Result<&TypeDescriptor> {
        match self.by_name.get(name).map(|id| &self.types[id.0]) {
            Some(Ty::Message(descriptor)) => Ok(descriptor),
            _ => Err(Error::UnknownSchema(name.to_string())),
        }
    }

    /// Resolve a fully-qualified enum type name, if declared
    pub fn lookup_enum(&self, name: &str) -> Option<&EnumDescriptor> {
        match self.by_name.get(name).map(|id| &self.types[id.0]) {
            Some(Ty::Enum(descriptor)) => Some(descriptor),
            _ => None,
        }
    }

    /// Layout behind a resolved message reference
    pub(crate) fn message(&self, id: TypeId) -> &TypeDescriptor {
        match &self.types[id.0] {
            Ty::Message(descriptor) => descriptor,
            // construction rejects message references that name an enum
            Ty::Enum(_) => unreachable!("type id does not name a message"),
        }
    }

    /// Fully-qualified names of all top-level message types, in declaration
    /// order across the input file list then within each file
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.top_level.iter().map(String::as_str)
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn collect_message<'a>(
    prefix: &str,
    message: &'a DescriptorProto,
    proto3: bool,
    out: &mut Vec<(String, Pending<'a>)>,
) -> Result<()> {
    if message.name().is_empty() {
        return Err(Error::MalformedDescriptor(
            "message type with an empty name".to_string(),
        ));
    }
    let fq = join(prefix, message.name());
    out.push((fq.clone(), Pending::Message { proto: message, proto3 }));
    for nested in &message.nested_type {
        collect_message(&fq, nested, proto3, out)?;
    }
    for decl in &message.enum_type {
        out.push((join(&fq, decl.name()), Pending::Enum(decl)));
    }
    Ok(())
}

fn build_message(
    fq: &str,
    proto: &DescriptorProto,
    proto3: bool,
    by_name: &HashMap<String, TypeId>,
    pending: &[(String, Pending<'_>)],
) -> Result<TypeDescriptor> {
    let fields = proto
        .field
        .iter()
        .map(|field| build_field(fq, field, proto3, by_name, pending))
        .collect::<Result<Vec<_>>>()?;
    TypeDescriptor::new(fq.to_string(), fields)
}

fn build_field(
    fq: &str,
    field: &FieldDescriptorProto,
    proto3: bool,
    by_name: &HashMap<String, TypeId>,
    pending: &[(String, Pending<'_>)],
) -> Result<FieldDescriptor> {
    let number = field.number();
    if number <= 0 {
        return Err(Error::MalformedDescriptor(format!(
            "field '{}' of '{fq}' has invalid number {number}",
            field.name()
        )));
    }

    let cardinality = match field.label() {
        Label::Optional => Cardinality::Optional,
        Label::Required => Cardinality::Required,
        Label::Repeated => Cardinality::Repeated,
    };

    let kind = match field.r#type() {
        Type::Double => FieldKind::Double,
        Type::Float => FieldKind::Float,
        Type::Int64 => FieldKind::Int64,
        Type::Uint64 => FieldKind::Uint64,
        Type::Int32 => FieldKind::Int32,
        Type::Fixed64 => FieldKind::Fixed64,
        Type::Fixed32 => FieldKind::Fixed32,
        Type::Bool => FieldKind::Bool,
        Type::String => FieldKind::String,
        Type::Bytes => FieldKind::Bytes,
        Type::Uint32 => FieldKind::Uint32,
        Type::Sfixed32 => FieldKind::Sfixed32,
        Type::Sfixed64 => FieldKind::Sfixed64,
        Type::Sint32 => FieldKind::Sint32,
        Type::Sint64 => FieldKind::Sint64,
        Type::Message => FieldKind::Message(resolve_ref(fq, field, by_name, pending, true)?),
        Type::Enum => FieldKind::Enum(resolve_ref(fq, field, by_name, pending, false)?),
        Type::Group => {
            return Err(Error::MalformedDescriptor(format!(
                "field '{}' of '{fq}' uses the legacy group encoding",
                field.name()
            )))
        }
    };

    let packed = cardinality == Cardinality::Repeated
        && kind.packable()
        && field
            .options
            .as_ref()
            .and_then(|options| options.packed)
            .unwrap_or(proto3);

    Ok(FieldDescriptor {
        number: number as u32,
        name: field.name().to_string(),
        kind,
        cardinality,
        packed,
    })
}

fn resolve_ref(
    fq: &str,
    field: &FieldDescriptorProto,
    by_name: &HashMap<String, TypeId>,
    pending: &[(String, Pending<'_>)],
    want_message: bool,
) -> Result<TypeId> {
    let target = field.type_name().trim_start_matches('.');
    let id = by_name.get(target).copied().ok_or_else(|| {
        Error::MalformedDescriptor(format!(
            "field '{}' of '{fq}' references unknown type '{target}'",
            field.name()
        ))
    })?;
    let matches = match &pending[id.0].1 {
        Pending::Message { .. } => want_message,
        Pending::Enum(_) => !want_message,
    };
    if !matches {
        return Err(Error::MalformedDescriptor(format!(
            "field '{}' of '{fq}' references '{target}' as the wrong kind of type",
            field.name()
        )));
    }
    Ok(id)
}

fn build_enum(fq: &str, decl: &EnumDescriptorProto) -> EnumDescriptor {
    EnumDescriptor::new(
        fq.to_string(),
        decl.value
            .iter()
            .map(|value| (value.name().to_string(), value.number()))
            .collect(),
    )
}
