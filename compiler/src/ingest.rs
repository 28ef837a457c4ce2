//! Turns a [`ProtocolSchema`] plus its transitive dependencies into the
//! inputs the type and conversion pipelines expect: a definition-order
//! closure of qualified names, an MIR type table, and name-resolved
//! conversion declarations. Catches the structural problems that are
//! meaningless to check per-pass: unknown identifiers, duplicate
//! definitions, reference cycles, and out-of-order use.

use std::collections::HashSet;

use indexmap::IndexMap;
use protocol_schema::{
    ConversionDecl, ConversionSpec, FieldMapping, ProtocolSchema, RootConstant, RootTypeDef,
    SchemaRegistry, Type as SchemaType, VariantRef as SchemaVariantRef,
};

use crate::conversions::mir::{
    ResolvedConversionSpec, ResolvedEnumConversion, ResolvedFieldMapping, ResolvedStructConversion,
    ResolvedVariantConversion,
};
use crate::error::CompileError;
use crate::qname::QName;
use crate::types::mir;

const KEYWORDS: &[&str] = &[
    "struct", "enum", "variant", "hashvariant", "type", "const", "protocol", "import", "true",
    "false", "self", "this",
    // common target-language keywords
    "for", "while", "in", "auto", "volatile", "def", "void", "not", "and", "or", "none",
    "return", "int", "long", "signed", "unsigned", "double", "float", "bool", "class", "public",
    "private", "protected", "final", "default", "new", "delete",
    // generator-reserved method names
    "parse", "build", "size_bytes", "serialize", "serialize_into",
];

/// Forbidden identifier suffixes: these mark names the compiler and code
/// generators synthesize for themselves, so a user-declared name can never
/// end with one.
const FORBIDDEN_SUFFIXES: &[&str] = &["View", "Tag"];

pub fn valid_identifier(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    // leading underscore is reserved for generator-introduced names, and a
    // trailing underscore for compiler-synthesized ones (see variant/seq
    // expansion), so user identifiers may carry neither.
    let mut chars = name.chars();
    let first = chars.next().unwrap();
    if !first.is_ascii_alphabetic() {
        return false;
    }
    if !chars.clone().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    if name.ends_with('_') {
        return false;
    }
    if KEYWORDS.contains(&name.to_ascii_lowercase().as_str()) {
        return false;
    }
    if FORBIDDEN_SUFFIXES.iter().any(|suf| name.ends_with(suf)) {
        return false;
    }
    true
}

pub fn valid_qname(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(valid_identifier)
}

/// Protocol names additionally may not contain an underscore anywhere.
pub fn valid_protocol_name(name: &str) -> bool {
    valid_qname(name) && !name.contains('_')
}

pub struct Ingested {
    pub protocol_name: QName,
    /// Leaves-first closure of every type reachable from this protocol,
    /// including types owned by other protocols it depends on.
    pub type_order: Vec<QName>,
    pub types: IndexMap<QName, mir::RootType>,
    pub constants: Vec<(QName, RootConstant)>,
    pub conversions: Vec<ResolvedConversionSpec>,
}

struct Ingester<'a> {
    registry: &'a SchemaRegistry,
    protocol_name: QName,
    /// bare-name -> qualified name, for names declared directly in the
    /// protocol under compilation.
    local_names: IndexMap<String, QName>,
    defined: HashSet<QName>,
    pending: HashSet<QName>,
    type_order: Vec<QName>,
    types: IndexMap<QName, mir::RootType>,
    errors: Vec<CompileError>,
}

pub fn ingest(registry: &SchemaRegistry, protocol_name: &str) -> Result<Ingested, Vec<CompileError>> {
    let proto = registry
        .get(protocol_name)
        .ok_or_else(|| vec![CompileError::UnknownProtocol(QName::single(protocol_name))])?;

    let mut errors = Vec::new();
    if !valid_protocol_name(protocol_name) {
        errors.push(CompileError::InvalidIdentifier(protocol_name.to_string()));
    }

    let protocol_qname = QName::from_dotted(protocol_name);
    let mut local_names = IndexMap::new();
    for located in &proto.types {
        let name = located.value.name();
        if !valid_identifier(name) {
            errors.push(CompileError::InvalidIdentifier(name.to_string()));
            continue;
        }
        let qname = protocol_qname.append(&QName::single(name));
        if local_names.insert(name.to_string(), qname.clone()).is_some() {
            errors.push(CompileError::DuplicateType(qname));
        }
    }
    for located in &proto.constants {
        if !valid_identifier(located.value.name()) {
            errors.push(CompileError::InvalidIdentifier(located.value.name().to_string()));
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut ingester = Ingester {
        registry,
        protocol_name: protocol_qname.clone(),
        local_names,
        defined: HashSet::new(),
        pending: HashSet::new(),
        type_order: Vec::new(),
        types: IndexMap::new(),
        errors: Vec::new(),
    };

    for located in &proto.types {
        ingester.visit_local(&located.value);
    }

    if !ingester.errors.is_empty() {
        return Err(ingester.errors);
    }

    let mut constants = Vec::new();
    for located in &proto.constants {
        let qname = protocol_qname.append(&QName::single(located.value.name()));
        constants.push((qname, located.value.clone()));
    }

    let mut conversions = Vec::new();
    for located in &proto.conversions {
        match &located.value {
            ConversionDecl::Direct(spec) => match ingester.resolve_conversion_spec(spec) {
                Ok(r) => conversions.push(r),
                Err(e) => ingester.errors.push(e),
            },
            ConversionDecl::FromPrior(fp) => {
                ingester.expand_from_prior(fp, proto, &mut conversions);
            }
        }
    }

    if !ingester.errors.is_empty() {
        return Err(ingester.errors);
    }

    let mut seen: HashSet<(QName, QName)> = HashSet::new();
    for spec in &conversions {
        let (src, target) = (spec.src().clone(), spec.target().clone());
        if src == target {
            ingester.errors.push(CompileError::IdentityConversionDisallowed { src, target });
            continue;
        }
        if !seen.insert((src.clone(), target.clone())) {
            ingester.errors.push(CompileError::DuplicateConversion { src, target });
            continue;
        }
        if src.namespace() != protocol_qname && target.namespace() != protocol_qname {
            ingester.errors.push(CompileError::ConversionWrongProtocol {
                src,
                target,
                protocol: protocol_qname.clone(),
            });
        }
    }
    if !ingester.errors.is_empty() {
        return Err(ingester.errors);
    }

    Ok(Ingested {
        protocol_name: protocol_qname,
        type_order: ingester.type_order,
        types: ingester.types,
        constants,
        conversions,
    })
}

impl<'a> Ingester<'a> {
    fn resolve(&mut self, raw: &str) -> Option<QName> {
        match self.resolve_quiet(raw) {
            Some(q) => Some(q),
            None => {
                if raw.contains('.') {
                    self.errors.push(CompileError::UnknownProtocol(QName::from_dotted(raw).namespace()));
                } else {
                    self.errors.push(CompileError::UnknownType(QName::single(raw)));
                }
                None
            }
        }
    }

    /// Same resolution rules as [`Self::resolve`] but without recording an
    /// error on failure -- for call sites (like override matching) that
    /// only need to know whether a name resolves, and where the real
    /// resolution (with its error) happens again at the call site that
    /// actually consumes the conversion.
    fn resolve_quiet(&self, raw: &str) -> Option<QName> {
        if raw.contains('.') {
            let qname = QName::from_dotted(raw);
            let proto = qname.namespace();
            if self.registry.get(&proto.to_string()).is_none() {
                return None;
            }
            Some(qname)
        } else {
            self.local_names.get(raw).cloned()
        }
    }

    /// Ensure the type named by `qname` is fully visited (and thus present
    /// in `self.types`/`self.type_order`), pulling its definition from an
    /// external protocol's registry entry if it is not local.
    fn ensure_defined(&mut self, qname: &QName) {
        if self.defined.contains(qname) {
            return;
        }
        if self.pending.contains(qname) {
            self.errors.push(CompileError::TypeCycle(qname.clone()));
            return;
        }
        if qname.namespace() == self.protocol_name {
            // Already visited via visit_local during the initial walk, or
            // will be shortly; nothing further to pull in.
            if !self.types.contains_key(qname) {
                self.errors.push(CompileError::UnknownType(qname.clone()));
            }
            return;
        }
        let proto_name = qname.namespace().to_string();
        let Some(proto) = self.registry.get(&proto_name) else {
            self.errors.push(CompileError::UnknownProtocol(qname.namespace()));
            return;
        };
        let Some(located) = proto.types.iter().find(|t| t.value.name() == qname.name()) else {
            self.errors.push(CompileError::UnknownType(qname.clone()));
            return;
        };
        let def = located.value.clone();
        self.visit_def(qname, &def);
    }

    fn visit_local(&mut self, def: &RootTypeDef) {
        let qname = self.protocol_name.append(&QName::single(def.name()));
        if self.defined.contains(&qname) {
            return;
        }
        self.visit_def(&qname, def);
    }

    fn visit_def(&mut self, qname: &QName, def: &RootTypeDef) {
        if self.defined.contains(qname) {
            return;
        }
        if self.pending.contains(qname) {
            self.errors.push(CompileError::TypeCycle(qname.clone()));
            return;
        }
        self.pending.insert(qname.clone());

        let root = match def {
            RootTypeDef::Struct(s) => {
                let mut fields = indexmap::IndexMap::new();
                for f in &s.fields {
                    let t = self.lower_type(&f.field_type);
                    fields.insert(f.name.clone(), t);
                }
                mir::RootType::Struct(mir::Struct { name: qname.clone(), fields })
            }
            RootTypeDef::Enum(e) => {
                let mut variants = indexmap::IndexMap::new();
                for (name, value) in &e.variants {
                    variants.insert(name.clone(), *value);
                }
                mir::RootType::Enum(mir::Enum {
                    name: qname.clone(),
                    underlying_type: e.underlying,
                    variants,
                })
            }
            RootTypeDef::Variant(v) => {
                let mut tags = indexmap::IndexMap::new();
                for (member, tag) in &v.variants {
                    if let Some(member_q) = self.resolve(member) {
                        self.ensure_defined(&member_q);
                        tags.insert(mir::StructRef(member_q), *tag);
                    }
                }
                mir::RootType::Variant(mir::Variant::Fixed(mir::FixedVariant {
                    name: qname.clone(),
                    tag_type: v.tag_type,
                    tags,
                }))
            }
            RootTypeDef::HashVariant(v) => {
                let mut hash_types = indexmap::IndexSet::new();
                for member in &v.hash_types {
                    if let Some(member_q) = self.resolve(member) {
                        self.ensure_defined(&member_q);
                        hash_types.insert(mir::StructRef(member_q));
                    }
                }
                mir::RootType::Variant(mir::Variant::Hash(mir::HashVariant {
                    name: qname.clone(),
                    tag_type: v.tag_type,
                    hash_types,
                }))
            }
        };

        self.pending.remove(qname);
        self.defined.insert(qname.clone());
        self.type_order.push(qname.clone());
        self.types.insert(qname.clone(), root);
    }

    fn lower_type(&mut self, t: &SchemaType) -> mir::Type {
        match t {
            SchemaType::Int(i) => mir::Type::Int(*i),
            SchemaType::Float(f) => mir::Type::Float(*f),
            SchemaType::Seq { inner, length } => {
                let inner = Box::new(self.lower_type(inner));
                match length {
                    protocol_schema::SeqLength::Fixed(n) => {
                        mir::Type::Seq { inner, length: mir::Length::Fixed(*n) }
                    }
                    protocol_schema::SeqLength::FieldRef(f) => mir::Type::Seq {
                        inner,
                        length: mir::Length::Variable(mir::FieldReference(f.0.clone())),
                    },
                    protocol_schema::SeqLength::Prefixed(length_type) => {
                        mir::Type::UnboundSeq { inner, length_type: *length_type }
                    }
                }
            }
            SchemaType::DetachedVariant { variant, tag } => {
                let variant_name = match variant {
                    SchemaVariantRef::Variant(n) | SchemaVariantRef::HashVariant(n) => n,
                };
                let variant_q = self.resolve(variant_name);
                if let Some(q) = &variant_q {
                    self.ensure_defined(q);
                }
                mir::Type::DetachedVariant {
                    variant: mir::VariantRef(variant_q.unwrap_or_else(|| QName::single("?"))),
                    tag: mir::FieldReference(tag.0.clone()),
                }
            }
            SchemaType::Virtual { inner } => mir::Type::Virtual(Box::new(self.lower_type(inner))),
            SchemaType::StructRef(n) => {
                let q = self.resolve(n);
                if let Some(q) = &q {
                    self.ensure_defined(q);
                }
                mir::Type::StructRef(mir::StructRef(q.unwrap_or_else(|| QName::single("?"))))
            }
            SchemaType::EnumRef(n) => {
                let q = self.resolve(n);
                if let Some(q) = &q {
                    self.ensure_defined(q);
                }
                mir::Type::EnumRef(mir::EnumRef(q.unwrap_or_else(|| QName::single("?"))))
            }
            SchemaType::VariantRef(n) | SchemaType::HashVariantRef(n) => {
                let q = self.resolve(n);
                if let Some(q) = &q {
                    self.ensure_defined(q);
                }
                mir::Type::VariantRef(mir::VariantRef(q.unwrap_or_else(|| QName::single("?"))))
            }
        }
    }

    fn resolve_conversion_spec(
        &mut self,
        spec: &ConversionSpec,
    ) -> Result<ResolvedConversionSpec, CompileError> {
        let src = self
            .resolve(spec.src())
            .ok_or_else(|| CompileError::UnknownType(QName::single(spec.src())))?;
        let target = self
            .resolve(spec.target())
            .ok_or_else(|| CompileError::UnknownType(QName::single(spec.target())))?;
        // A conversion may be the only thing in this protocol that mentions
        // a type from another protocol (no field anywhere references it),
        // so pull it into the type closure here rather than relying on
        // `lower_type`'s field-reference walk to have already done it.
        self.ensure_defined(&src);
        self.ensure_defined(&target);
        Ok(match spec {
            ConversionSpec::NoConversion { .. } => {
                ResolvedConversionSpec::NoConversion { src, target }
            }
            ConversionSpec::Enum(e) => ResolvedConversionSpec::Enum(ResolvedEnumConversion {
                src,
                target,
                mapping: e.mapping.clone(),
            }),
            ConversionSpec::Struct(s) => {
                let mapping = s
                    .mapping
                    .iter()
                    .map(|(field, m)| {
                        let resolved = match m {
                            FieldMapping::IntDefault(v) => ResolvedFieldMapping::IntDefault(*v),
                            FieldMapping::EnumDefault { enum_name, variant_name } => {
                                let enum_q = self
                                    .resolve(enum_name)
                                    .unwrap_or_else(|| QName::single(enum_name.clone()));
                                ResolvedFieldMapping::EnumDefault {
                                    enum_name: enum_q,
                                    variant_name: variant_name.clone(),
                                }
                            }
                            FieldMapping::FromField(f) => ResolvedFieldMapping::FromField(f.clone()),
                        };
                        (field.clone(), resolved)
                    })
                    .collect();
                ResolvedConversionSpec::Struct(ResolvedStructConversion { src, target, mapping })
            }
            ConversionSpec::Variant(v) => {
                let mapping = v
                    .mapping
                    .iter()
                    .map(|(member, target_member)| {
                        let member_q = self
                            .resolve(member)
                            .unwrap_or_else(|| QName::single(member.clone()));
                        let target_q = target_member
                            .as_ref()
                            .map(|t| self.resolve(t).unwrap_or_else(|| QName::single(t.clone())));
                        (member_q, target_q)
                    })
                    .collect();
                ResolvedConversionSpec::Variant(ResolvedVariantConversion { src, target, mapping })
            }
        })
    }

    fn expand_from_prior(
        &mut self,
        fp: &protocol_schema::ConversionsFromPrior,
        current: &ProtocolSchema,
        out: &mut Vec<ResolvedConversionSpec>,
    ) {
        let Some(prior) = self.registry.get(&fp.prior_protocol) else {
            self.errors.push(CompileError::UnknownProtocol(QName::from_dotted(&fp.prior_protocol)));
            return;
        };
        let prior_qname = QName::from_dotted(&fp.prior_protocol);

        // Overrides are keyed by the exact (src, target) pair they replace,
        // since a user may want an upgrade conversion synthesized but a
        // downgrade hand-written (or vice versa). Resolved through the same
        // name resolution the explicit conversions below go through, so an
        // unqualified override naming a local type matches the qualified
        // pair the implicit-expansion loop compares against.
        let mut overridden: HashSet<(QName, QName)> = HashSet::new();
        for spec in &fp.overrides {
            if let (Some(src), Some(target)) =
                (self.resolve_quiet(spec.src()), self.resolve_quiet(spec.target()))
            {
                overridden.insert((src, target));
            }
        }

        for located in &current.types {
            let name = located.value.name();
            let Some(prior_def) = prior.types.iter().find(|t| t.value.name() == name) else {
                continue;
            };
            let prior_q = prior_qname.append(&QName::single(name));
            let current_q = self.protocol_name.append(&QName::single(name));
            // `current_q` is already in the type closure (every locally
            // declared type is visited up front); `prior_q` needs pulling
            // in explicitly since nothing in this protocol's own fields
            // necessarily references it.
            self.ensure_defined(&prior_q);
            // Only an exact match of root-type kind gets an implicit
            // conversion; a hash variant never participates (neither as
            // source nor target), matching or not.
            self.try_implicit_conversion(&overridden, &prior_def.value, &prior_q, &located.value, &current_q, out);
            self.try_implicit_conversion(&overridden, &located.value, &current_q, &prior_def.value, &prior_q, out);
        }

        for spec in &fp.overrides {
            match self.resolve_conversion_spec(spec) {
                Ok(r) => out.push(r),
                Err(e) => self.errors.push(e),
            }
        }
    }

    fn try_implicit_conversion(
        &self,
        overridden: &HashSet<(QName, QName)>,
        src_def: &RootTypeDef,
        src: &QName,
        target_def: &RootTypeDef,
        target: &QName,
        out: &mut Vec<ResolvedConversionSpec>,
    ) {
        if overridden.contains(&(src.clone(), target.clone())) {
            return;
        }
        let synthesized = match (src_def, target_def) {
            (RootTypeDef::Enum(_), RootTypeDef::Enum(_)) => {
                Some(ResolvedConversionSpec::Enum(ResolvedEnumConversion {
                    src: src.clone(),
                    target: target.clone(),
                    mapping: Vec::new(),
                }))
            }
            (RootTypeDef::Struct(_), RootTypeDef::Struct(_)) => {
                Some(ResolvedConversionSpec::Struct(ResolvedStructConversion {
                    src: src.clone(),
                    target: target.clone(),
                    mapping: Vec::new(),
                }))
            }
            (RootTypeDef::Variant(_), RootTypeDef::Variant(_)) => {
                Some(ResolvedConversionSpec::Variant(ResolvedVariantConversion {
                    src: src.clone(),
                    target: target.clone(),
                    mapping: Vec::new(),
                }))
            }
            _ => None,
        };
        if let Some(spec) = synthesized {
            out.push(spec);
        }
    }
}
