//! Schema declaration model
//!
//! The structural representation handed over by the external parser and
//! handed on to the backend emitter. Every pass over the model consumes a
//! borrowed snapshot and builds a new one; nothing is edited in place.
//!
//! ```text
//! ProtoFile
//! ├── types: TypeElement (Message | Enum), nested inside messages
//! ├── services: Service → Rpc
//! └── extends: ExtendBlock → Field
//! ```

use serde::{Deserialize, Serialize};

/// Separator between the components of a fully-qualified name
pub const SEPARATOR: char = '.';

/// Built-in value types that never need a declaration lookup
pub const SCALAR_TYPES: &[&str] = &[
    "bool", "bytes", "double", "float", "fixed32", "fixed64", "int32", "int64", "sfixed32",
    "sfixed64", "sint32", "sint64", "string", "uint32", "uint64",
];

/// Returns true if `name` is a scalar keyword
pub fn is_scalar_type(name: &str) -> bool {
    SCALAR_TYPES.contains(&name)
}

/// Join a scope and a local name into a qualified name
pub fn join_name(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", scope, SEPARATOR, name)
    }
}

// =============================================================================
// Options and fields
// =============================================================================

/// A single `option name = value` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionElement {
    pub name: String,
    pub value: serde_json::Value,
    /// Custom options are written `(name)` in source
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_parenthesized: bool,
}

impl OptionElement {
    pub fn new(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_parenthesized: false,
        }
    }
}

/// Field cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Optional,
    Required,
    Repeated,
}

/// A message or extension field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub label: Label,
    /// Type reference: scalar keyword, relative name, or `.`-prefixed absolute name
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    pub tag: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionElement>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub packed: bool,
}

impl Field {
    pub fn new(label: Label, type_name: impl Into<String>, name: impl Into<String>, tag: u32) -> Self {
        Self {
            label,
            type_name: type_name.into(),
            name: name.into(),
            tag,
            documentation: String::new(),
            options: Vec::new(),
            packed: false,
        }
    }

    /// Copy of this field pointing at a different type
    pub fn with_type(&self, type_name: String) -> Self {
        Self {
            type_name,
            ..self.clone()
        }
    }

    /// True when the field type needs a declaration lookup
    pub fn is_reference(&self) -> bool {
        !is_scalar_type(&self.type_name)
    }
}

// =============================================================================
// Types
// =============================================================================

/// A reserved `extensions start to end;` range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRange {
    pub start: u32,
    pub end: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub name: String,
    #[serde(default)]
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<TypeElement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<ExtensionRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionElement>,
}

impl Message {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualified_name: String::new(),
            documentation: String::new(),
            fields: Vec::new(),
            nested: Vec::new(),
            extensions: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_nested(mut self, nested: impl Into<TypeElement>) -> Self {
        self.nested.push(nested.into());
        self
    }
}

/// A named enum constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumConstant {
    pub name: String,
    pub tag: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumElement {
    pub name: String,
    #[serde(default)]
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    #[serde(default)]
    pub constants: Vec<EnumConstant>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionElement>,
}

impl EnumElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualified_name: String::new(),
            documentation: String::new(),
            constants: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn with_constant(mut self, name: impl Into<String>, tag: i32) -> Self {
        self.constants.push(EnumConstant {
            name: name.into(),
            tag,
            documentation: String::new(),
            options: Vec::new(),
        });
        self
    }
}

/// A declaration that can appear at file level or nested inside a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeElement {
    Message(Message),
    Enum(EnumElement),
}

impl TypeElement {
    pub fn name(&self) -> &str {
        match self {
            Self::Message(m) => &m.name,
            Self::Enum(e) => &e.name,
        }
    }

    pub fn qualified_name(&self) -> &str {
        match self {
            Self::Message(m) => &m.qualified_name,
            Self::Enum(e) => &e.qualified_name,
        }
    }

    pub fn nested(&self) -> &[TypeElement] {
        match self {
            Self::Message(m) => &m.nested,
            Self::Enum(_) => &[],
        }
    }

    pub fn as_declaration(&self) -> Declaration<'_> {
        match self {
            Self::Message(m) => Declaration::Message(m),
            Self::Enum(e) => Declaration::Enum(e),
        }
    }

    fn with_qualified_names(self, scope: &str) -> Self {
        match self {
            Self::Message(mut message) => {
                if message.qualified_name.is_empty() {
                    message.qualified_name = join_name(scope, &message.name);
                }
                let parent = message.qualified_name.clone();
                message.nested = message
                    .nested
                    .into_iter()
                    .map(|nested| nested.with_qualified_names(&parent))
                    .collect();
                Self::Message(message)
            }
            Self::Enum(mut element) => {
                if element.qualified_name.is_empty() {
                    element.qualified_name = join_name(scope, &element.name);
                }
                Self::Enum(element)
            }
        }
    }
}

impl From<Message> for TypeElement {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

impl From<EnumElement> for TypeElement {
    fn from(element: EnumElement) -> Self {
        Self::Enum(element)
    }
}

// =============================================================================
// Services and extensions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rpc {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    pub request_type: String,
    pub response_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionElement>,
}

impl Rpc {
    pub fn new(
        name: impl Into<String>,
        request_type: impl Into<String>,
        response_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            documentation: String::new(),
            request_type: request_type.into(),
            response_type: response_type.into(),
            options: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    #[serde(default)]
    pub rpcs: Vec<Rpc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionElement>,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualified_name: String::new(),
            documentation: String::new(),
            rpcs: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn with_rpc(mut self, rpc: Rpc) -> Self {
        self.rpcs.push(rpc);
        self
    }
}

/// `extend Target { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendBlock {
    /// Type reference of the extended message
    pub target: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl ExtendBlock {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            documentation: String::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}

// =============================================================================
// Files and declarations
// =============================================================================

/// One parsed `.proto` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtoFile {
    pub path: String,
    #[serde(default)]
    pub package: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub public_dependencies: Vec<String>,
    #[serde(default)]
    pub types: Vec<TypeElement>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<ExtendBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionElement>,
}

impl ProtoFile {
    pub fn new(path: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            package: package.into(),
            dependencies: Vec::new(),
            public_dependencies: Vec::new(),
            types: Vec::new(),
            services: Vec::new(),
            extends: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn with_type(mut self, element: impl Into<TypeElement>) -> Self {
        self.types.push(element.into());
        self
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_extend(mut self, extend: ExtendBlock) -> Self {
        self.extends.push(extend);
        self
    }

    /// Copy of this file with different declaration lists
    pub fn rebuild(
        &self,
        types: Vec<TypeElement>,
        services: Vec<Service>,
        extends: Vec<ExtendBlock>,
    ) -> Self {
        Self {
            path: self.path.clone(),
            package: self.package.clone(),
            dependencies: self.dependencies.clone(),
            public_dependencies: self.public_dependencies.clone(),
            types,
            services,
            extends,
            options: self.options.clone(),
        }
    }

    /// Fill in every empty `qualified_name` from the package and enclosing
    /// messages. Names already present are left as they are.
    pub fn with_qualified_names(mut self) -> Self {
        let package = self.package.clone();
        self.types = self
            .types
            .into_iter()
            .map(|t| t.with_qualified_names(&package))
            .collect();
        for service in &mut self.services {
            if service.qualified_name.is_empty() {
                service.qualified_name = join_name(&package, &service.name);
            }
        }
        self
    }

    /// Top-level declarations in file order: types, then services, then extends
    pub fn declarations(&self) -> impl Iterator<Item = Declaration<'_>> {
        self.types
            .iter()
            .map(TypeElement::as_declaration)
            .chain(self.services.iter().map(Declaration::Service))
            .chain(self.extends.iter().map(Declaration::Extend))
    }
}

/// Borrowed view over any declaration kind
#[derive(Debug, Clone, Copy)]
pub enum Declaration<'a> {
    Message(&'a Message),
    Enum(&'a EnumElement),
    Service(&'a Service),
    Extend(&'a ExtendBlock),
}

impl<'a> Declaration<'a> {
    /// Fully-qualified name; extend blocks are anonymous
    pub fn qualified_name(&self) -> Option<&'a str> {
        match *self {
            Self::Message(m) => Some(&m.qualified_name),
            Self::Enum(e) => Some(&e.qualified_name),
            Self::Service(s) => Some(&s.qualified_name),
            Self::Extend(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Enum(_) => "enum",
            Self::Service(_) => "service",
            Self::Extend(_) => "extend",
        }
    }
}
