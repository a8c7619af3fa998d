//! Name Qualification Pass
//!
//! Rewrites every type reference in the model to a fully-qualified name.
//!
//! Lookup works like nested C++ namespaces: the innermost scope is searched
//! first, then each enclosing scope, with a package treated as inner to its
//! parent package. A leading `.` starts from the outermost scope instead.
//!
//! | Reference site          | Starting scope                     |
//! |-------------------------|------------------------------------|
//! | `Message.fields[].type` | the message's fully-qualified name |
//! | `Rpc.request/response`  | the service's fully-qualified name |
//! | `ExtendBlock.target`    | the file package                   |
//! | `ExtendBlock.fields[]`  | the file package                   |

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::error::{Result, SchemaError};
use crate::schema::{
    is_scalar_type, join_name, ExtendBlock, Field, Message, ProtoFile, Rpc, Service, TypeElement,
    SEPARATOR,
};

/// Collect the fully-qualified name of every message and enum, at every depth
pub fn collect_type_names(files: &[ProtoFile]) -> HashSet<String> {
    fn visit(element: &TypeElement, names: &mut HashSet<String>) {
        names.insert(element.qualified_name().to_string());
        for nested in element.nested() {
            visit(nested, names);
        }
    }

    let mut names = HashSet::new();
    for file in files {
        for element in &file.types {
            visit(element, &mut names);
        }
    }
    names
}

/// Resolve `reference` as written inside `scope` to a fully-qualified name.
pub fn resolve_type(all_names: &HashSet<String>, scope: &str, reference: &str) -> Result<String> {
    if is_scalar_type(reference) || all_names.contains(reference) {
        return Ok(reference.to_string());
    }

    if let Some(absolute) = reference.strip_prefix(SEPARATOR) {
        if all_names.contains(absolute) {
            return Ok(absolute.to_string());
        }
    } else {
        let mut current = scope;
        while !current.is_empty() {
            let candidate = join_name(current, reference);
            if all_names.contains(&candidate) {
                trace!(reference, scope, resolved = %candidate, "resolved type");
                return Ok(candidate);
            }
            current = match current.rfind(SEPARATOR) {
                Some(index) => &current[..index],
                None => "",
            };
        }
    }

    Err(SchemaError::UnresolvedType {
        reference: reference.to_string(),
        scope: scope.to_string(),
    })
}

/// Qualify every reference in `files` against a precomputed name set
pub fn qualify_files(files: &[ProtoFile], all_names: &HashSet<String>) -> Result<Vec<ProtoFile>> {
    let mut qualified = Vec::with_capacity(files.len());
    for file in files {
        let types = file
            .types
            .iter()
            .map(|t| qualify_type(t, all_names))
            .collect::<Result<Vec<_>>>()?;
        let services = file
            .services
            .iter()
            .map(|s| qualify_service(s, all_names))
            .collect::<Result<Vec<_>>>()?;
        let extends = file
            .extends
            .iter()
            .map(|e| qualify_extend(&file.package, e, all_names))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            path = %file.path,
            types = types.len(),
            services = services.len(),
            extends = extends.len(),
            "qualified file"
        );
        qualified.push(file.rebuild(types, services, extends));
    }
    Ok(qualified)
}

/// Collect the name set and qualify in one step
pub fn qualify(files: &[ProtoFile]) -> Result<Vec<ProtoFile>> {
    let all_names = collect_type_names(files);
    qualify_files(files, &all_names)
}

/// Qualify a message (nested types first) or pass an enum through
pub fn qualify_type(element: &TypeElement, all_names: &HashSet<String>) -> Result<TypeElement> {
    match element {
        TypeElement::Message(message) => {
            let nested = message
                .nested
                .iter()
                .map(|n| qualify_type(n, all_names))
                .collect::<Result<Vec<_>>>()?;
            let fields = qualify_fields(&message.fields, &message.qualified_name, all_names)?;
            Ok(TypeElement::Message(Message {
                fields,
                nested,
                ..message.clone()
            }))
        }
        TypeElement::Enum(_) => Ok(element.clone()),
    }
}

pub fn qualify_service(service: &Service, all_names: &HashSet<String>) -> Result<Service> {
    let scope = &service.qualified_name;
    let rpcs = service
        .rpcs
        .iter()
        .map(|rpc| {
            Ok(Rpc {
                request_type: resolve_type(all_names, scope, &rpc.request_type)?,
                response_type: resolve_type(all_names, scope, &rpc.response_type)?,
                ..rpc.clone()
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Service {
        rpcs,
        ..service.clone()
    })
}

pub fn qualify_extend(
    package: &str,
    extend: &ExtendBlock,
    all_names: &HashSet<String>,
) -> Result<ExtendBlock> {
    Ok(ExtendBlock {
        target: resolve_type(all_names, package, &extend.target)?,
        documentation: extend.documentation.clone(),
        fields: qualify_fields(&extend.fields, package, all_names)?,
    })
}

fn qualify_fields(
    fields: &[Field],
    scope: &str,
    all_names: &HashSet<String>,
) -> Result<Vec<Field>> {
    fields
        .iter()
        .map(|field| Ok(field.with_type(resolve_type(all_names, scope, &field.type_name)?)))
        .collect()
}
