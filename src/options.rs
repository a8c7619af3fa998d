//! Option metadata stripping
//!
//! When option emission is turned off, backends must not see option values
//! or the `extend google.protobuf.*Options` blocks that declare custom
//! options. File-level options are kept: they carry backend settings such as
//! the target package.

use crate::schema::{ExtendBlock, Field, Message, ProtoFile, Service, TypeElement};

const FIELD_OPTIONS: &[&str] = &["google.protobuf.FieldOptions", "com.google.protobuf.FieldOptions"];
const MESSAGE_OPTIONS: &[&str] = &[
    "google.protobuf.MessageOptions",
    "com.google.protobuf.MessageOptions",
];

pub fn is_field_options(name: &str) -> bool {
    FIELD_OPTIONS.contains(&name)
}

pub fn is_message_options(name: &str) -> bool {
    MESSAGE_OPTIONS.contains(&name)
}

/// True for the descriptor option messages that custom options extend
pub fn is_option_type(name: &str) -> bool {
    is_field_options(name) || is_message_options(name)
}

/// New model without option values or option-extending extend blocks
pub fn strip_options(files: &[ProtoFile]) -> Vec<ProtoFile> {
    files
        .iter()
        .map(|file| {
            let types = file.types.iter().map(strip_type).collect();
            let services = file.services.iter().map(strip_service).collect();
            let extends = file
                .extends
                .iter()
                .filter(|e| !is_option_type(&e.target))
                .map(|e| ExtendBlock {
                    fields: e.fields.iter().map(strip_field).collect(),
                    ..e.clone()
                })
                .collect();
            file.rebuild(types, services, extends)
        })
        .collect()
}

fn strip_type(element: &TypeElement) -> TypeElement {
    match element {
        TypeElement::Message(message) => TypeElement::Message(Message {
            fields: message.fields.iter().map(strip_field).collect(),
            nested: message.nested.iter().map(strip_type).collect(),
            options: Vec::new(),
            ..message.clone()
        }),
        TypeElement::Enum(element) => {
            let mut element = element.clone();
            element.options.clear();
            for constant in &mut element.constants {
                constant.options.clear();
            }
            TypeElement::Enum(element)
        }
    }
}

fn strip_field(field: &Field) -> Field {
    Field {
        options: Vec::new(),
        ..field.clone()
    }
}

fn strip_service(service: &Service) -> Service {
    let mut service = service.clone();
    service.options.clear();
    for rpc in &mut service.rpcs {
        rpc.options.clear();
    }
    service
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumElement, Label, OptionElement, Rpc};

    #[test]
    fn test_option_type_names() {
        assert!(is_option_type("google.protobuf.FieldOptions"));
        assert!(is_option_type("com.google.protobuf.MessageOptions"));
        assert!(!is_option_type("google.protobuf.EnumOptions"));
        assert!(!is_option_type("pkg.FieldOptions"));
    }

    #[test]
    fn test_strip_options() {
        let mut field = Field::new(Label::Optional, "int32", "n", 1);
        field.options.push(OptionElement::new("deprecated", true));
        field.packed = true;

        let mut message = Message::new("M").with_field(field);
        message.options.push(OptionElement::new("(my_option)", "x"));

        let mut rpc = Rpc::new("Call", "pkg.M", "pkg.M");
        rpc.options.push(OptionElement::new("idempotency_level", "NO_SIDE_EFFECTS"));

        let mut file = ProtoFile::new("pkg.proto", "pkg")
            .with_type(message)
            .with_type(EnumElement::new("E").with_constant("A", 0))
            .with_service(Service::new("Svc").with_rpc(rpc))
            .with_extend(
                ExtendBlock::new("google.protobuf.MessageOptions")
                    .with_field(Field::new(Label::Optional, "string", "my_option", 50000)),
            )
            .with_extend(ExtendBlock::new("pkg.M"))
            .with_qualified_names();
        file.options.push(OptionElement::new("java_package", "com.example"));

        let stripped = strip_options(&[file]);
        let file = &stripped[0];

        let TypeElement::Message(message) = &file.types[0] else {
            panic!("expected message");
        };
        assert!(message.options.is_empty());
        assert!(message.fields[0].options.is_empty());
        assert!(message.fields[0].packed);
        assert!(file.services[0].rpcs[0].options.is_empty());
        assert_eq!(file.extends.len(), 1);
        assert_eq!(file.extends[0].target, "pkg.M");
        assert_eq!(file.options.len(), 1);
    }
}
