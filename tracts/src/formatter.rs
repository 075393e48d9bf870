use colored::*;
use tracts_core::{
    Value,
    schema::{Definition, EnumType, FieldDescriptor, FieldKind, MessageType},
};

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

pub struct DefinitionList(pub Vec<Definition>);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<anyhow::Error> for FormattedString {
    fn from(err: anyhow::Error) -> Self {
        // Library failures carry their own short title
        let title = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<tracts_core::Error>())
            .map(|err| err.title())
            .unwrap_or("Error");

        FormattedString(format!("{}\n\n'{:#}'", format!("{title}:").red().bold(), err))
    }
}

impl From<DefinitionList> for FormattedString {
    fn from(DefinitionList(definitions): DefinitionList) -> Self {
        if definitions.is_empty() {
            return FormattedString("No definitions found.".yellow().to_string());
        }

        let mut out = String::new();
        out.push_str("Available Definitions:\n");
        for definition in definitions {
            let kind = match definition {
                Definition::Message(_) => "message",
                Definition::Enum(_) => "enum",
            };
            out.push_str(&format!("  - {} {}\n", kind.cyan(), definition.full_name().green()));
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<Definition> for FormattedString {
    fn from(definition: Definition) -> Self {
        match definition {
            Definition::Message(message) => message.into(),
            Definition::Enum(enumeration) => enumeration.into(),
        }
    }
}

impl From<MessageType> for FormattedString {
    fn from(message: MessageType) -> Self {
        let mut out = String::new();
        out.push_str(&format!("{} {} {{\n", "message".cyan(), message.full_name().green()));

        for field in message.fields() {
            out.push_str("  ");
            out.push_str(&field_line(&field));
            out.push('\n');
        }

        for nested in message.nested_messages() {
            out.push_str(&format!("  // nested message {}\n", nested.full_name()));
        }
        for nested in message.nested_enums() {
            out.push_str(&format!("  // nested enum {}\n", nested.full_name()));
        }

        out.push('}');
        FormattedString(out)
    }
}

impl From<EnumType> for FormattedString {
    fn from(enum_type: EnumType) -> Self {
        let mut out = String::new();
        out.push_str(&format!("{} {} {{\n", "enum".cyan(), enum_type.full_name().green()));

        for value in enum_type.values() {
            out.push_str(&format!(
                "  {} = {};\n",
                value.name(),
                value.number().to_string().purple()
            ));
        }
        out.push('}');

        FormattedString(out)
    }
}

fn field_line(field: &FieldDescriptor) -> String {
    let mut labels = String::new();
    if field.is_required() {
        labels.push_str(&format!("{} ", "required".cyan()));
    }
    if field.is_repeated() {
        labels.push_str(&format!("{} ", "repeated".cyan()));
    }

    let type_name = match field.kind() {
        FieldKind::Enum | FieldKind::Message => field
            .target_name()
            .unwrap_or_else(|| field.kind().to_string())
            .yellow(),
        kind => kind.name().yellow(),
    };

    let mut options = Vec::new();
    if field.name() != field.attribute() {
        options.push(format!("wire_name = {:?}", field.name()));
    }
    if field.variant() != field.kind().default_variant() {
        options.push(format!("variant = {}", field.variant()));
    }
    if let Some(default) = field.default_value().ok().flatten() {
        options.push(format!("default = {}", default_text(&default)));
    }

    let options = if options.is_empty() {
        String::new()
    } else {
        format!(" [{}]", options.join(", "))
    };

    format!("{labels}{type_name} {}{options};", field.attribute())
}

fn default_text(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => format!("{s:?}"),
        Value::Enum(member) => member.name().to_string(),
        Value::DateTime(ts) => ts.to_iso8601(),
        Value::Uuid(uuid) => uuid.hyphenated().to_string(),
        other => other.type_name().to_string(),
    }
}
