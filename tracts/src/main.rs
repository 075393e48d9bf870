//! # Tracts CLI Entry Point
//!
//! The main executable for the Tracts tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs the log
//!    subscriber.
//! 2. **Loading**: Reads the schema document and builds a `tracts_core` registry from it.
//! 3. **Execution**: Lists, describes or converts records against that registry.
//! 4. **Presentation**: Formats and prints the resulting data or error to standard output/error.

mod cli;
mod formatter;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, Format};
use formatter::{DefinitionList, FormattedString};
use std::io::{self, Read};
use std::path::Path;
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tracts_core::codec::{JsonCodec, MessageCodec, QueryCodec};
use tracts_core::schema::{Definition, Registry};

/// What `convert` decodes and how it re-encodes it.
struct ConvertRequest {
    message: String,
    from: Format,
    to: Format,
    prefix: String,
    pretty: bool,
}

fn main() {
    let args = Cli::parse();
    init_tracing(&args.log_level);

    let registry = or_exit(load_registry(&args.schema));

    match args.command {
        Commands::List => println!("{}", FormattedString::from(list_definitions(&registry))),
        Commands::Describe { symbol } => {
            let definition = or_exit(describe(&registry, &symbol));
            println!("{}", FormattedString::from(definition));
        }
        Commands::Convert {
            message,
            from,
            to,
            prefix,
            pretty,
            input,
        } => {
            let request = ConvertRequest {
                message,
                from,
                to,
                prefix,
                pretty,
            };
            let output = or_exit(read_input(input).and_then(|input| convert(&registry, &request, &input)));
            println!("{output}");
        }
    }
}

fn or_exit<T>(result: anyhow::Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

fn load_registry(path: &Path) -> anyhow::Result<Registry> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file {}", path.display()))?;

    let registry = Registry::from_schema_json(&text)
        .with_context(|| format!("Invalid schema document {}", path.display()))?;

    tracing::debug!(
        messages = registry.all_messages().len(),
        enums = registry.all_enums().len(),
        "Loaded schema from {}",
        path.display()
    );
    Ok(registry)
}

fn list_definitions(registry: &Registry) -> DefinitionList {
    let messages = registry.all_messages().map(Definition::Message);
    let enums = registry.all_enums().map(Definition::Enum);
    DefinitionList(messages.chain(enums).collect())
}

fn describe(registry: &Registry, symbol: &str) -> anyhow::Result<Definition> {
    registry
        .get_definition(symbol)
        .ok_or_else(|| tracts_core::Error::DefinitionNotFound(symbol.to_string()).into())
}

fn read_input(input: Option<String>) -> anyhow::Result<String> {
    match input {
        Some(input) => Ok(input),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read standard input")?;
            Ok(buffer)
        }
    }
}

fn convert(registry: &Registry, request: &ConvertRequest, input: &str) -> anyhow::Result<String> {
    let message_type = registry
        .get_message_by_name(&request.message)
        .ok_or_else(|| tracts_core::Error::DefinitionNotFound(request.message.clone()))?;

    let message = match request.from {
        Format::Json => JsonCodec::new().decode_message(&message_type, input),
        Format::Query => QueryCodec::with_prefix(request.prefix.as_str()).decode_message(&message_type, input),
    }
    .with_context(|| format!("Failed to decode {}", request.message))?;

    let output = match request.to {
        Format::Json => JsonCodec::new().pretty(request.pretty).encode_message(&message),
        Format::Query => QueryCodec::with_prefix(request.prefix.as_str()).encode_message(&message),
    }
    .with_context(|| format!("Failed to encode {}", request.message))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SCHEMA: &str = r#"{
        "package": "zoo",
        "enums": [{"name": "Diet", "values": [{"name": "HERBIVORE", "number": 1}, {"name": "CARNIVORE", "number": 2}]}],
        "messages": [{
            "name": "Animal",
            "fields": [
                {"name": "name", "type": "string", "required": true},
                {"name": "size", "type": "integer"},
                {"name": "diet", "type": "enum", "target": "Diet"}
            ]
        }]
    }"#;

    fn schema_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn request(from: Format, to: Format) -> ConvertRequest {
        ConvertRequest {
            message: "zoo.Animal".to_string(),
            from,
            to,
            prefix: String::new(),
            pretty: false,
        }
    }

    #[test]
    fn test_load_and_list() {
        let file = schema_file(SCHEMA);

        let registry = load_registry(file.path()).unwrap();
        let DefinitionList(definitions) = list_definitions(&registry);

        let names: Vec<_> = definitions.iter().map(Definition::full_name).collect();
        assert_eq!(names, ["zoo.Animal", "zoo.Diet"]);
    }

    #[test]
    fn test_load_failures() {
        let missing = load_registry(Path::new("/nonexistent/schema.json")).unwrap_err();
        assert!(missing.to_string().starts_with("Failed to read schema file"));

        let file = schema_file(r#"{"messages": [{"name": "Animal", "fields": [{"name": "x", "type": "nope"}]}]}"#);
        let invalid = load_registry(file.path()).unwrap_err();
        assert!(invalid.to_string().starts_with("Invalid schema document"));
    }

    #[test]
    fn test_describe() {
        let registry = load_registry(schema_file(SCHEMA).path()).unwrap();

        assert!(matches!(describe(&registry, "zoo.Diet"), Ok(Definition::Enum(_))));
        assert!(describe(&registry, "zoo.Cat").is_err());
    }

    #[test]
    fn test_convert_json_to_query_and_back() {
        let registry = load_registry(schema_file(SCHEMA).path()).unwrap();

        // 1. JSON to query string
        let query = convert(
            &registry,
            &request(Format::Json, Format::Query),
            r#"{"name": "dog", "size": 4, "diet": 2}"#,
        )
        .unwrap();
        assert_eq!(query, "name=dog&size=4&diet=CARNIVORE");

        // 2. And back to JSON
        let json = convert(&registry, &request(Format::Query, Format::Json), &query).unwrap();
        let json: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(json, serde_json::json!({"name": "dog", "size": 4, "diet": "CARNIVORE"}));
    }

    #[test]
    fn test_convert_with_prefix() {
        let registry = load_registry(schema_file(SCHEMA).path()).unwrap();
        let mut request = request(Format::Json, Format::Query);
        request.prefix = "animal.".to_string();

        let query = convert(&registry, &request, r#"{"name": "cat"}"#).unwrap();

        assert_eq!(query, "animal.name=cat");
    }

    #[test]
    fn test_convert_failures() {
        let registry = load_registry(schema_file(SCHEMA).path()).unwrap();

        // Missing required field
        let err = convert(&registry, &request(Format::Json, Format::Json), r#"{"size": 4}"#).unwrap_err();
        assert!(err.to_string().starts_with("Failed to decode zoo.Animal"));
        assert!(err.downcast_ref::<tracts_core::Error>().is_some());

        // Enum is not a message
        let mut request = request(Format::Json, Format::Json);
        request.message = "zoo.Diet".to_string();
        assert!(convert(&registry, &request, "{}").is_err());
    }
}
