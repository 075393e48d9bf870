use std::collections::BTreeSet;
use tracts_core::codec::{MessageCodec, QueryCodec};
use tracts_core::{Error, FieldValue, Tree, Value, Variant};

mod common;

fn pairs(query: &str) -> BTreeSet<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

const ANIMALS: &str = "animals-0.name=dog&animals-0.size=12&animals-1.name=cat&animals-1.size=10&number=2";

#[test]
fn test_nested_decode() {
    let registry = common::registry();
    let owner = registry.get_message_by_name("zoo.Owner").unwrap();

    let message = QueryCodec::new().decode_message(&owner, ANIMALS).unwrap();
    assert_eq!(message.get("number").unwrap().as_deref(), Some(&Value::Int(2)));

    let animals = message.get_list("animals").unwrap();
    let names: Vec<_> = animals
        .iter()
        .map(|animal| animal.as_message().unwrap().get("name").unwrap().unwrap().into_owned())
        .collect();
    assert_eq!(names, [Value::from("dog"), Value::from("cat")]);
}

#[test]
fn test_nested_encode_reproduces_keys() {
    let registry = common::registry();
    let owner = registry.get_message_by_name("zoo.Owner").unwrap();
    let codec = QueryCodec::new();

    let message = codec.decode_message(&owner, ANIMALS).unwrap();
    let encoded = codec.encode_message(&message).unwrap();
    assert_eq!(pairs(&encoded), pairs(ANIMALS));
    assert_eq!(codec.decode_message(&owner, &encoded).unwrap(), message);
}

#[test]
fn test_key_order_does_not_matter() {
    let registry = common::registry();
    let owner = registry.get_message_by_name("zoo.Owner").unwrap();
    let codec = QueryCodec::new();

    let shuffled = "number=2&animals-1.size=10&animals-1.name=cat&animals-0.size=12&animals-0.name=dog";
    assert_eq!(
        codec.decode_message(&owner, shuffled).unwrap(),
        codec.decode_message(&owner, ANIMALS).unwrap()
    );
}

#[test]
fn test_unresolvable_paths_are_ignored() {
    let registry = common::registry();
    let owner = registry.get_message_by_name("zoo.Owner").unwrap();

    let message = QueryCodec::new()
        .decode_message(&owner, "sub_message-1.name=x&animals.name=y&animals-3.name=z&number=1")
        .unwrap();
    assert!(!message.has_value_assigned("sub_message"));
    assert!(!message.has_value_assigned("animals"));
    assert_eq!(message.all_unrecognized_fields().len(), 0);
    assert_eq!(message.get("number").unwrap().as_deref(), Some(&Value::Int(1)));
}

#[test]
fn test_repeated_values_for_scalar_field() {
    let registry = common::registry();
    let owner = registry.get_message_by_name("zoo.Owner").unwrap();

    let result = QueryCodec::new().decode_message(&owner, "number=1&number=2");
    assert!(matches!(result, Err(Error::Decode(_))));
}

#[test]
fn test_repeated_scalars_with_and_without_index() {
    let registry = common::registry();
    let owner = registry.get_message_by_name("zoo.Owner").unwrap();
    let codec = QueryCodec::new();

    let unindexed = codec.decode_message(&owner, "nicknames=rex&nicknames=max").unwrap();
    let indexed = codec.decode_message(&owner, "nicknames-1=max&nicknames-0=rex").unwrap();
    assert_eq!(unindexed, indexed);
    assert_eq!(
        unindexed.get_list("nicknames").unwrap().as_slice(),
        [Value::from("rex"), Value::from("max")]
    );

    assert_eq!(codec.encode_message(&unindexed).unwrap(), "nicknames=rex&nicknames=max");
}

#[test]
fn test_unknown_keys_keep_raw_strings() {
    let registry = common::registry();
    let simple = registry.get_message_by_name("zoo.Simple").unwrap();
    let codec = QueryCodec::new();

    let message = codec
        .decode_message(&simple, "known_int=1&extra=5&extra=6&deep.key=1")
        .unwrap();
    assert_eq!(
        message.get_unrecognized_field_info("extra"),
        Some((&Tree::from(vec!["5", "6"]), Variant::String))
    );
    assert_eq!(message.all_unrecognized_fields().len(), 1);

    let encoded = codec.encode_message(&message).unwrap();
    assert_eq!(pairs(&encoded), pairs("known_int=1&extra=5&extra=6"));
}

#[test]
fn test_prefix() {
    let registry = common::registry();
    let owner = registry.get_message_by_name("zoo.Owner").unwrap();
    let codec = QueryCodec::with_prefix("o_");

    let message = codec
        .decode_message(&owner, "o_number=3&o_sub_message.name=rex&number=9")
        .unwrap();
    assert_eq!(message.get("number").unwrap().as_deref(), Some(&Value::Int(3)));

    let encoded = codec.encode_message(&message).unwrap();
    assert_eq!(pairs(&encoded), pairs("o_number=3&o_sub_message.name=rex"));
}

#[test]
fn test_empty_nested_message_marker() {
    let registry = common::registry();
    let owner = registry.get_message_by_name("zoo.Owner").unwrap();
    let codec = QueryCodec::new();

    let mut message = owner.new_message();
    message.message_mut("sub_message").unwrap();
    let encoded = codec.encode_message(&message).unwrap();
    assert_eq!(encoded, "sub_message=");

    let decoded = QueryCodec::new().decode_message(&owner, &encoded);
    // The empty animal lacks its required name.
    assert!(matches!(decoded, Err(Error::Validation(_))));
}

#[test]
fn test_bare_url_and_scalar_kinds() {
    let registry = common::registry();
    let record = registry.get_message_by_name("zoo.Record").unwrap();
    let codec = QueryCodec::new();

    let url = "https://example.com/records?flag=TRUE&ratio=0.25&blob=aGk%3D&at_ms=1349019110262\
               &id=67e55044-10b1-426f-9247-bb680e5fe0c8&meta=%7B%22a%22%3A1%7D&diets=CARNIVORE&diets=1";
    let message = codec.decode_message(&record, url).unwrap();
    assert_eq!(message.get("flag").unwrap().as_deref(), Some(&Value::Bool(true)));
    assert_eq!(message.get("blob").unwrap().unwrap().as_bytes(), Some(&b"hi"[..]));
    let diets: Vec<_> = message
        .get_list("diets")
        .unwrap()
        .iter()
        .map(|value| value.as_enum().unwrap().name().to_string())
        .collect();
    assert_eq!(diets, ["CARNIVORE", "HERBIVORE"]);

    let encoded = codec.encode_message(&message).unwrap();
    assert_eq!(codec.decode_message(&record, &encoded).unwrap(), message);
}

#[test]
fn test_bad_scalar_values() {
    let registry = common::registry();
    let record = registry.get_message_by_name("zoo.Record").unwrap();
    let codec = QueryCodec::new();

    for query in ["ratio=fast", "id=nope", "diets=PLANKTON", "at=noon", "meta=[1]"] {
        assert!(
            matches!(codec.decode_message(&record, query), Err(Error::Decode(_))),
            "{query}"
        );
    }
}

#[test]
fn test_round_trip_of_null_and_empty_values() {
    let registry = common::registry();
    let owner = registry.get_message_by_name("zoo.Owner").unwrap();
    let codec = QueryCodec::new();

    let mut message = owner.new_message();
    message.set("number", FieldValue::Null).unwrap();
    message.set("nicknames", Vec::<Value>::new()).unwrap();

    // Neither produces a key, and both read back as unset
    let query = codec.encode_message(&message).unwrap();
    assert_eq!(query, "");
    assert_eq!(codec.decode_message(&owner, &query).unwrap(), message);
    assert_eq!(message, owner.new_message());
}

#[test]
fn test_untyped_values_keep_their_type() {
    let registry = common::registry();
    let record = registry.get_message_by_name("zoo.Record").unwrap();
    let codec = QueryCodec::new();

    for (value, expected) in [
        (Tree::from("42"), "anything=%2242%22"),
        (Tree::from("true"), "anything=%22true%22"),
        (Tree::from("plain"), "anything=plain"),
        (Tree::Float(1.0), "anything=1.0"),
        (Tree::Int(7), "anything=7"),
    ] {
        let mut message = record.new_message();
        message.set("anything", Value::Untyped(value)).unwrap();

        let query = codec.encode_message(&message).unwrap();
        assert_eq!(query, expected);
        assert_eq!(codec.decode_message(&record, &query).unwrap(), message, "{query}");
    }

    // Hand-written text still decodes as JSON when it parses
    let message = codec.decode_message(&record, "anything=42").unwrap();
    assert_eq!(message.get("anything").unwrap().as_deref(), Some(&Value::Untyped(Tree::Int(42))));
}
