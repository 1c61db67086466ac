//! Integration tests for native struct instances: construction, field
//! access, equality and conversion.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use exprnative::types::reflect::Reflect;
use exprnative::types::{ConversionError, EvalError, TypeValue};
use exprnative::{
    shared, Native, NativeObject, NativeType, NativeTypeProvider, NativeTypes, Shared,
    TypeAdapter, TypeProvider, Value,
};
use serde_json::json;

#[derive(Debug, Clone, NativeType)]
#[native(package = "identity")]
pub struct Account {
    #[native(rename = "ID")]
    pub id: String,
    pub emails: Vec<String>,
    pub labels: HashMap<String, String>,
    pub created: DateTime<Utc>,
    pub session_ttl: Duration,
    pub home: Address,
    pub profile: Option<Shared<Profile>>,
    pub on_change: Option<fn(String)>,
    secret: String,
}

#[derive(Debug, Clone, NativeType)]
#[native(package = "identity")]
pub struct Address {
    pub city: String,
}

#[derive(Debug, Clone, NativeType)]
#[native(package = "identity")]
pub struct Profile {
    pub display_name: String,
    pub age: u32,
    pub avatar: Vec<u8>,
}

fn provider() -> NativeTypeProvider {
    NativeTypes::new()
        .register::<Account>()
        .register::<Profile>()
        .build_with_base()
        .expect("build provider")
}

fn account(id: &str) -> Account {
    Account {
        id: id.to_string(),
        emails: vec![format!("{}@example.com", id)],
        labels: HashMap::new(),
        created: DateTime::<Utc>::UNIX_EPOCH,
        session_ttl: Duration::zero(),
        home: Address { city: String::new() },
        profile: None,
        on_change: None,
        secret: "s3cr3t".to_string(),
    }
}

fn field(name: &str) -> Value {
    Value::from(name)
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn new_value_sets_fields() {
    let provider = provider();
    let value = provider.new_value(
        "identity.Account",
        &[
            ("ID".to_string(), Value::from("a-1")),
            ("emails".to_string(), Value::List(exprnative::types::ListValue::from_values(vec![
                Value::from("a@example.com"),
            ]))),
        ],
    );

    let obj = value.as_object().expect("object");
    assert_eq!(obj.type_value().type_name(), "identity.Account");
    assert_eq!(obj.get(&field("ID")), Value::from("a-1"));
    assert_eq!(obj.get(&field("emails")).as_list().map(|l| l.size()), Some(1));

    let native: Account = obj.convert_to_native().unwrap();
    assert_eq!(native.id, "a-1");
    assert_eq!(native.emails, ["a@example.com"]);
    assert!(native.secret.is_empty());
}

#[test]
fn new_value_unknown_field() {
    let value = provider().new_value("identity.Account", &[("nope".to_string(), Value::Int(1))]);
    assert!(matches!(&value, Value::Error(EvalError::NoSuchField(f)) if f == "nope"));
}

#[test]
fn new_value_hidden_fields_are_unknown() {
    let provider = provider();
    for name in ["id", "secret", "on_change"] {
        let value = provider.new_value("identity.Account", &[(name.to_string(), Value::from("x"))]);
        assert!(
            matches!(&value, Value::Error(EvalError::NoSuchField(f)) if f == name),
            "{} should not be settable, got {:?}",
            name,
            value
        );
    }
}

#[test]
fn new_value_type_mismatch() {
    let value = provider().new_value("identity.Account", &[("ID".to_string(), Value::Int(7))]);
    assert!(matches!(
        value,
        Value::Error(EvalError::Conversion(ConversionError::TypeMismatch { .. }))
    ));
}

#[test]
fn new_value_out_of_range() {
    let value = provider().new_value("identity.Profile", &[("age".to_string(), Value::Uint(u64::MAX))]);
    assert!(matches!(
        value,
        Value::Error(EvalError::Conversion(ConversionError::OutOfRange { .. }))
    ));
}

#[test]
fn new_value_nested_object() {
    let provider = provider();
    let profile = provider.new_value(
        "identity.Profile",
        &[("display_name".to_string(), Value::from("Ada"))],
    );
    let account = provider.new_value("identity.Account", &[("profile".to_string(), profile)]);
    let obj = account.as_object().expect("object");

    let profile = obj.get(&field("profile"));
    let profile = profile.as_object().expect("profile object");
    assert_eq!(profile.get(&field("display_name")), Value::from("Ada"));
}

// ============================================================================
// Field access
// ============================================================================

#[test]
fn unset_fields_read_as_defaults() {
    let provider = provider();
    let value = provider.new_value("identity.Account", &[]);
    let obj = value.as_object().expect("object");

    assert!(obj.is_zero_value());
    assert_eq!(obj.get(&field("ID")), Value::from(""));
    assert_eq!(obj.get(&field("emails")).as_list().map(|l| l.size()), Some(0));
    assert_eq!(obj.get(&field("labels")).as_map().map(|m| m.size()), Some(0));
    assert_eq!(obj.get(&field("created")), Value::Timestamp(DateTime::<Utc>::UNIX_EPOCH));
    assert_eq!(obj.get(&field("session_ttl")), Value::Duration(Duration::zero()));

    let home = obj.get(&field("home"));
    let home = home.as_object().expect("zero struct");
    assert_eq!(home.type_value().type_name(), "identity.Address");
    assert_eq!(home.get(&field("city")), Value::from(""));

    // A null pointer reads as a pointer to a zero value.
    let profile = obj.get(&field("profile"));
    let profile = profile.as_object().expect("zero pointee");
    assert_eq!(profile.get(&field("age")), Value::Uint(0));
    assert_eq!(profile.get(&field("avatar")), Value::Bytes(Vec::new()));
}

#[test]
fn presence_tests() {
    let value = provider().to_value(Native::host(account("a-1")));
    let obj = value.as_object().expect("object");

    assert_eq!(obj.is_set(&field("ID")), Value::Bool(true));
    assert_eq!(obj.is_set(&field("emails")), Value::Bool(true));
    assert_eq!(obj.is_set(&field("labels")), Value::Bool(false));
    assert_eq!(obj.is_set(&field("profile")), Value::Bool(false));
    assert!(obj.is_set(&field("secret")).is_error());
}

#[test]
fn unknown_and_invisible_fields() {
    let value = provider().to_value(Native::host(account("a-1")));
    let obj = value.as_object().expect("object");

    assert!(matches!(
        obj.get(&field("missing")),
        Value::Error(EvalError::NoSuchField(f)) if f == "missing"
    ));
    assert!(matches!(obj.get(&field("on_change")), Value::Error(EvalError::NoSuchField(_))));
    assert!(matches!(obj.get(&field("secret")), Value::Error(EvalError::NoSuchField(_))));
    assert!(matches!(obj.get(&field("id")), Value::Error(EvalError::NoSuchField(_))));
    assert!(matches!(obj.get(&Value::Int(0)), Value::Error(EvalError::NoSuchOverload(_))));
}

#[test]
fn field_type_accessors() {
    let provider = provider();
    let ft = provider.find_field_type("identity.Account", "ID").expect("ID field");
    let mut host = account("a-2");

    assert!((ft.is_set)(&host as &dyn Reflect));
    assert_eq!((ft.get_from)(&host as &dyn Reflect), Ok(Value::from("a-2")));

    host.id.clear();
    assert!(!(ft.is_set)(&host as &dyn Reflect));
    assert_eq!((ft.get_from)(&host as &dyn Reflect), Ok(Value::from("")));

    // Through a pointer.
    let ptr = shared(account("a-3"));
    assert_eq!((ft.get_from)(&ptr as &dyn Reflect), Ok(Value::from("a-3")));
}

#[test]
fn field_accessors_reject_other_types() {
    let provider = provider();
    let ft = provider.find_field_type("identity.Account", "ID").expect("ID field");
    let other = Address { city: "Oslo".to_string() };

    assert!(!(ft.is_set)(&other as &dyn Reflect));
    assert!(matches!(
        (ft.get_from)(&other as &dyn Reflect),
        Err(EvalError::NoSuchField(f)) if f == "ID"
    ));
}

// ============================================================================
// Equality
// ============================================================================

#[test]
fn value_and_pointer_compare_equal() {
    let provider = provider();
    let by_value = provider.to_value(Native::host(account("a-1")));
    let by_pointer = provider.to_value(Native::host(shared(account("a-1"))));
    let other = provider.to_value(Native::host(account("a-2")));

    assert_eq!(by_value, by_pointer);
    assert_eq!(by_pointer, by_value);
    assert_ne!(by_value, other);
    assert_ne!(by_value, Value::from("a-1"));
}

#[test]
fn hidden_fields_take_part_in_equality() {
    let provider = provider();
    let mut changed = account("a-1");
    changed.secret = "other".to_string();

    let a = provider.to_value(Native::host(account("a-1")));
    let b = provider.to_value(Native::host(changed));
    assert_ne!(a, b);
}

// ============================================================================
// Conversion
// ============================================================================

#[test]
fn convert_to_same_type() {
    let value = provider().to_value(Native::host(account("a-1")));
    let obj = value.as_object().expect("object");

    let back: Account = obj.convert_to_native().unwrap();
    assert_eq!(back.id, "a-1");
    assert_eq!(back.secret, "s3cr3t");
}

#[test]
fn convert_pointer_to_pointee_and_back() {
    let ptr = shared(account("a-1"));
    let value = provider().to_value(Native::host(ptr.clone()));
    let obj = value.as_object().expect("object");

    let same: Shared<Account> = obj.convert_to_native().unwrap();
    assert!(Arc::ptr_eq(&same, &ptr));

    let pointee: Account = obj.convert_to_native().unwrap();
    assert_eq!(pointee.id, "a-1");
}

#[test]
fn convert_value_to_fresh_pointer() {
    let value = provider().to_value(Native::host(account("a-1")));
    let obj = value.as_object().expect("object");

    let ptr: Shared<Account> = obj.convert_to_native().unwrap();
    assert_eq!(ptr.read().id, "a-1");

    let nullable: Option<Shared<Account>> = obj.convert_to_native().unwrap();
    assert_eq!(nullable.map(|p| p.read().id.clone()), Some("a-1".to_string()));
}

#[test]
fn convert_to_json_forms() {
    let mut host = account("a-1");
    host.session_ttl = Duration::milliseconds(1500);
    host.labels.insert("tier".to_string(), "gold".to_string());

    let value = provider().to_value(Native::host(host));
    let obj = value.as_object().expect("object");

    let expected = json!({
        "ID": "a-1",
        "emails": ["a-1@example.com"],
        "labels": {"tier": "gold"},
        "session_ttl": "1.5s",
    });

    let json: serde_json::Value = obj.convert_to_native().unwrap();
    assert_eq!(json, expected);

    let map: serde_json::Map<String, serde_json::Value> = obj.convert_to_native().unwrap();
    assert_eq!(serde_json::Value::Object(map), expected);

    assert_eq!(value.to_json().unwrap(), expected);
}

#[test]
fn convert_to_unrelated_type_fails() {
    let value = provider().to_value(Native::host(account("a-1")));
    let obj = value.as_object().expect("object");

    assert!(matches!(
        obj.convert_to_native::<String>(),
        Err(ConversionError::Unsupported { .. })
    ));
    assert!(obj.convert_to_native::<Profile>().is_err());
}

#[test]
fn convert_to_type() {
    let value = provider().to_value(Native::host(account("a-1")));
    let obj = value.as_object().expect("object");

    match obj.convert_to_type(&TypeValue::type_type()) {
        Value::Type(ty) => assert_eq!(ty.type_name(), "identity.Account"),
        other => panic!("Expected type, got {:?}", other),
    }
    assert!(obj.convert_to_type(&TypeValue::builtin("string").unwrap()).is_error());
}

#[test]
fn convert_to_own_type_is_identity() {
    let value = provider().to_value(Native::host(account("a-1")));
    let obj = value.as_object().expect("object");

    let same = obj.convert_to_type(&obj.type_value());
    assert!(same.as_object().is_some());
    assert_eq!(same, value);
}

#[test]
fn type_converts_only_to_type_of_types() {
    let provider = provider();
    let ty = provider.native_type("identity.Account").expect("registered");

    match ty.convert_to_type(&TypeValue::type_type()) {
        Value::Type(t) => assert!(t.is_type_type()),
        other => panic!("Expected type of types, got {:?}", other),
    }
    assert!(ty.convert_to_type(&TypeValue::builtin("string").unwrap()).is_error());
}

#[test]
fn unregistered_struct_still_lifts() {
    let value = provider().to_value(Native::host(Address { city: "Oslo".to_string() }));
    let obj = value.as_object().expect("object");
    assert_eq!(obj.type_value().type_name(), "identity.Address");
    assert_eq!(obj.get(&field("city")), Value::from("Oslo"));

    let native = obj.downcast_ref::<NativeObject>().expect("native object");
    assert_eq!(native.native_type().fields().len(), 1);
}

#[test]
fn adapter_passes_values_through() {
    let provider = provider();
    assert_eq!(provider.native_to_value(Native::Null), Value::Null);
    assert_eq!(provider.native_to_value(Value::Int(3).into()), Value::Int(3));
    assert_eq!(provider.native_to_value(Native::host(3i8)), Value::Int(3));
    let none: Option<Shared<Account>> = None;
    assert_eq!(provider.native_to_value(Native::host(none)), Value::Null);
}

// ============================================================================
// Integer identifiers
// ============================================================================

mod numeric {
    use exprnative::{NativeType, Shared};

    #[derive(Debug, Clone, NativeType)]
    #[native(package = "identity", name = "Account")]
    pub struct Account {
        #[native(rename = "ID")]
        pub id: i64,
        pub next: Option<Shared<Account>>,
        pub scores: Vec<i64>,
    }
}

fn numeric_provider() -> NativeTypeProvider {
    NativeTypes::new()
        .register::<numeric::Account>()
        .build_with_base()
        .expect("build provider")
}

#[test]
fn integer_id_account() {
    let provider = numeric_provider();
    let value = provider.new_value("identity.Account", &[("ID".to_string(), Value::Int(1234))]);
    let obj = value.as_object().expect("object");

    assert_eq!(obj.get(&field("ID")), Value::Int(1234));
    assert_eq!(obj.is_set(&field("ID")), Value::Bool(true));
    assert!(!obj.is_zero_value());

    let empty = provider.new_value("identity.Account", &[]);
    let empty = empty.as_object().expect("object");
    assert_eq!(empty.get(&field("ID")), Value::Int(0));
    assert_eq!(empty.is_set(&field("ID")), Value::Bool(false));
    assert!(empty.is_zero_value());
}

#[test]
fn json_form_round_trips() {
    let provider = numeric_provider();
    let host = numeric::Account {
        id: 5,
        next: Some(shared(numeric::Account {
            id: 9,
            next: None,
            scores: Vec::new(),
        })),
        scores: vec![1, 0, 2],
    };
    let value = provider.to_value(Native::host(host));
    let obj = value.as_object().expect("object");

    let first: serde_json::Value = obj.convert_to_native().unwrap();
    let second: serde_json::Value = obj.convert_to_native().unwrap();
    assert_eq!(first, second);
    assert_eq!(first, json!({"ID": 5, "next": {"ID": 9}, "scores": [1, 0, 2]}));

    // Rebuild from the set leaves.
    let next = provider.new_value(
        "identity.Account",
        &[("ID".to_string(), Value::from_json(&first["next"]["ID"]))],
    );
    let rebuilt = provider.new_value(
        "identity.Account",
        &[
            ("ID".to_string(), Value::from_json(&first["ID"])),
            ("next".to_string(), next),
            ("scores".to_string(), Value::from_json(&first["scores"])),
        ],
    );
    assert!(!rebuilt.is_error(), "{:?}", rebuilt);
    assert_eq!(rebuilt.to_json().unwrap(), first);
    assert_eq!(rebuilt, value);
}
