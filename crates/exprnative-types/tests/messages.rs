//! Integration tests for structured messages and the base adapter chain.

use exprnative_types::message::StructuredMessage;
use exprnative_types::reflect::Typed;
use exprnative_types::{
    shared, structured_message, BaseAdapter, BaseProvider, ConversionError, DeclType, HostType,
    Native, Shared, TypeAdapter, TypeProvider, Value,
};
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Money {
    pub currency_code: String,
    pub units: i64,
}

impl StructuredMessage for Money {
    fn full_name(&self) -> &'static str {
        "google.type.Money"
    }

    fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut out = serde_json::Map::new();
        if !self.currency_code.is_empty() {
            out.insert("currencyCode".to_string(), json!(self.currency_code));
        }
        if self.units != 0 {
            out.insert("units".to_string(), json!(self.units));
        }
        out
    }
}

structured_message!(Money, "google.type.Money");

fn usd(units: i64) -> Money {
    Money {
        currency_code: "USD".to_string(),
        units,
    }
}

#[test]
fn message_host_type() {
    assert_eq!(Money::type_of(), HostType::Message("google.type.Money"));
    assert_eq!(
        Shared::<Money>::type_of(),
        HostType::Pointer(Box::new(HostType::Message("google.type.Money")))
    );
}

#[test]
fn message_lifts_to_object() {
    let value = BaseAdapter::new().native_to_value(Native::host(usd(5)));
    let obj = value.as_object().expect("object");

    assert_eq!(obj.type_value().type_name(), "google.type.Money");
    assert_eq!(obj.get(&Value::from("units")), Value::Int(5));
    assert_eq!(obj.is_set(&Value::from("units")), Value::Bool(true));
    assert!(obj.get(&Value::from("nanos")).is_error());
}

#[test]
fn message_through_pointer_converts_back() {
    let ptr = shared(usd(7));
    let value = BaseAdapter::new().native_to_value(Native::host(ptr.clone()));
    let obj = value.as_object().expect("object");

    let back: Shared<Money> = obj.convert_to_native().unwrap();
    assert!(std::sync::Arc::ptr_eq(&back, &ptr));

    let pointee: Money = obj.convert_to_native().unwrap();
    assert_eq!(pointee, usd(7));
}

#[test]
fn message_json_forms() {
    let value = BaseAdapter::new().native_to_value(Native::host(usd(3)));
    let obj = value.as_object().expect("object");

    let json: serde_json::Value = obj.convert_to_native().unwrap();
    assert_eq!(json, json!({"currencyCode": "USD", "units": 3}));

    let err = obj.convert_to_native::<String>().unwrap_err();
    assert!(matches!(err, ConversionError::Unsupported { .. }));
}

#[test]
fn message_equality() {
    let adapter = BaseAdapter::new();
    let a = adapter.native_to_value(Native::host(usd(1)));
    let b = adapter.native_to_value(Native::host(shared(usd(1))));
    let c = adapter.native_to_value(Native::host(usd(2)));
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn null_pointer_is_null() {
    let none: Option<Shared<Money>> = None;
    assert_eq!(BaseAdapter::new().native_to_value(Native::host(none)), Value::Null);
}

#[test]
fn base_provider_terminates_chain() {
    let provider = BaseProvider::new();
    assert!(provider.find_type("int").is_some());
    assert_eq!(provider.find_type("identity.Account"), None::<DeclType>);
    assert!(provider.find_field_type("identity.Account", "id").is_none());
    assert!(provider.new_value("identity.Account", &[]).is_error());
    assert!(provider.enum_value("Color.RED").is_error());
}
