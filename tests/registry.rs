//! Integration tests for type registration and declaration synthesis.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use exprnative::types::decls::{self, list_of, map_of, object_type, type_type};
use exprnative::types::reflect::Typed;
use exprnative::types::{BaseAdapter, BaseProvider, DeclType, HostType, Value};
use exprnative::{
    shared, NativeType, NativeTypeProvider, NativeTypes, NativeTypesConfig, RegisterArg,
    RegistryError, Shared, TypeProvider,
};

#[derive(Debug, Clone, NativeType)]
#[native(package = "identity")]
pub struct Account {
    #[native(rename = "ID")]
    pub id: String,
    pub emails: Vec<String>,
    pub scores: [i32; 3],
    pub labels: BTreeMap<String, u64>,
    pub ratio: f32,
    pub raw: Vec<u8>,
    pub created: DateTime<Utc>,
    pub ttl: Duration,
    pub home: Address,
    pub profile: Option<Shared<Profile>>,
    pub nested: Option<Shared<Shared<Profile>>>,
    pub on_change: Option<fn(String)>,
    pub events: Option<std::sync::mpsc::Sender<String>>,
    pub callbacks: Vec<Option<fn() -> bool>>,
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
}

fn provider() -> NativeTypeProvider {
    NativeTypes::new()
        .register::<Account>()
        .build_with_base()
        .expect("build provider")
}

fn decl_of(provider: &NativeTypeProvider, ty: &str, field: &str) -> Option<DeclType> {
    provider.find_field_type(ty, field).map(|ft| ft.decl)
}

// ============================================================================
// Type resolution
// ============================================================================

#[test]
fn registered_type_is_found() {
    let provider = provider();
    assert_eq!(
        provider.find_type("identity.Account"),
        Some(type_type(object_type("identity.Account")))
    );

    match provider.find_ident("identity.Account") {
        Some(Value::Type(ty)) => assert_eq!(ty.type_name(), "identity.Account"),
        other => panic!("Expected type value, got {:?}", other),
    }
}

#[test]
fn unregistered_names_fall_through() {
    let provider = provider();
    assert!(provider.find_type("identity.Address").is_none());
    assert!(provider.find_ident("identity.Address").is_none());
    assert!(provider.find_field_type("identity.Address", "city").is_none());
    assert!(provider.new_value("identity.Address", &[]).is_error());
    assert!(provider.enum_value("identity.Kind.ADMIN").is_error());

    // Builtins come from the base provider.
    assert_eq!(provider.find_type("int"), Some(type_type(decls::INT)));
    assert!(matches!(provider.find_ident("string"), Some(Value::Type(_))));
}

#[test]
fn types_are_sorted() {
    let provider = NativeTypes::new()
        .register::<Profile>()
        .register::<Account>()
        .register::<Address>()
        .build_with_base()
        .unwrap();
    let names: Vec<_> = provider.types().iter().map(|t| t.type_name().to_string()).collect();
    assert_eq!(names, ["identity.Account", "identity.Address", "identity.Profile"]);
}

// ============================================================================
// Field declarations
// ============================================================================

#[test]
fn field_declarations() {
    let provider = provider();
    let ty = "identity.Account";

    assert_eq!(decl_of(&provider, ty, "ID"), Some(decls::STRING));
    assert_eq!(decl_of(&provider, ty, "emails"), Some(list_of(decls::STRING)));
    assert_eq!(decl_of(&provider, ty, "scores"), Some(list_of(decls::INT)));
    assert_eq!(decl_of(&provider, ty, "labels"), Some(map_of(decls::STRING, decls::UINT)));
    assert_eq!(decl_of(&provider, ty, "ratio"), Some(decls::DOUBLE));
    assert_eq!(decl_of(&provider, ty, "raw"), Some(decls::BYTES));
    assert_eq!(decl_of(&provider, ty, "created"), Some(decls::TIMESTAMP));
    assert_eq!(decl_of(&provider, ty, "ttl"), Some(decls::DURATION));
    assert_eq!(decl_of(&provider, ty, "home"), Some(object_type("identity.Address")));
    assert_eq!(decl_of(&provider, ty, "profile"), Some(object_type("identity.Profile")));
}

#[test]
fn unsupported_fields_are_hidden() {
    let provider = provider();
    let ty = "identity.Account";

    for hidden in ["id", "secret", "nested", "on_change", "events", "callbacks"] {
        assert!(
            provider.find_field_type(ty, hidden).is_none(),
            "{} should be hidden",
            hidden
        );
    }

    let native = provider.native_type(ty).unwrap();
    let visible: Vec<_> = native.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        visible,
        ["ID", "emails", "scores", "labels", "ratio", "raw", "created", "ttl", "home", "profile"]
    );
}

#[test]
fn field_renames_can_be_disabled() {
    let config = NativeTypesConfig {
        parse_field_renames: false,
        ..Default::default()
    };
    let provider = NativeTypes::new()
        .register::<Account>()
        .with_config(config)
        .build_with_base()
        .unwrap();

    assert_eq!(decl_of(&provider, "identity.Account", "id"), Some(decls::STRING));
    assert!(decl_of(&provider, "identity.Account", "ID").is_none());
}

#[test]
fn package_aliases() {
    let config = NativeTypesConfig::from_json(r#"{"package_aliases": {"identity": "iam"}}"#).unwrap();
    let provider = NativeTypes::new()
        .register::<Account>()
        .with_config(config)
        .build_with_base()
        .unwrap();

    assert!(provider.find_type("identity.Account").is_none());
    assert!(provider.find_type("iam.Account").is_some());
    assert_eq!(decl_of(&provider, "iam.Account", "home"), Some(object_type("iam.Address")));
}

// ============================================================================
// Registration arguments
// ============================================================================

#[test]
fn register_by_value_and_pointer() {
    let by_value = NativeTypes::new()
        .register_value(Address { city: "Oslo".to_string() })
        .build_with_base()
        .unwrap();
    assert!(by_value.find_type("identity.Address").is_some());

    let by_pointer = NativeTypes::new()
        .register::<Shared<Address>>()
        .register_value(shared(Profile { display_name: String::new() }))
        .build_with_base()
        .unwrap();
    assert!(by_pointer.find_type("identity.Address").is_some());
    assert!(by_pointer.find_type("identity.Profile").is_some());
}

#[test]
fn register_non_struct_fails() {
    let err = NativeTypes::new().register::<i64>().build_with_base().unwrap_err();
    assert!(matches!(err, RegistryError::InvalidHostType(_)));

    let err = NativeTypes::new()
        .register::<Shared<Shared<Address>>>()
        .build_with_base()
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidHostType(_)));

    let err = NativeTypes::new()
        .register_value(vec!["a".to_string()])
        .build_with_base()
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidHostType(_)));
}

#[test]
fn register_arg_from_any() {
    let arg = RegisterArg::from_any(Box::new(Address::type_of())).unwrap();
    assert!(matches!(arg, RegisterArg::Type(HostType::Struct(_))));

    let arg = RegisterArg::from_any(Box::new(RegisterArg::of::<Profile>())).unwrap();
    assert!(matches!(arg, RegisterArg::Type(_)));

    let value: Arc<dyn exprnative::types::Reflect> = Arc::new(Address { city: String::new() });
    let arg = RegisterArg::from_any(Box::new(value)).unwrap();
    assert!(matches!(arg, RegisterArg::Value(_)));

    let err = RegisterArg::from_any(Box::new(42u8)).unwrap_err();
    assert!(matches!(err, RegistryError::UnsupportedArgument(_)));
}

#[test]
fn explicit_fallback_chain() {
    let provider = NativeTypeProvider::new(
        Arc::new(BaseAdapter::new()),
        Arc::new(BaseProvider::new()),
        NativeTypesConfig::default(),
        [RegisterArg::of::<Profile>()],
    )
    .unwrap();
    assert!(provider.find_type("identity.Profile").is_some());
    assert!(provider.find_type("bool").is_some());
}

// ============================================================================
// Re-registration and shapes
// ============================================================================

mod v1 {
    use exprnative::NativeType;

    #[derive(Debug, Clone, NativeType)]
    #[native(package = "billing", name = "Invoice")]
    pub struct Invoice {
        pub total: i64,
    }
}

mod v2 {
    use exprnative::NativeType;

    #[derive(Debug, Clone, NativeType)]
    #[native(package = "billing", name = "Invoice")]
    pub struct Invoice {
        pub total: i64,
        pub currency: String,
    }
}

#[test]
fn last_registration_wins() {
    let provider = NativeTypes::new()
        .register::<v1::Invoice>()
        .register::<v2::Invoice>()
        .build_with_base()
        .unwrap();
    assert_eq!(provider.types().len(), 1);
    assert_eq!(decl_of(&provider, "billing.Invoice", "currency"), Some(decls::STRING));

    let provider = NativeTypes::new()
        .register::<v2::Invoice>()
        .register::<v1::Invoice>()
        .build_with_base()
        .unwrap();
    assert!(decl_of(&provider, "billing.Invoice", "currency").is_none());
}

#[test]
fn shape_hashes() {
    let a = provider();
    let b = provider();
    let hash = a.native_type("identity.Account").unwrap().shape_hash();
    assert_eq!(hash, b.native_type("identity.Account").unwrap().shape_hash());

    let v1 = NativeTypes::new().register::<v1::Invoice>().build_with_base().unwrap();
    let v2 = NativeTypes::new().register::<v2::Invoice>().build_with_base().unwrap();
    assert_ne!(
        v1.native_type("billing.Invoice").unwrap().shape_hash(),
        v2.native_type("billing.Invoice").unwrap().shape_hash()
    );
    assert_eq!(hash.to_hex().len(), 64);
}

#[test]
fn renames_change_the_shape() {
    let config = NativeTypesConfig {
        parse_field_renames: false,
        ..Default::default()
    };
    let plain = NativeTypes::new().register::<Account>().with_config(config).build_with_base().unwrap();
    assert_ne!(
        plain.native_type("identity.Account").unwrap().shape_hash(),
        provider().native_type("identity.Account").unwrap().shape_hash()
    );
}

#[test]
fn provider_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NativeTypeProvider>();

    let provider = provider();
    let clone = provider.clone();
    let handle = std::thread::spawn(move || clone.find_type("identity.Account").is_some());
    assert!(handle.join().unwrap());
    assert!(provider.find_type("identity.Account").is_some());
}
