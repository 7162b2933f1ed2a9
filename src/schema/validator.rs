//! Schema validator for request inputs
//!
//! Validation semantics:
//! - Every field is checked; all failures are reported in one pass
//! - One message per field path; among a string's checks the last failure wins
//! - Undeclared fields are dropped, or reported on strict schemas
//! - Wrong primitive types (including null) are reported on the field
//! - Refinements run only once every field passed
//!
//! Normalization on success:
//! - Defaults applied
//! - Sigils stripped
//! - Empty strings removed on fields that treat them as absent
//! - Query-string values coerced to integers and booleans
//!
//! Validation is deterministic and never mutates its input.

use std::collections::{BTreeMap, HashMap};

use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::errors::FieldErrors;
use super::types::{
    FieldDef, FieldType, RefinementRule, Schema, StringFormat, StringRules, UnknownFields,
};

/// Path reported when the input is not an object at all
pub const ROOT_PATH: &str = "$root";

/// Outcome of validating one input
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult<T> {
    /// Normalized, typed output
    Valid(T),
    /// Field-level report
    Invalid(FieldErrors),
}

impl<T> ValidationResult<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn errors(&self) -> Option<&FieldErrors> {
        match self {
            ValidationResult::Valid(_) => None,
            ValidationResult::Invalid(errors) => Some(errors),
        }
    }

    pub fn into_result(self) -> Result<T, FieldErrors> {
        match self {
            ValidationResult::Valid(value) => Ok(value),
            ValidationResult::Invalid(errors) => Err(errors),
        }
    }
}

impl ValidationResult<Value> {
    /// Deserializes a valid normalized value into its typed form.
    ///
    /// # Errors
    ///
    /// Fails only when the target type disagrees with the schema it was
    /// validated against.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<ValidationResult<T>, serde_json::Error> {
        match self {
            ValidationResult::Valid(value) => Ok(ValidationResult::Valid(serde_json::from_value(value)?)),
            ValidationResult::Invalid(errors) => Ok(ValidationResult::Invalid(errors)),
        }
    }
}

/// Where the raw values came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Decoded JSON, types must match exactly
    Json,
    /// Flat string map, integers and booleans are parsed from strings
    Query,
}

impl Schema {
    /// Validates a decoded JSON body.
    pub fn validate(&self, input: &Value) -> ValidationResult<Value> {
        match input.as_object() {
            Some(obj) => self.run(obj, Mode::Json),
            None => {
                let mut errors = FieldErrors::new();
                errors.add(
                    ROOT_PATH,
                    format!("Expected object, received {}", json_type_name(input)),
                );
                ValidationResult::Invalid(errors)
            }
        }
    }

    /// Validates a decoded query string.
    pub fn validate_query(&self, params: &HashMap<String, String>) -> ValidationResult<Value> {
        let obj: Map<String, Value> = params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        self.run(&obj, Mode::Query)
    }

    fn run(&self, obj: &Map<String, Value>, mode: Mode) -> ValidationResult<Value> {
        let mut errors = FieldErrors::new();
        let output = validate_object(obj, self.fields(), self.unknown_fields(), "", mode, &mut errors);

        if errors.is_empty() {
            for refinement in self.refinements() {
                let RefinementRule::AnyPresent(targets) = &refinement.rule;
                if !targets.iter().any(|field| is_present(output.get(field))) {
                    errors.add(refinement.path.clone(), refinement.message.clone());
                }
            }
        }

        if errors.is_empty() {
            ValidationResult::Valid(Value::Object(output))
        } else {
            ValidationResult::Invalid(errors)
        }
    }
}

/// Checks a default value against its own field definition.
pub(super) fn conform_default(def: &FieldDef, value: &Value) -> Result<Value, String> {
    let mut errors = FieldErrors::new();
    match check_value(def, value, "default", Mode::Json, &mut errors) {
        Some(normalized) if errors.is_empty() => Ok(normalized),
        _ => Err(errors
            .iter()
            .next()
            .map(|(_, message)| message.to_string())
            .unwrap_or_else(|| "rejected".to_string())),
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn validate_object(
    obj: &Map<String, Value>,
    fields: &BTreeMap<String, FieldDef>,
    unknown: UnknownFields,
    prefix: &str,
    mode: Mode,
    errors: &mut FieldErrors,
) -> Map<String, Value> {
    if unknown == UnknownFields::Reject {
        for key in obj.keys().filter(|k| !fields.contains_key(*k)) {
            errors.add(make_path(prefix, key), "Unrecognized field");
        }
    }

    let mut output = Map::new();

    for (name, def) in fields {
        let path = make_path(prefix, name);

        let raw = match obj.get(name) {
            Some(Value::String(s)) if s.is_empty() && (def.empty_as_absent || mode == Mode::Query) => None,
            other => other,
        };

        match raw {
            Some(value) => {
                if let Some(normalized) = check_value(def, value, &path, mode, errors) {
                    output.insert(name.clone(), normalized);
                }
            }
            None => {
                if let Some(default) = &def.default {
                    output.insert(name.clone(), default.clone());
                } else if def.required {
                    errors.add(path, def.required_message.as_deref().unwrap_or("Required"));
                }
            }
        }
    }

    output
}

/// Checks one present value. Records failures under `path` and returns the
/// normalized value when the field itself passed.
fn check_value(
    def: &FieldDef,
    value: &Value,
    path: &str,
    mode: Mode,
    errors: &mut FieldErrors,
) -> Option<Value> {
    match &def.field_type {
        FieldType::String(rules) => {
            let Some(s) = value.as_str() else {
                errors.add(path, type_message(def, value));
                return None;
            };
            if let Err(message) = check_string(rules, s) {
                errors.add(path, message);
                return None;
            }
            let normalized = match rules.strip_prefix {
                Some(sigil) => s.strip_prefix(sigil).unwrap_or(s),
                None => s,
            };
            Some(Value::String(normalized.to_string()))
        }

        FieldType::Int(rules) => {
            let n = match (value, mode) {
                (Value::Number(n), _) => match n.as_i64() {
                    Some(n) => n,
                    None => {
                        errors.add(path, integer_message(def, n.is_f64()));
                        return None;
                    }
                },
                (Value::String(s), Mode::Query) => match s.trim().parse::<i64>() {
                    Ok(n) => n,
                    Err(_) => {
                        let is_float = s.trim().parse::<f64>().is_ok();
                        errors.add(path, integer_message(def, is_float));
                        return None;
                    }
                },
                _ => {
                    errors.add(path, type_message(def, value));
                    return None;
                }
            };

            if let Some(min) = &rules.min {
                if n < min.value {
                    errors.add(path, min.message.clone());
                    return None;
                }
            }
            if let Some(max) = &rules.max {
                if n > max.value {
                    errors.add(path, max.message.clone());
                    return None;
                }
            }
            Some(Value::from(n))
        }

        FieldType::Bool(rules) => {
            let b = match (value, mode) {
                (Value::Bool(b), _) => *b,
                (Value::String(s), Mode::Query) if s == "true" => true,
                (Value::String(s), Mode::Query) if s == "false" => false,
                _ => {
                    errors.add(path, type_message(def, value));
                    return None;
                }
            };
            if let Some(expected) = &rules.must_be {
                if b != expected.value {
                    errors.add(path, expected.message.clone());
                    return None;
                }
            }
            Some(Value::Bool(b))
        }

        FieldType::Enum(allowed) => {
            let Some(s) = value.as_str() else {
                errors.add(path, type_message(def, value));
                return None;
            };
            if !allowed.iter().any(|a| a == s) {
                errors.add(
                    path,
                    format!(
                        "Invalid enum value. Expected {}, received '{}'",
                        allowed
                            .iter()
                            .map(|a| format!("'{}'", a))
                            .collect::<Vec<_>>()
                            .join(" | "),
                        s
                    ),
                );
                return None;
            }
            Some(Value::String(s.to_string()))
        }

        FieldType::Object(fields) => {
            let Some(obj) = value.as_object() else {
                errors.add(path, type_message(def, value));
                return None;
            };
            let nested = validate_object(obj, fields, UnknownFields::Strip, path, mode, errors);
            Some(Value::Object(nested))
        }

        FieldType::Array(element) => {
            let Some(items) = value.as_array() else {
                errors.add(path, type_message(def, value));
                return None;
            };
            let mut normalized = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{}[{}]", path, i);
                if let Some(v) = check_value(element, item, &item_path, mode, errors) {
                    normalized.push(v);
                }
            }
            Some(Value::Array(normalized))
        }
    }
}

/// Runs every string check. When several fail, the last one's message is
/// the one reported.
fn check_string(rules: &StringRules, s: &str) -> Result<(), String> {
    let len = s.chars().count();
    let mut failure = None;

    if let Some(min) = &rules.min_len {
        if len < min.value {
            failure = Some(&min.message);
        }
    }
    if let Some(max) = &rules.max_len {
        if len > max.value {
            failure = Some(&max.message);
        }
    }
    if let Some(pattern) = &rules.pattern {
        if !pattern.value.is_match(s) {
            failure = Some(&pattern.message);
        }
    }
    if let Some(format) = &rules.format {
        let ok = match format.value {
            StringFormat::Email => is_email(s),
            StringFormat::Url => is_url(s),
            StringFormat::DateTime => is_utc_timestamp(s),
        };
        if !ok {
            failure = Some(&format.message);
        }
    }
    if let Some(classes) = &rules.required_classes {
        if !classes.value.iter().all(|class| s.chars().any(|c| class.matches(c))) {
            failure = Some(&classes.message);
        }
    }

    match failure {
        Some(message) => Err(message.clone()),
        None => Ok(()),
    }
}

/// RFC 3339 in UTC: `YYYY-MM-DDTHH:MM:SS[.fff]Z`. Numeric offsets are
/// rejected.
fn is_utc_timestamp(s: &str) -> bool {
    s.len() > 10
        && s.as_bytes()[10] == b'T'
        && s.ends_with('Z')
        && DateTime::parse_from_rfc3339(s).is_ok()
}

/// `local@label.label.tld`, no leading dot and no consecutive dots in the
/// local part, alphabetic TLD of at least two characters.
fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.rsplit_once('@') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-'".contains(c));

    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
        && labels
            .last()
            .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));

    local_ok && domain_ok
}

/// `scheme://rest` with an RFC 3986 scheme and no whitespace.
fn is_url(s: &str) -> bool {
    let Some((scheme, rest)) = s.split_once("://") else {
        return false;
    };

    let mut scheme_chars = scheme.chars();
    let scheme_ok = scheme_chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme_chars.all(|c| c.is_ascii_alphanumeric() || "+.-".contains(c));

    scheme_ok && !rest.is_empty() && !rest.starts_with('/') && !s.chars().any(char::is_whitespace)
}

fn type_message(def: &FieldDef, actual: &Value) -> String {
    def.type_message.clone().unwrap_or_else(|| {
        format!(
            "Expected {}, received {}",
            def.field_type.type_name(),
            json_type_name(actual)
        )
    })
}

fn integer_message(def: &FieldDef, is_float: bool) -> String {
    if is_float {
        "Expected integer, received float".to_string()
    } else {
        def.type_message
            .clone()
            .unwrap_or_else(|| "Expected integer, received string".to_string())
    }
}

/// Returns the JSON type name for error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Creates a field path from prefix and field name.
fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{CharClass, Refinement};
    use serde_json::json;

    fn contact_schema() -> Schema {
        Schema::define(
            "contact",
            [
                ("handle", FieldDef::string().pattern(r"^@?[a-z]{1,8}$", "bad handle").strip_prefix('@')),
                ("age", FieldDef::int().min(18, "adults only").max(120, "too old")),
                ("email", FieldDef::string().format(StringFormat::Email, "bad email").optional().empty_as_absent()),
                ("phone", FieldDef::string().optional().empty_as_absent()),
                ("agreed", FieldDef::boolean().must_be(true, "must agree")),
                ("tier", FieldDef::one_of(&["free", "pro"]).default_value("free")),
            ],
        )
        .unwrap()
        .refine(Refinement::any_present(&["email", "phone"], "email", "need a contact"))
        .unwrap()
    }

    fn valid_input() -> Value {
        json!({
            "handle": "@alice",
            "age": 30,
            "email": "alice@example.com",
            "agreed": true
        })
    }

    #[test]
    fn test_valid_input_is_normalized() {
        let result = contact_schema().validate(&valid_input());
        let ValidationResult::Valid(value) = result else {
            panic!("expected valid");
        };
        assert_eq!(value["handle"], "alice");
        assert_eq!(value["tier"], "free");
        assert!(value.get("phone").is_none());
    }

    #[test]
    fn test_all_invalid_fields_reported() {
        let input = json!({
            "handle": "NOT VALID",
            "age": 5,
            "email": "nope",
            "agreed": false
        });
        let errors = contact_schema().validate(&input).into_result().unwrap_err();
        assert_eq!(errors.get("handle"), Some("bad handle"));
        assert_eq!(errors.get("age"), Some("adults only"));
        assert_eq!(errors.get("email"), Some("bad email"));
        assert_eq!(errors.get("agreed"), Some("must agree"));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_missing_required_fields() {
        let errors = contact_schema().validate(&json!({})).into_result().unwrap_err();
        assert_eq!(errors.get("handle"), Some("Required"));
        assert_eq!(errors.get("age"), Some("Required"));
        assert_eq!(errors.get("agreed"), Some("Required"));
        // Defaults fill absent optional fields, so no error there
        assert!(!errors.contains("tier"));
    }

    #[test]
    fn test_type_mismatch_keyed_to_field() {
        let mut input = valid_input();
        input["age"] = json!("thirty");
        input["agreed"] = Value::Null;
        let errors = contact_schema().validate(&input).into_result().unwrap_err();
        assert_eq!(errors.get("age"), Some("Expected integer, received string"));
        assert_eq!(errors.get("agreed"), Some("Expected boolean, received null"));
    }

    #[test]
    fn test_float_rejected_for_integer() {
        let mut input = valid_input();
        input["age"] = json!(30.5);
        let errors = contact_schema().validate(&input).into_result().unwrap_err();
        assert_eq!(errors.get("age"), Some("Expected integer, received float"));
    }

    #[test]
    fn test_refinement_runs_after_fields_pass() {
        let mut input = valid_input();
        input.as_object_mut().unwrap().remove("email");
        let errors = contact_schema().validate(&input).into_result().unwrap_err();
        assert_eq!(errors.get("email"), Some("need a contact"));
        assert_eq!(errors.len(), 1);

        // With a field failure present, the refinement does not run
        input["age"] = json!(3);
        let errors = contact_schema().validate(&input).into_result().unwrap_err();
        assert!(!errors.contains("email"));
    }

    #[test]
    fn test_empty_string_counts_as_absent_for_refinement() {
        let mut input = valid_input();
        input["email"] = json!("");
        input["phone"] = json!("");
        let errors = contact_schema().validate(&input).into_result().unwrap_err();
        assert_eq!(errors.get("email"), Some("need a contact"));
    }

    #[test]
    fn test_unknown_fields_stripped_or_rejected() {
        let mut input = valid_input();
        input["extra"] = json!("ignored");

        let ValidationResult::Valid(value) = contact_schema().validate(&input) else {
            panic!("expected valid");
        };
        assert!(value.get("extra").is_none());

        let errors = contact_schema().strict().validate(&input).into_result().unwrap_err();
        assert_eq!(errors.get("extra"), Some("Unrecognized field"));
    }

    #[test]
    fn test_non_object_root() {
        let errors = contact_schema().validate(&json!([1, 2])).into_result().unwrap_err();
        assert_eq!(errors.get(ROOT_PATH), Some("Expected object, received array"));
    }

    #[test]
    fn test_query_coercion() {
        let schema = Schema::define(
            "query",
            [
                ("page", FieldDef::int().min(1, "page >= 1").default_value(1)),
                ("limit", FieldDef::int().min(1, "limit >= 1").max(100, "limit <= 100").default_value(20)),
                ("order", FieldDef::one_of(&["asc", "desc"]).default_value("desc")),
                ("featured", FieldDef::boolean().optional()),
            ],
        )
        .unwrap();

        let params: HashMap<String, String> = [
            ("page".to_string(), "3".to_string()),
            ("featured".to_string(), "true".to_string()),
            ("order".to_string(), "".to_string()),
        ]
        .into_iter()
        .collect();

        let ValidationResult::Valid(value) = schema.validate_query(&params) else {
            panic!("expected valid");
        };
        assert_eq!(value, json!({"page": 3, "limit": 20, "order": "desc", "featured": true}));

        let bad: HashMap<String, String> =
            [("page".to_string(), "abc".to_string()), ("limit".to_string(), "500".to_string())]
                .into_iter()
                .collect();
        let errors = schema.validate_query(&bad).into_result().unwrap_err();
        assert_eq!(errors.get("page"), Some("Expected integer, received string"));
        assert_eq!(errors.get("limit"), Some("limit <= 100"));
    }

    #[test]
    fn test_body_does_not_coerce_strings() {
        let schema = Schema::define("n", [("n", FieldDef::int())]).unwrap();
        let errors = schema.validate(&json!({"n": "5"})).into_result().unwrap_err();
        assert_eq!(errors.get("n"), Some("Expected integer, received string"));
    }

    #[test]
    fn test_nested_paths() {
        let schema = Schema::define(
            "order",
            [
                ("owner", FieldDef::object([("email", FieldDef::string().format(StringFormat::Email, "bad email"))])),
                ("tags", FieldDef::array(FieldDef::string().max_len(3, "tag too long"))),
            ],
        )
        .unwrap();

        let input = json!({"owner": {"email": "x"}, "tags": ["ok", "way too long"]});
        let errors = schema.validate(&input).into_result().unwrap_err();
        assert_eq!(errors.get("owner.email"), Some("bad email"));
        assert_eq!(errors.get("tags[1]"), Some("tag too long"));
        assert!(!errors.contains("tags[0]"));
    }

    #[test]
    fn test_required_classes() {
        let schema = Schema::define(
            "pw",
            [(
                "password",
                FieldDef::string().require_classes(&[CharClass::Upper, CharClass::Lower, CharClass::Digit], "weak"),
            )],
        )
        .unwrap();
        assert!(!schema.validate(&json!({"password": "alllower1"})).is_valid());
        assert!(schema.validate(&json!({"password": "Mixed1"})).is_valid());
    }

    #[test]
    fn test_formats() {
        assert!(is_email("a@b.com"));
        assert!(is_email("first.last+tag@mail.example.jp"));
        assert!(!is_email("a@b"));
        assert!(!is_email(".a@b.com"));
        assert!(!is_email("a..b@c.com"));
        assert!(!is_email("no-at-sign.com"));

        assert!(is_url("https://example.com/img.png"));
        assert!(is_url("ftp://files.example.com"));
        assert!(!is_url("example.com"));
        assert!(!is_url("https://"));
        assert!(!is_url("https://exa mple.com"));
    }

    #[test]
    fn test_last_failing_string_check_wins() {
        let schema = Schema::define(
            "profile",
            [(
                "handle",
                FieldDef::string()
                    .min_len(1, "enter a handle")
                    .pattern(r"^[a-z]{1,8}$", "letters only"),
            )],
        )
        .unwrap();

        let errors = schema.validate(&json!({"handle": ""})).into_result().unwrap_err();
        assert_eq!(errors.get("handle"), Some("letters only"));

        // A type failure still stops the field before any string check
        let errors = schema.validate(&json!({"handle": 7})).into_result().unwrap_err();
        assert_eq!(errors.get("handle"), Some("Expected string, received integer"));
    }

    #[test]
    fn test_timestamps_must_be_utc() {
        assert!(is_utc_timestamp("2024-01-01T00:00:00Z"));
        assert!(is_utc_timestamp("2024-01-01T00:00:00.123Z"));
        assert!(!is_utc_timestamp("2024-01-01T09:00:00+09:00"));
        assert!(!is_utc_timestamp("2024-01-01T00:00:00z"));
        assert!(!is_utc_timestamp("2024-01-01 00:00:00Z"));
        assert!(!is_utc_timestamp("2024-01-01"));
        assert!(!is_utc_timestamp("2024-13-01T00:00:00Z"));
    }

    #[test]
    fn test_validation_is_deterministic() {
        let schema = contact_schema();
        let input = json!({"handle": "??", "age": "x", "agreed": 1});
        let first = schema.validate(&input);
        for _ in 0..50 {
            assert_eq!(schema.validate(&input), first);
        }
    }

    #[test]
    fn test_into_typed() {
        #[derive(serde::Deserialize)]
        struct Contact {
            handle: String,
            age: i64,
            tier: String,
        }

        let typed: ValidationResult<Contact> = contact_schema()
            .validate(&valid_input())
            .into_typed()
            .unwrap();
        let ValidationResult::Valid(contact) = typed else {
            panic!("expected valid");
        };
        assert_eq!(contact.handle, "alice");
        assert_eq!(contact.age, 30);
        assert_eq!(contact.tier, "free");
    }
}
