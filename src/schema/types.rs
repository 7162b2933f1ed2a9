//! Schema type definitions
//!
//! Supported field types:
//! - string: UTF-8 string with length, pattern, format and character-class checks
//! - int: 64-bit signed integer with optional bounds
//! - bool: Boolean, optionally pinned to one value
//! - enum: string restricted to a fixed set
//! - object: nested object with its own field definitions
//! - array: homogeneous array with one element definition
//!
//! Schemas are values. `partial`, `extend`, `strict` and `named` return new
//! schemas and never touch the one they were derived from.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};
use super::validator::conform_default;

/// A constraint together with the message reported when it fails
#[derive(Debug, Clone)]
pub struct Check<T> {
    pub value: T,
    pub message: String,
}

impl<T> Check<T> {
    fn new(value: T, message: impl Into<String>) -> Self {
        Self {
            value,
            message: message.into(),
        }
    }
}

/// Well-known string formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    /// `local@domain.tld`
    Email,
    /// `scheme://rest`
    Url,
    /// RFC 3339 timestamp
    DateTime,
}

/// Character classes a string may be required to contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Upper,
    Lower,
    Digit,
}

impl CharClass {
    pub fn matches(&self, c: char) -> bool {
        match self {
            CharClass::Upper => c.is_uppercase(),
            CharClass::Lower => c.is_lowercase(),
            CharClass::Digit => c.is_ascii_digit(),
        }
    }
}

/// String constraints, checked in declaration order of the struct fields
#[derive(Debug, Clone, Default)]
pub struct StringRules {
    pub min_len: Option<Check<usize>>,
    pub max_len: Option<Check<usize>>,
    pub pattern: Option<Check<Regex>>,
    pub format: Option<Check<StringFormat>>,
    pub required_classes: Option<Check<Vec<CharClass>>>,
    /// Leading sigil removed after all checks pass (e.g. `@` on handles)
    pub strip_prefix: Option<char>,
}

/// Integer constraints
#[derive(Debug, Clone, Default)]
pub struct IntRules {
    pub min: Option<Check<i64>>,
    pub max: Option<Check<i64>>,
}

/// Boolean constraints
#[derive(Debug, Clone, Default)]
pub struct BoolRules {
    pub must_be: Option<Check<bool>>,
}

/// Supported field types
#[derive(Debug, Clone)]
pub enum FieldType {
    String(StringRules),
    Int(IntRules),
    Bool(BoolRules),
    Enum(Vec<String>),
    Object(BTreeMap<String, FieldDef>),
    Array(Box<FieldDef>),
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String(_) => "string",
            FieldType::Int(_) => "integer",
            FieldType::Bool(_) => "boolean",
            FieldType::Enum(_) => "string",
            FieldType::Object(_) => "object",
            FieldType::Array(_) => "array",
        }
    }
}

/// Builder mistakes recorded on a field and reported by `Schema::define`
#[derive(Debug, Clone, PartialEq, Eq)]
enum Defect {
    Pattern(String),
    Misapplied(&'static str),
}

/// Field definition
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub field_type: FieldType,
    pub required: bool,
    /// Inserted when the field is absent
    pub default: Option<Value>,
    /// An empty string is treated as if the field were absent
    pub empty_as_absent: bool,
    pub required_message: Option<String>,
    pub type_message: Option<String>,
    defects: Vec<Defect>,
}

impl FieldDef {
    fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
            default: None,
            empty_as_absent: false,
            required_message: None,
            type_message: None,
            defects: Vec::new(),
        }
    }

    /// Required string field
    pub fn string() -> Self {
        Self::of(FieldType::String(StringRules::default()))
    }

    /// Required integer field
    pub fn int() -> Self {
        Self::of(FieldType::Int(IntRules::default()))
    }

    /// Required boolean field
    pub fn boolean() -> Self {
        Self::of(FieldType::Bool(BoolRules::default()))
    }

    /// Required string restricted to `values`
    pub fn one_of(values: &[&str]) -> Self {
        Self::of(FieldType::Enum(values.iter().map(|v| v.to_string()).collect()))
    }

    /// Required nested object
    pub fn object<'a>(fields: impl IntoIterator<Item = (&'a str, FieldDef)>) -> Self {
        Self::of(FieldType::Object(
            fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        ))
    }

    /// Required array whose elements follow `element`
    pub fn array(element: FieldDef) -> Self {
        Self::of(FieldType::Array(Box::new(element)))
    }

    // ------------------------------------------------------------------
    // Presence
    // ------------------------------------------------------------------

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Value used when the field is absent. Implies optional.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(value.into());
        self
    }

    pub fn empty_as_absent(mut self) -> Self {
        self.empty_as_absent = true;
        self
    }

    pub fn required_message(mut self, message: impl Into<String>) -> Self {
        self.required_message = Some(message.into());
        self
    }

    pub fn type_message(mut self, message: impl Into<String>) -> Self {
        self.type_message = Some(message.into());
        self
    }

    // ------------------------------------------------------------------
    // String rules
    // ------------------------------------------------------------------

    fn string_rules(&mut self, rule: &'static str) -> Option<&mut StringRules> {
        match &mut self.field_type {
            FieldType::String(rules) => Some(rules),
            _ => {
                self.defects.push(Defect::Misapplied(rule));
                None
            }
        }
    }

    pub fn min_len(mut self, len: usize, message: impl Into<String>) -> Self {
        if let Some(rules) = self.string_rules("min_len") {
            rules.min_len = Some(Check::new(len, message));
        }
        self
    }

    pub fn max_len(mut self, len: usize, message: impl Into<String>) -> Self {
        if let Some(rules) = self.string_rules("max_len") {
            rules.max_len = Some(Check::new(len, message));
        }
        self
    }

    pub fn pattern(mut self, pattern: &str, message: impl Into<String>) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => {
                if let Some(rules) = self.string_rules("pattern") {
                    rules.pattern = Some(Check::new(regex, message));
                }
            }
            Err(e) => self.defects.push(Defect::Pattern(e.to_string())),
        }
        self
    }

    pub fn format(mut self, format: StringFormat, message: impl Into<String>) -> Self {
        if let Some(rules) = self.string_rules("format") {
            rules.format = Some(Check::new(format, message));
        }
        self
    }

    pub fn require_classes(mut self, classes: &[CharClass], message: impl Into<String>) -> Self {
        if let Some(rules) = self.string_rules("require_classes") {
            rules.required_classes = Some(Check::new(classes.to_vec(), message));
        }
        self
    }

    pub fn strip_prefix(mut self, sigil: char) -> Self {
        if let Some(rules) = self.string_rules("strip_prefix") {
            rules.strip_prefix = Some(sigil);
        }
        self
    }

    // ------------------------------------------------------------------
    // Integer and boolean rules
    // ------------------------------------------------------------------

    pub fn min(mut self, min: i64, message: impl Into<String>) -> Self {
        match &mut self.field_type {
            FieldType::Int(rules) => rules.min = Some(Check::new(min, message)),
            _ => self.defects.push(Defect::Misapplied("min")),
        }
        self
    }

    pub fn max(mut self, max: i64, message: impl Into<String>) -> Self {
        match &mut self.field_type {
            FieldType::Int(rules) => rules.max = Some(Check::new(max, message)),
            _ => self.defects.push(Defect::Misapplied("max")),
        }
        self
    }

    pub fn must_be(mut self, expected: bool, message: impl Into<String>) -> Self {
        match &mut self.field_type {
            FieldType::Bool(rules) => rules.must_be = Some(Check::new(expected, message)),
            _ => self.defects.push(Defect::Misapplied("must_be")),
        }
        self
    }

    /// Checks this definition (and nested ones) for construction mistakes.
    fn check_structure(&self, schema: &str, path: &str) -> SchemaResult<()> {
        if let Some(defect) = self.defects.first() {
            return Err(match defect {
                Defect::Pattern(reason) => SchemaError::InvalidPattern {
                    schema: schema.to_string(),
                    field: path.to_string(),
                    reason: reason.clone(),
                },
                Defect::Misapplied(rule) => SchemaError::MisappliedRule {
                    schema: schema.to_string(),
                    field: path.to_string(),
                    rule,
                },
            });
        }

        match &self.field_type {
            FieldType::String(rules) => {
                if let (Some(min), Some(max)) = (&rules.min_len, &rules.max_len) {
                    if min.value > max.value {
                        return Err(SchemaError::InvalidBounds {
                            schema: schema.to_string(),
                            field: path.to_string(),
                            min: min.value as i64,
                            max: max.value as i64,
                        });
                    }
                }
            }
            FieldType::Int(rules) => {
                if let (Some(min), Some(max)) = (&rules.min, &rules.max) {
                    if min.value > max.value {
                        return Err(SchemaError::InvalidBounds {
                            schema: schema.to_string(),
                            field: path.to_string(),
                            min: min.value,
                            max: max.value,
                        });
                    }
                }
            }
            FieldType::Enum(values) if values.is_empty() => {
                return Err(SchemaError::EmptyEnum {
                    schema: schema.to_string(),
                    field: path.to_string(),
                });
            }
            FieldType::Object(fields) => {
                for (name, def) in fields {
                    def.check_structure(schema, &format!("{}.{}", path, name))?;
                }
            }
            FieldType::Array(element) => {
                element.check_structure(schema, &format!("{}[]", path))?;
            }
            _ => {}
        }

        if let Some(default) = &self.default {
            conform_default(self, default).map_err(|reason| SchemaError::InvalidDefault {
                schema: schema.to_string(),
                field: path.to_string(),
                reason,
            })?;
        }

        Ok(())
    }
}

/// How a schema treats fields it does not declare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownFields {
    /// Dropped from the normalized output
    Strip,
    /// Reported as a field error
    Reject,
}

/// Cross-field rule evaluated after every field passed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefinementRule {
    /// At least one of the fields is present and non-empty
    AnyPresent(Vec<String>),
}

/// A refinement and the field path its failure is reported under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refinement {
    pub rule: RefinementRule,
    pub path: String,
    pub message: String,
}

impl Refinement {
    pub fn any_present(fields: &[&str], path: &str, message: impl Into<String>) -> Self {
        Self {
            rule: RefinementRule::AnyPresent(fields.iter().map(|f| f.to_string()).collect()),
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Complete schema definition
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: BTreeMap<String, FieldDef>,
    refinements: Vec<Refinement>,
    unknown_fields: UnknownFields,
}

impl Schema {
    /// Builds a schema from field declarations and checks its structure.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` for invalid patterns, inverted bounds, empty
    /// enums, rules applied to the wrong type and non-conforming defaults.
    pub fn define<'a>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (&'a str, FieldDef)>,
    ) -> SchemaResult<Self> {
        let schema = Self {
            name: name.into(),
            fields: fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            refinements: Vec::new(),
            unknown_fields: UnknownFields::Strip,
        };
        schema.check_structure()?;
        Ok(schema)
    }

    /// Derives a schema where every field is optional.
    ///
    /// Constraints are kept. Defaults and refinements are dropped so that an
    /// empty object is accepted and absent fields stay absent.
    pub fn partial(&self) -> Self {
        let fields = self
            .fields
            .iter()
            .map(|(name, def)| {
                let mut def = def.clone();
                def.required = false;
                def.default = None;
                (name.clone(), def)
            })
            .collect();

        Self {
            name: format!("{}.partial", self.name),
            fields,
            refinements: Vec::new(),
            unknown_fields: self.unknown_fields,
        }
    }

    /// Derives a schema with `additional` fields merged in. Fields with the
    /// same name replace the base definition.
    pub fn extend<'a>(
        &self,
        additional: impl IntoIterator<Item = (&'a str, FieldDef)>,
    ) -> SchemaResult<Self> {
        let mut derived = self.clone();
        for (name, def) in additional {
            derived.fields.insert(name.to_string(), def);
        }
        derived.check_structure()?;
        Ok(derived)
    }

    /// Adds a cross-field refinement.
    pub fn refine(&self, refinement: Refinement) -> SchemaResult<Self> {
        let mut derived = self.clone();
        derived.refinements.push(refinement);
        derived.check_structure()?;
        Ok(derived)
    }

    /// Derives a schema that rejects undeclared fields.
    pub fn strict(&self) -> Self {
        Self {
            unknown_fields: UnknownFields::Reject,
            ..self.clone()
        }
    }

    /// Same schema under another name.
    pub fn named(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldDef> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    pub fn refinements(&self) -> &[Refinement] {
        &self.refinements
    }

    pub fn unknown_fields(&self) -> UnknownFields {
        self.unknown_fields
    }

    fn check_structure(&self) -> SchemaResult<()> {
        for (name, def) in &self.fields {
            def.check_structure(&self.name, name)?;
        }

        for refinement in &self.refinements {
            let RefinementRule::AnyPresent(targets) = &refinement.rule;
            for field in targets.iter().chain(std::iter::once(&refinement.path)) {
                if !self.fields.contains_key(field) {
                    return Err(SchemaError::UnknownRefinementField {
                        schema: self.name.clone(),
                        field: field.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_schema() -> Schema {
        Schema::define(
            "users",
            [
                ("name", FieldDef::string().min_len(1, "name is required")),
                ("age", FieldDef::int().min(0, "too young").optional()),
                ("role", FieldDef::one_of(&["admin", "member"]).default_value("member")),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_define_valid_schema() {
        let schema = sample_schema();
        assert_eq!(schema.name(), "users");
        assert_eq!(schema.fields().len(), 3);
        assert!(schema.field("name").unwrap().required);
        assert!(!schema.field("age").unwrap().required);
    }

    #[test]
    fn test_invalid_pattern_fails_at_definition() {
        let result = Schema::define("bad", [("code", FieldDef::string().pattern("([", "bad"))]);
        assert!(matches!(result, Err(SchemaError::InvalidPattern { .. })));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let result = Schema::define("bad", [("n", FieldDef::int().min(10, "lo").max(1, "hi"))]);
        assert!(matches!(result, Err(SchemaError::InvalidBounds { min: 10, max: 1, .. })));
    }

    #[test]
    fn test_rule_on_wrong_type_rejected() {
        let result = Schema::define("bad", [("flag", FieldDef::boolean().min_len(1, "x"))]);
        assert!(matches!(
            result,
            Err(SchemaError::MisappliedRule { rule: "min_len", .. })
        ));
    }

    #[test]
    fn test_nonconforming_default_rejected() {
        let result = Schema::define(
            "bad",
            [("page", FieldDef::int().min(1, "page must be positive").default_value(0))],
        );
        assert!(matches!(result, Err(SchemaError::InvalidDefault { .. })));
    }

    #[test]
    fn test_empty_enum_rejected() {
        let result = Schema::define("bad", [("state", FieldDef::one_of(&[]))]);
        assert!(matches!(result, Err(SchemaError::EmptyEnum { .. })));
    }

    #[test]
    fn test_partial_makes_every_field_optional() {
        let base = sample_schema();
        let partial = base.partial();

        assert_eq!(partial.name(), "users.partial");
        assert!(partial.fields().values().all(|f| !f.required));
        assert!(partial.field("role").unwrap().default.is_none());

        // The base schema is untouched
        assert!(base.field("name").unwrap().required);
        assert_eq!(base.field("role").unwrap().default, Some(json!("member")));
    }

    #[test]
    fn test_extend_adds_and_overrides() {
        let base = sample_schema();
        let extended = base
            .extend([
                ("status", FieldDef::one_of(&["active", "banned"]).optional()),
                ("age", FieldDef::int().min(18, "adults only")),
            ])
            .unwrap();

        assert_eq!(extended.fields().len(), 4);
        assert!(extended.field("age").unwrap().required);
        assert!(base.field("status").is_none());
        assert!(!base.field("age").unwrap().required);
    }

    #[test]
    fn test_refinement_must_reference_declared_fields() {
        let base = sample_schema();
        let result = base.refine(Refinement::any_present(&["name", "phone"], "name", "x"));
        assert!(matches!(
            result,
            Err(SchemaError::UnknownRefinementField { ref field, .. }) if field == "phone"
        ));
    }

    #[test]
    fn test_partial_drops_refinements() {
        let refined = sample_schema()
            .refine(Refinement::any_present(&["name", "age"], "name", "need one"))
            .unwrap();
        assert_eq!(refined.refinements().len(), 1);
        assert!(refined.partial().refinements().is_empty());
    }

    #[test]
    fn test_strict_and_named_derive_new_values() {
        let base = sample_schema();
        let strict = base.strict().named("users.strict");
        assert_eq!(strict.unknown_fields(), UnknownFields::Reject);
        assert_eq!(strict.name(), "users.strict");
        assert_eq!(base.unknown_fields(), UnknownFields::Strip);
    }

    #[test]
    fn test_field_type_names() {
        assert_eq!(FieldDef::string().field_type.type_name(), "string");
        assert_eq!(FieldDef::int().field_type.type_name(), "integer");
        assert_eq!(FieldDef::boolean().field_type.type_name(), "boolean");
        assert_eq!(FieldDef::array(FieldDef::int()).field_type.type_name(), "array");
        assert_eq!(
            FieldDef::object(Vec::<(&str, FieldDef)>::new()).field_type.type_name(),
            "object"
        );
    }
}
