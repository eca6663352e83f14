//! Field-by-field reading of JSON request bodies. Every violation is collected before failing,
//! so a caller sees all bad fields at once.

use crate::error::ValidationErrors;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern compiles")
});

pub fn is_valid_email(s: &str) -> bool {
    let local = s.split('@').next().unwrap_or("");
    EMAIL_RE.is_match(s)
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
}

/// Update field state: distinguishes "not sent" from "sent as null".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Patch<T> {
    Absent,
    Null,
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Patch::Null)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Value(v) => v.serialize(serializer),
            Patch::Absent | Patch::Null => serializer.serialize_none(),
        }
    }
}

/// Only reached for keys that are present; pair with `#[serde(default)]` so missing keys stay `Absent`.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

/// Reads fields out of one JSON object and accumulates errors. Values returned after an error are
/// placeholders; callers must only use them when [`FieldReader::finish`] succeeds.
pub struct FieldReader<'a> {
    obj: Option<&'a Map<String, Value>>,
    errors: ValidationErrors,
}

impl<'a> FieldReader<'a> {
    pub fn new(value: &'a Value) -> Self {
        let mut errors = ValidationErrors::new();
        let obj = value.as_object();
        if obj.is_none() {
            errors.push("body", "must be a JSON object");
        }
        FieldReader { obj, errors }
    }

    fn patch<T: DeserializeOwned>(&mut self, field: &str, expected: &str) -> Patch<T> {
        match self.obj.and_then(|o| o.get(field)) {
            None => Patch::Absent,
            Some(Value::Null) => Patch::Null,
            Some(v) => match serde_json::from_value::<T>(v.clone()) {
                Ok(t) => Patch::Value(t),
                Err(_) => {
                    self.errors.push(field, format!("must be {}", expected));
                    Patch::Absent
                }
            },
        }
    }

    fn required<T: DeserializeOwned + Default>(&mut self, field: &str, expected: &str) -> T {
        match self.patch::<T>(field, expected) {
            Patch::Value(v) => v,
            Patch::Absent | Patch::Null => {
                if !self.errors.has_field(field) {
                    self.errors.push(field, "field required");
                }
                T::default()
            }
        }
    }

    pub fn required_email(&mut self, field: &str) -> String {
        let value: String = self.required(field, "a string");
        if !value.is_empty() || !self.errors.has_field(field) {
            self.check_email(field, &value);
        }
        value
    }

    pub fn patch_email(&mut self, field: &str) -> Patch<String> {
        let patch = self.patch::<String>(field, "a string");
        if let Patch::Value(ref v) = patch {
            self.check_email(field, v);
        }
        patch
    }

    fn check_email(&mut self, field: &str, value: &str) {
        if !is_valid_email(value) {
            self.errors.push(field, "value is not a valid email address");
        }
    }

    pub fn required_string_min(&mut self, field: &str, min_chars: usize) -> String {
        let value: String = self.required(field, "a string");
        if !self.errors.has_field(field) && value.chars().count() < min_chars {
            self.errors
                .push(field, format!("must be at least {} characters", min_chars));
        }
        value
    }

    pub fn required_string(&mut self, field: &str) -> String {
        self.required(field, "a string")
    }

    pub fn required_i64(&mut self, field: &str) -> i64 {
        self.required(field, "an integer")
    }

    pub fn optional_string(&mut self, field: &str) -> Option<String> {
        self.patch_string(field).value().cloned()
    }

    pub fn patch_string(&mut self, field: &str) -> Patch<String> {
        self.patch(field, "a string")
    }

    pub fn bool_or(&mut self, field: &str, default: bool) -> bool {
        match self.patch_bool(field) {
            Patch::Value(b) => b,
            Patch::Absent => default,
            Patch::Null => {
                self.errors.push(field, "must be a boolean");
                default
            }
        }
    }

    pub fn patch_bool(&mut self, field: &str) -> Patch<bool> {
        self.patch(field, "a boolean")
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        self.errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_shapes() {
        for ok in ["a@b.co", "first.last+tag@sub.example.org", "x_y@host-name.io"] {
            assert!(is_valid_email(ok), "{}", ok);
        }
        for bad in ["", "plain", "@example.com", "a@", "a@b", "a b@c.com", "a@@b.com", ".a@b.com", "a..b@c.com", "a@-b.com"] {
            assert!(!is_valid_email(bad), "{}", bad);
        }
    }

    #[test]
    fn reader_collects_every_error() {
        let body = json!({"email": 5, "flag": "yes", "name": ["x"]});
        let mut r = FieldReader::new(&body);
        r.required_email("email");
        r.bool_or("flag", true);
        r.optional_string("name");
        r.required_string("missing");
        let errs = r.finish().unwrap_err();
        let fields: Vec<_> = errs.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["email", "flag", "name", "missing"]);
        assert_eq!(errs.errors()[0].message, "must be a string");
        assert_eq!(errs.errors()[3].message, "field required");
    }

    #[test]
    fn non_object_body_is_rejected() {
        let body = json!([1, 2]);
        let errs = FieldReader::new(&body).finish().unwrap_err();
        assert!(errs.has_field("body"));
    }

    #[test]
    fn password_length_counts_characters() {
        let body = json!({"a": "ééééééé", "b": "éééééééé"});
        let mut r = FieldReader::new(&body);
        r.required_string_min("a", 8);
        r.required_string_min("b", 8);
        let errs = r.finish().unwrap_err();
        assert!(errs.has_field("a"));
        assert!(!errs.has_field("b"));
    }

    #[test]
    fn patch_distinguishes_absent_and_null() {
        let body = json!({"set": "x", "cleared": null});
        let mut r = FieldReader::new(&body);
        assert_eq!(r.patch_string("set"), Patch::Value("x".to_string()));
        assert_eq!(r.patch_string("cleared"), Patch::Null);
        assert_eq!(r.patch_string("untouched"), Patch::Absent);
        assert!(r.finish().is_ok());
    }

    #[test]
    fn patch_serde() {
        #[derive(Serialize, Deserialize)]
        struct Doc {
            #[serde(default, skip_serializing_if = "Patch::is_absent")]
            a: Patch<i32>,
            #[serde(default, skip_serializing_if = "Patch::is_absent")]
            b: Patch<i32>,
            #[serde(default, skip_serializing_if = "Patch::is_absent")]
            c: Patch<i32>,
        }
        let doc: Doc = serde_json::from_value(json!({"a": 1, "b": null})).unwrap();
        assert_eq!(doc.a, Patch::Value(1));
        assert!(doc.b.is_null());
        assert!(doc.c.is_absent());
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"a": 1, "b": null}));
    }
}
