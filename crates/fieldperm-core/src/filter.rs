//! Per-request field authorization filtering.
//!
//! [`filter_fields`] derives the subset of a [`FieldSet`] that a caller may
//! see. The registry is only borrowed: the result is a fresh
//! [`FilteredFields`] on every call.

use indexmap::IndexMap;
use log::{debug, trace};
use serde_json::Value;

use crate::field::{Field, FieldSet};
use crate::request::RequestContext;
use crate::{Error, Result};

/// The fields visible to one request/instance pair, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FilteredFields<'a> {
    fields: IndexMap<&'a str, &'a Field>,
}

impl<'a> FilteredFields<'a> {
    /// Looks up a visible field by name.
    pub fn get(&self, name: &str) -> Option<&'a Field> {
        self.fields.get(name).copied()
    }

    /// Returns true if `name` survived filtering.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Visible fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Field> + '_ {
        self.fields.values().copied()
    }

    /// Visible field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.fields.keys().copied()
    }

    /// Number of visible fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if every field was hidden (or the registry was empty).
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Filters `fields` down to those the caller may see.
///
/// Fields without an access policy are always kept. Fields with one are kept
/// only if every permission passes for `(request, instance)`.
///
/// # Errors
///
/// - [`Error::Config`] if `request` is `None`.
/// - [`Error::PermissionCheck`] if a predicate fails internally.
///
/// # Example
///
/// ```
/// use fieldperm_core::filter::filter_fields;
/// use fieldperm_core::permission::{AllowAny, AllowNone};
/// use fieldperm_core::{Field, FieldSet, RequestContext};
///
/// let fields = FieldSet::from_fields([
///     Field::attribute("name"),
///     Field::attribute("email").permission(AllowNone),
///     Field::attribute("ssn").permission(AllowAny),
/// ])
/// .unwrap();
///
/// let request = RequestContext::anonymous();
/// let visible = filter_fields(&fields, Some(&request), None).unwrap();
/// assert_eq!(visible.names().collect::<Vec<_>>(), ["name", "ssn"]);
///
/// assert!(filter_fields(&fields, None, None).unwrap_err().is_config());
/// ```
pub fn filter_fields<'a>(
    fields: &'a FieldSet,
    request: Option<&RequestContext>,
    instance: Option<&Value>,
) -> Result<FilteredFields<'a>> {
    let request = request.ok_or_else(Error::missing_request)?;

    let mut visible = IndexMap::with_capacity(fields.len());
    for field in fields.iter() {
        let allowed = match field.access_policy() {
            None => true,
            Some(policy) => policy
                .check(request, instance)
                .map_err(|source| Error::permission_check(field.name(), source))?,
        };
        trace!("field '{}' visible={}", field.name(), allowed);
        if allowed {
            visible.insert(field.name(), field);
        }
    }

    if visible.len() < fields.len() {
        debug!(
            "hid {} of {} fields for user '{}'",
            fields.len() - visible.len(),
            fields.len(),
            request.user.username
        );
    }

    Ok(FilteredFields { fields: visible })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{AllowAny, AllowNone, FnPermission, IsOwner};
    use crate::request::User;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn person_fields() -> FieldSet {
        FieldSet::from_fields([
            Field::attribute("name"),
            Field::attribute("email").permission(AllowNone),
            Field::attribute("ssn").permission(AllowAny),
        ])
        .unwrap()
    }

    fn request() -> RequestContext {
        RequestContext::new(User::authenticated("alice"))
    }

    #[test]
    fn test_filter_scenario_valid_request() {
        let fields = person_fields();
        let visible = filter_fields(&fields, Some(&request()), None).unwrap();
        assert_eq!(visible.names().collect::<Vec<_>>(), ["name", "ssn"]);
        assert!(!visible.contains("email"));
        // Registry untouched.
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_filter_scenario_missing_request() {
        let fields = person_fields();
        let err = filter_fields(&fields, None, None).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_filter_missing_request_on_empty_set() {
        let fields = FieldSet::new();
        assert!(filter_fields(&fields, None, None).unwrap_err().is_config());
    }

    #[test]
    fn test_filter_empty_set() {
        let fields = FieldSet::new();
        let visible = filter_fields(&fields, Some(&request()), None).unwrap();
        assert!(visible.is_empty());
    }

    #[test]
    fn test_filter_two_checks_truth_table() {
        for (first, second) in [(true, true), (true, false), (false, true), (false, false)] {
            let fields = FieldSet::from_fields([Field::attribute("secret")
                .permission(FnPermission::new("first", move |_, _| Ok(first)))
                .permission(FnPermission::new("second", move |_, _| Ok(second)))])
            .unwrap();
            let visible = filter_fields(&fields, Some(&request()), None).unwrap();
            assert_eq!(visible.contains("secret"), first && second, "({first}, {second})");
        }
    }

    #[test]
    fn test_filter_predicate_error_propagates() {
        let fields = FieldSet::from_fields([
            Field::attribute("name"),
            Field::attribute("salary")
                .permission(FnPermission::new("lookup", |_, _| Err("directory offline".into()))),
        ])
        .unwrap();

        let err = filter_fields(&fields, Some(&request()), None).unwrap_err();
        match err {
            Error::PermissionCheck { field, source } => {
                assert_eq!(field, "salary");
                assert_eq!(source.to_string(), "directory offline");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_filter_each_check_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fields = FieldSet::from_fields([Field::attribute("counted").permission(
            FnPermission::new("counted", move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }),
        )])
        .unwrap();

        filter_fields(&fields, Some(&request()), Some(&json!({"id": 1}))).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_filter_no_leakage_between_instances() {
        let fields = FieldSet::from_fields([
            Field::attribute("album_name"),
            Field::attribute("diary").permission(IsOwner::new("artist")),
        ])
        .unwrap();
        let own = json!({"artist": "alice"});
        let other = json!({"artist": "bob"});

        let first = filter_fields(&fields, Some(&request()), Some(&own)).unwrap();
        let second = filter_fields(&fields, Some(&request()), Some(&other)).unwrap();
        let third = filter_fields(&fields, Some(&request()), Some(&own)).unwrap();

        assert!(first.contains("diary"));
        assert!(!second.contains("diary"));
        assert!(third.contains("diary"));
    }

    #[test]
    fn test_filter_get_returns_registry_field() {
        let fields = person_fields();
        let visible = filter_fields(&fields, Some(&request()), None).unwrap();
        let ssn = visible.get("ssn").unwrap();
        assert!(std::ptr::eq(ssn, fields.get("ssn").unwrap()));
        assert!(visible.get("email").is_none());
    }

    fn unique_names() -> impl Strategy<Value = Vec<String>> {
        prop::collection::btree_set("[a-z]{1,8}", 0..12).prop_map(|set| set.into_iter().collect())
    }

    proptest! {
        #[test]
        fn prop_no_checks_is_identity(names in unique_names()) {
            let fields = FieldSet::from_fields(names.iter().map(Field::attribute)).unwrap();
            let visible = filter_fields(&fields, Some(&request()), None).unwrap();
            let got: Vec<&str> = visible.names().collect();
            let expected: Vec<&str> = names.iter().map(String::as_str).collect();
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn prop_always_false_always_hidden(names in unique_names(), id in any::<i64>()) {
            let fields = FieldSet::from_fields(
                names.iter().map(|name| Field::attribute(name).permission(AllowNone)),
            )
            .unwrap();
            let instance = json!({"id": id});
            let visible = filter_fields(&fields, Some(&request()), Some(&instance)).unwrap();
            prop_assert!(visible.is_empty());
        }

        #[test]
        fn prop_always_true_always_visible(names in unique_names(), id in any::<i64>()) {
            let fields = FieldSet::from_fields(
                names.iter().map(|name| Field::attribute(name).permission(AllowAny)),
            )
            .unwrap();
            let instance = json!({"id": id});
            let visible = filter_fields(&fields, Some(&request()), Some(&instance)).unwrap();
            prop_assert_eq!(visible.len(), names.len());
        }
    }
}
