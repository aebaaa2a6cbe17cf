//! Plugin producers, shape coercion and result caching.
//!
//! A plugin is a user-supplied closure mounted at a base OID. On every
//! materialisation it may return a different arbitrarily-nested shape:
//! a scalar, an ordered sequence, a sparse integer-keyed mapping, or any mix
//! of those. The shape is coerced once into the same node type the rest of the
//! tree walks. A top-level mapping may carry a `cache` hint asking the agent
//! to reuse the result for a number of seconds.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::warn;

use crate::value::Value;

use super::node::{Child, MibNode};

/// Error type producers may fail with.
pub type ProducerError = Box<dyn std::error::Error + Send + Sync>;

type ProducerFn =
    dyn Fn(&ProducerContext) -> Result<PluginValue, ProducerError> + Send + Sync + 'static;

/// Per-request information handed to producers.
#[derive(Debug, Clone)]
pub struct ProducerContext {
    community: Bytes,
}

impl ProducerContext {
    /// Context for a request authenticated with `community`.
    pub fn new(community: Bytes) -> Self {
        Self { community }
    }

    /// The community string of the request being served.
    pub fn community(&self) -> &Bytes {
        &self.community
    }

    /// Context for traversals not driven by a request.
    pub(crate) fn internal() -> Self {
        Self {
            community: Bytes::new(),
        }
    }
}

/// A key in a producer-returned mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapKey {
    /// A sub-identifier.
    Sub(u32),
    /// The `cache` hint, consumed before coercion.
    Cache,
    /// Any other key; rejected by coercion as a bad shape.
    Named(String),
}

impl From<u32> for MapKey {
    fn from(sub: u32) -> Self {
        MapKey::Sub(sub)
    }
}

/// What a producer may return.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginValue {
    /// An already-typed SNMP value, passed through untouched.
    Typed(Value),
    /// A plain integer, typed as INTEGER when it fits.
    Int(i64),
    /// Text, typed as OCTET STRING.
    Str(String),
    /// An ordered sequence; index i becomes sub-identifier i.
    List(Vec<PluginValue>),
    /// A sparse mapping from sub-identifier to nested value.
    Map(Vec<(MapKey, PluginValue)>),
    /// Nothing; the corresponding slot is absent.
    Nil,
}

impl PluginValue {
    /// Convenience constructor for integer-keyed mappings.
    pub fn map(entries: impl IntoIterator<Item = (u32, PluginValue)>) -> Self {
        PluginValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (MapKey::Sub(k), v))
                .collect(),
        )
    }

    /// Convenience constructor for a mapping carrying a `cache` hint.
    pub fn cached(ttl_secs: u64, entries: impl IntoIterator<Item = (u32, PluginValue)>) -> Self {
        let mut out: Vec<(MapKey, PluginValue)> =
            vec![(MapKey::Cache, PluginValue::Int(ttl_secs as i64))];
        out.extend(entries.into_iter().map(|(k, v)| (MapKey::Sub(k), v)));
        PluginValue::Map(out)
    }
}

impl From<Value> for PluginValue {
    fn from(value: Value) -> Self {
        PluginValue::Typed(value)
    }
}

impl From<i64> for PluginValue {
    fn from(v: i64) -> Self {
        PluginValue::Int(v)
    }
}

impl From<i32> for PluginValue {
    fn from(v: i32) -> Self {
        PluginValue::Int(v.into())
    }
}

impl From<&str> for PluginValue {
    fn from(s: &str) -> Self {
        PluginValue::Str(s.to_owned())
    }
}

impl From<String> for PluginValue {
    fn from(s: String) -> Self {
        PluginValue::Str(s)
    }
}

impl<T: Into<PluginValue>> From<Vec<T>> for PluginValue {
    fn from(items: Vec<T>) -> Self {
        PluginValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// A mapping key that is neither a sub-identifier nor `cache`.
#[derive(Debug)]
pub(crate) struct BadShape {
    pub key: String,
}

/// Coerce a producer value into a tree view.
///
/// `Ok(None)` means the slot is absent (`Nil`, or a top-level nil return).
/// Coercion is shallow-by-reference for typed values: nested [`Value`]s move
/// into the view without re-encoding.
pub(crate) fn coerce(value: PluginValue) -> Result<Option<Child>, BadShape> {
    match value {
        PluginValue::Typed(v) => Ok(Some(Child::Scalar(v))),
        PluginValue::Int(i) => Ok(Some(Child::Scalar(int_value(i)))),
        PluginValue::Str(s) => Ok(Some(Child::Scalar(Value::from(s)))),
        PluginValue::Nil => Ok(None),
        PluginValue::List(items) => {
            let mut node = MibNode::new();
            for (i, item) in items.into_iter().enumerate() {
                if let Some(child) = coerce(item)? {
                    node.insert_coerced(i as u32, child);
                }
            }
            Ok(Some(Child::Subtree(node)))
        }
        PluginValue::Map(entries) => {
            let mut node = MibNode::new();
            for (key, item) in entries {
                let sub = match key {
                    MapKey::Sub(sub) => sub,
                    MapKey::Cache => {
                        // Below top level nothing consumes the hint.
                        return Err(BadShape {
                            key: "cache".to_owned(),
                        });
                    }
                    MapKey::Named(name) => return Err(BadShape { key: name }),
                };
                if let Some(child) = coerce(item)? {
                    node.insert_coerced(sub, child);
                }
            }
            Ok(Some(Child::Subtree(node)))
        }
    }
}

/// Integers that fit INTEGER stay integers; anything wider falls back to the
/// textual rendering.
fn int_value(i: i64) -> Value {
    match i32::try_from(i) {
        Ok(v) => Value::Integer(v),
        Err(_) => Value::string(i.to_string()),
    }
}

/// Pull the `cache` hint off a top-level mapping.
///
/// Returns the TTL (if a usable one was present) and the remaining payload.
fn extract_cache_hint(value: PluginValue) -> (Option<Duration>, PluginValue) {
    let PluginValue::Map(entries) = value else {
        return (None, value);
    };
    let mut ttl = None;
    let mut rest = Vec::with_capacity(entries.len());
    for (key, item) in entries {
        if key == MapKey::Cache {
            match item {
                PluginValue::Int(secs) if secs >= 0 => {
                    ttl = Some(Duration::from_secs(secs as u64));
                }
                PluginValue::Typed(Value::Integer(secs)) if secs >= 0 => {
                    ttl = Some(Duration::from_secs(secs as u64));
                }
                other => {
                    warn!(hint = ?other, "ignoring unusable cache hint");
                }
            }
        } else {
            rest.push((key, item));
        }
    }
    (ttl, PluginValue::Map(rest))
}

/// A producer mounted in the tree, with its cached last result.
///
/// The cache holds a single reference to the last materialised view and the
/// instant it expires; materialisation is serialised by the mutex so the
/// producer runs at most once per cache miss.
pub struct Plugin {
    producer: Box<ProducerFn>,
    cache: Mutex<Option<(Arc<Child>, Instant)>>,
}

impl Plugin {
    /// Wrap a producer closure.
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn(&ProducerContext) -> Result<PluginValue, ProducerError> + Send + Sync + 'static,
    {
        Self {
            producer: Box::new(producer),
            cache: Mutex::new(None),
        }
    }

    /// A plugin returning the same value on every invocation.
    pub fn constant(value: impl Into<PluginValue>) -> Self {
        let value = value.into();
        Self::new(move |_| Ok(value.clone()))
    }

    /// Produce the current tree view.
    ///
    /// Returns the cached view while it is fresh; otherwise invokes the
    /// producer. A failing producer or an ill-shaped result materialises as
    /// absent (`None`) with a warning logged; the request proceeds.
    /// Results without a `cache` hint are not retained beyond this call.
    pub fn materialise(&self, ctx: &ProducerContext) -> Option<Arc<Child>> {
        let mut slot = self
            .cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some((view, expires_at)) = slot.as_ref() {
            if Instant::now() < *expires_at {
                return Some(view.clone());
            }
        }
        *slot = None;
        let produced = match (self.producer)(ctx) {
            Ok(value) => value,
            Err(error) => {
                warn!(%error, "plugin producer failed");
                return None;
            }
        };
        let (ttl, payload) = extract_cache_hint(produced);
        let view = match coerce(payload) {
            Ok(Some(child)) => Arc::new(child),
            Ok(None) => return None,
            Err(bad) => {
                warn!(key = %bad.key, "plugin returned a mapping with a non-integer key");
                return None;
            }
        };
        if let Some(expiry) = ttl.and_then(|ttl| Instant::now().checked_add(ttl)) {
            *slot = Some((view.clone(), expiry));
        }
        Some(view)
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self
            .cache
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false);
        f.debug_struct("Plugin").field("cached", &cached).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mib::LookupResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx() -> ProducerContext {
        ProducerContext::internal()
    }

    fn lookup_now(view: &Child, path: &[u32]) -> LookupResult {
        futures::executor::block_on(view.lookup(path, &ctx()))
    }

    #[test]
    fn scalar_coerces_to_scalar_leaf() {
        let view = coerce(PluginValue::Int(42)).unwrap().unwrap();
        assert!(matches!(view, Child::Scalar(Value::Integer(42))));
        let view = coerce(PluginValue::from("hi")).unwrap().unwrap();
        assert_eq!(lookup_now(&view, &[]), LookupResult::Scalar(Value::string("hi")));
    }

    #[test]
    fn typed_values_pass_through() {
        let view = coerce(PluginValue::Typed(Value::TimeTicks(99)))
            .unwrap()
            .unwrap();
        assert!(matches!(view, Child::Scalar(Value::TimeTicks(99))));
    }

    #[test]
    fn list_indexes_from_zero() {
        let view = coerce(PluginValue::from(vec![1, 1, 2])).unwrap().unwrap();
        assert_eq!(lookup_now(&view, &[0]), LookupResult::Scalar(Value::Integer(1)));
        assert_eq!(lookup_now(&view, &[2]), LookupResult::Scalar(Value::Integer(2)));
        assert_eq!(lookup_now(&view, &[3]), LookupResult::Absent);
    }

    #[test]
    fn nil_slots_are_absent() {
        let view = coerce(PluginValue::List(vec![
            PluginValue::Int(1),
            PluginValue::Nil,
            PluginValue::Int(3),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(lookup_now(&view, &[0]), LookupResult::Scalar(Value::Integer(1)));
        assert_eq!(lookup_now(&view, &[1]), LookupResult::Absent);
        assert_eq!(lookup_now(&view, &[2]), LookupResult::Scalar(Value::Integer(3)));
    }

    #[test]
    fn empty_shapes_are_empty_subtrees() {
        let view = coerce(PluginValue::List(vec![])).unwrap().unwrap();
        assert_eq!(lookup_now(&view, &[]), LookupResult::Subtree);
        assert_eq!(lookup_now(&view, &[0]), LookupResult::Absent);
        let Child::Subtree(node) = coerce(PluginValue::map([])).unwrap().unwrap() else {
            panic!("expected subtree");
        };
        assert!(node.is_empty());
    }

    #[test]
    fn nested_shapes() {
        let view = coerce(PluginValue::map([
            (0, PluginValue::from(vec![1, 2, 3])),
            (1, PluginValue::List(vec![])),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(lookup_now(&view, &[0, 2]), LookupResult::Scalar(Value::Integer(3)));
        assert_eq!(lookup_now(&view, &[1]), LookupResult::Subtree);
        assert_eq!(lookup_now(&view, &[1, 0]), LookupResult::Absent);
    }

    #[test]
    fn named_key_is_bad_shape() {
        let result = coerce(PluginValue::Map(vec![(
            MapKey::Named("name".to_owned()),
            PluginValue::Int(1),
        )]));
        assert!(result.is_err());
        // Nested too.
        let result = coerce(PluginValue::map([(
            0,
            PluginValue::Map(vec![(MapKey::Named("x".into()), PluginValue::Int(1))]),
        )]));
        assert!(result.is_err());
    }

    #[test]
    fn wide_integer_falls_back_to_text() {
        let view = coerce(PluginValue::Int(i64::MAX)).unwrap().unwrap();
        assert_eq!(
            lookup_now(&view, &[]),
            LookupResult::Scalar(Value::string(i64::MAX.to_string()))
        );
    }

    #[test]
    fn first_call_always_materialises() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let plugin = Plugin::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(PluginValue::Int(1))
        });
        assert!(plugin.materialise(&ctx()).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn uncached_result_reinvokes_every_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let plugin = Plugin::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(PluginValue::map([(0, PluginValue::Int(1))]))
        });
        plugin.materialise(&ctx());
        plugin.materialise(&ctx());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cache_hint_pins_result_for_window() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let plugin = Plugin::new(move |_| {
            let n = seen.fetch_add(1, Ordering::SeqCst);
            Ok(PluginValue::cached(3600, [(0, PluginValue::Int(n as i64))]))
        });
        let first = plugin.materialise(&ctx()).unwrap();
        let second = plugin.materialise(&ctx()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // Same reference, not a re-coerced copy.
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(lookup_now(&first, &[0]), LookupResult::Scalar(Value::Integer(0)));
    }

    #[test]
    fn cache_key_is_not_part_of_the_payload() {
        let plugin = Plugin::new(|_| Ok(PluginValue::cached(60, [(2, PluginValue::Int(5))])));
        let view = plugin.materialise(&ctx()).unwrap();
        assert_eq!(lookup_now(&view, &[2]), LookupResult::Scalar(Value::Integer(5)));
        // No other children leaked out of the hint.
        let Child::Subtree(node) = &*view else {
            panic!("expected subtree");
        };
        assert_eq!(node.keys_ascending().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn failing_producer_is_absent_and_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let plugin = Plugin::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Err("backend unavailable".into())
        });
        assert!(plugin.materialise(&ctx()).is_none());
        assert!(plugin.materialise(&ctx()).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn bad_shape_is_absent() {
        let plugin = Plugin::new(|_| {
            Ok(PluginValue::Map(vec![(
                MapKey::Named("oops".into()),
                PluginValue::Int(1),
            )]))
        });
        assert!(plugin.materialise(&ctx()).is_none());
    }

    #[test]
    fn nil_return_is_absent() {
        let plugin = Plugin::new(|_| Ok(PluginValue::Nil));
        assert!(plugin.materialise(&ctx()).is_none());
    }

    #[tokio::test]
    async fn producer_sees_request_community() {
        let plugin = Plugin::new(|ctx: &ProducerContext| {
            Ok(PluginValue::Str(
                String::from_utf8_lossy(ctx.community()).into_owned(),
            ))
        });
        let ctx = ProducerContext::new(Bytes::from_static(b"public"));
        let view = plugin.materialise(&ctx).unwrap();
        assert_eq!(
            view.lookup(&[], &ctx).await,
            LookupResult::Scalar(Value::string("public"))
        );
    }
}
