//! Sparse MIB tree nodes and the lookup / successor traversals.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::oid::Oid;
use crate::value::Value;

use super::plugin::{Plugin, ProducerContext};
use super::proxy::Proxy;
use super::BoxFuture;

/// One entry in a [`MibNode`]'s child map.
#[derive(Debug)]
pub enum Child {
    /// An interior subtree.
    Subtree(MibNode),
    /// A literal scalar value.
    Scalar(Value),
    /// A plugin owning the entire subtree below its mount point.
    Plugin(Plugin),
    /// A proxy owning the entire subtree below its mount point.
    Proxy(Proxy),
}

/// Result of an exact lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    /// The OID names a scalar with this value.
    Scalar(Value),
    /// The OID names an interior node, not a value.
    Subtree,
    /// Nothing exists at the OID.
    Absent,
}

/// Registration failure, internal to the tree walk.
///
/// The agent façade maps `TraversesPlugin` / `TraversesProxy` to the public
/// registration error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegisterError {
    Occupied,
    TraversesPlugin,
    TraversesProxy,
}

/// A sparse mapping from sub-identifier to child.
///
/// `BTreeMap` keys keep the children in ascending order, which is what makes
/// the lexicographic successor search cheap.
#[derive(Debug, Default)]
pub struct MibNode {
    children: BTreeMap<u32, Child>,
}

impl MibNode {
    /// Create an empty node.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the node has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// The child at `sub_id`, if any.
    pub fn get_child(&self, sub_id: u32) -> Option<&Child> {
        self.children.get(&sub_id)
    }

    /// Present sub-identifiers in ascending order.
    pub fn keys_ascending(&self) -> impl Iterator<Item = u32> + '_ {
        self.children.keys().copied()
    }

    /// Insert a child, failing if the slot is taken.
    pub(crate) fn set_child(&mut self, sub_id: u32, child: Child) -> Result<(), RegisterError> {
        match self.children.entry(sub_id) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(child);
                Ok(())
            }
            std::collections::btree_map::Entry::Occupied(_) => Err(RegisterError::Occupied),
        }
    }

    /// Insert built by shape coercion; coercion never produces duplicates
    /// from lists, and later map entries replace earlier ones.
    pub(crate) fn insert_coerced(&mut self, sub_id: u32, child: Child) {
        self.children.insert(sub_id, child);
    }

    /// Register a plugin or proxy leaf at `path`, creating empty subtrees
    /// along the prefix as needed.
    ///
    /// Fails when any ancestor is already a plugin, proxy or scalar, or when
    /// the target slot itself is occupied; plugins and proxies own their
    /// whole subtree and never nest.
    pub(crate) fn register(&mut self, path: &[u32], child: Child) -> Result<(), RegisterError> {
        match path {
            [] => Err(RegisterError::Occupied),
            [last] => self.set_child(*last, child),
            [head, rest @ ..] => {
                let slot = self
                    .children
                    .entry(*head)
                    .or_insert_with(|| Child::Subtree(MibNode::new()));
                match slot {
                    Child::Subtree(node) => node.register(rest, child),
                    Child::Plugin(_) => Err(RegisterError::TraversesPlugin),
                    Child::Proxy(_) => Err(RegisterError::TraversesProxy),
                    Child::Scalar(_) => Err(RegisterError::Occupied),
                }
            }
        }
    }

    /// Resolve `path` (arcs relative to this node) to a scalar, an interior
    /// node, or nothing.
    pub fn lookup<'a>(
        &'a self,
        path: &'a [u32],
        ctx: &'a ProducerContext,
    ) -> BoxFuture<'a, LookupResult> {
        Box::pin(async move {
            let Some((&head, rest)) = path.split_first() else {
                return LookupResult::Subtree;
            };
            match self.children.get(&head) {
                None => LookupResult::Absent,
                Some(child) => child.lookup(rest, ctx).await,
            }
        })
    }

    /// The path (relative to this node) of the smallest-OID scalar in the
    /// subtree, or `None` if the subtree holds no scalars at all.
    pub fn leftmost<'a>(&'a self, ctx: &'a ProducerContext) -> BoxFuture<'a, Option<Oid>> {
        Box::pin(async move {
            for (&key, child) in &self.children {
                if let Some(path) = child.leftmost(ctx).await {
                    return Some(prepend(key, &path));
                }
            }
            None
        })
    }

    /// The smallest OID strictly greater than `path` (relative to this node)
    /// that resolves to a scalar, or `None` when the subtree is exhausted.
    ///
    /// Descends into the exact-match child first so the deepest divergence
    /// wins, then scans strictly greater siblings in ascending order.
    pub fn successor<'a>(
        &'a self,
        path: &'a [u32],
        ctx: &'a ProducerContext,
    ) -> BoxFuture<'a, Option<Oid>> {
        Box::pin(async move {
            let Some((&head, rest)) = path.split_first() else {
                // Everything in this subtree is strictly greater than its root.
                return self.leftmost(ctx).await;
            };
            if let Some(child) = self.children.get(&head) {
                if let Some(found) = child.successor(rest, ctx).await {
                    return Some(prepend(head, &found));
                }
            }
            for (&key, child) in self
                .children
                .range((Bound::Excluded(head), Bound::Unbounded))
            {
                if let Some(path) = child.leftmost(ctx).await {
                    return Some(prepend(key, &path));
                }
            }
            None
        })
    }
}

impl Child {
    /// Exact lookup of `path` relative to this child.
    pub fn lookup<'a>(
        &'a self,
        path: &'a [u32],
        ctx: &'a ProducerContext,
    ) -> BoxFuture<'a, LookupResult> {
        Box::pin(async move {
            match self {
                Child::Subtree(node) => node.lookup(path, ctx).await,
                Child::Scalar(value) => {
                    if path.is_empty() {
                        LookupResult::Scalar(value.clone())
                    } else {
                        LookupResult::Absent
                    }
                }
                Child::Plugin(plugin) => match plugin.materialise(ctx) {
                    Some(view) => view.lookup(path, ctx).await,
                    None => LookupResult::Absent,
                },
                Child::Proxy(proxy) => proxy.lookup(path).await,
            }
        })
    }

    /// The relative path of the smallest-OID scalar within this child.
    ///
    /// An empty path means the child itself is the scalar.
    pub fn leftmost<'a>(&'a self, ctx: &'a ProducerContext) -> BoxFuture<'a, Option<Oid>> {
        Box::pin(async move {
            match self {
                Child::Subtree(node) => node.leftmost(ctx).await,
                Child::Scalar(_) => Some(Oid::empty()),
                Child::Plugin(plugin) => match plugin.materialise(ctx) {
                    Some(view) => view.leftmost(ctx).await,
                    None => None,
                },
                // A GetNext from the mount point finds the proxy's first
                // scalar strictly inside the subtree.
                Child::Proxy(proxy) => proxy.successor(&[]).await,
            }
        })
    }

    /// Lexicographic successor of `path` within this child.
    pub fn successor<'a>(
        &'a self,
        path: &'a [u32],
        ctx: &'a ProducerContext,
    ) -> BoxFuture<'a, Option<Oid>> {
        Box::pin(async move {
            match self {
                Child::Subtree(node) => node.successor(path, ctx).await,
                // Nothing sorts strictly after a scalar inside the scalar itself.
                Child::Scalar(_) => None,
                Child::Plugin(plugin) => match plugin.materialise(ctx) {
                    Some(view) => view.successor(path, ctx).await,
                    None => None,
                },
                Child::Proxy(proxy) => proxy.successor(path).await,
            }
        })
    }
}

fn prepend(key: u32, rest: &Oid) -> Oid {
    Oid::from_arcs(std::iter::once(key).chain(rest.arcs().iter().copied()))
}
