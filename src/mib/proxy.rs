//! Proxy leaves: delegation of a subtree to a remote agent.

use std::sync::Arc;

use tracing::warn;

use crate::error::{Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::value::Value;
use crate::varbind::VarBind;

use super::BoxFuture;
use super::node::LookupResult;

/// The narrow manager-side contract proxies consume.
///
/// The crate's own [`Client`](crate::client::Client) implements this over a
/// real transport; tests substitute in-memory implementations.
pub trait ManagerClient: Send + Sync {
    /// Issue a GetRequest for the given OIDs.
    fn get<'a>(&'a self, oids: &'a [Oid]) -> BoxFuture<'a, Result<Vec<VarBind>>>;

    /// Issue a GetNextRequest for the given OIDs.
    fn get_next<'a>(&'a self, oids: &'a [Oid]) -> BoxFuture<'a, Result<Vec<VarBind>>>;
}

/// A delegation of the subtree below `base` to an upstream agent.
///
/// Opaque to the tree walk except through [`lookup`](Proxy::lookup) and
/// [`successor`](Proxy::successor). Upstream failures never escape: they
/// surface as absent / end-of-view so one dead upstream cannot take down
/// the serving loop.
pub struct Proxy {
    base: Oid,
    client: Arc<dyn ManagerClient>,
}

impl Proxy {
    /// Create a proxy rooted at `base`.
    pub fn new(base: Oid, client: Arc<dyn ManagerClient>) -> Self {
        Self { base, client }
    }

    /// The subtree root this proxy owns.
    pub fn base(&self) -> &Oid {
        &self.base
    }

    /// Exact lookup: forwards `base ++ remainder` upstream as a Get.
    pub(crate) async fn lookup(&self, remainder: &[u32]) -> LookupResult {
        let target = self.base.concat_arcs(remainder);
        match self.client.get(std::slice::from_ref(&target)).await {
            Ok(varbinds) => match varbinds.into_iter().next() {
                Some(vb) if !vb.value.is_exception() && vb.value != Value::Null => {
                    LookupResult::Scalar(vb.value)
                }
                _ => LookupResult::Absent,
            },
            Err(error) => {
                warn!(%target, %error, "proxy upstream get failed");
                LookupResult::Absent
            }
        }
    }

    /// Successor: forwards `base ++ remainder` upstream as a GetNext.
    ///
    /// Returns the answer relative to `base`, or `None` for end of view.
    /// An upstream answer outside the base subtree would break the walk's
    /// ordering invariant and is treated as end of view.
    pub(crate) async fn successor(&self, remainder: &[u32]) -> Option<Oid> {
        let from = self.base.concat_arcs(remainder);
        match self.client.get_next(std::slice::from_ref(&from)).await {
            Ok(varbinds) => {
                let vb = varbinds.into_iter().next()?;
                if vb.value == Value::EndOfMibView {
                    return None;
                }
                vb.name.strip_prefix(&self.base)
            }
            // v1 upstreams signal end of view as a noSuchName error.
            Err(Error::Snmp {
                status: ErrorStatus::NoSuchName,
                ..
            }) => None,
            Err(error) => {
                warn!(%from, %error, "proxy upstream get-next failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy").field("base", &self.base).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use std::time::Duration;

    /// Upstream serving a fixed OID table, end-of-view past the last entry.
    struct TableUpstream {
        entries: Vec<(Oid, Value)>,
    }

    impl ManagerClient for TableUpstream {
        fn get<'a>(&'a self, oids: &'a [Oid]) -> BoxFuture<'a, Result<Vec<VarBind>>> {
            Box::pin(async move {
                Ok(oids
                    .iter()
                    .map(|oid| {
                        self.entries
                            .iter()
                            .find(|(o, _)| o == oid)
                            .map(|(o, v)| VarBind::new(o.clone(), v.clone()))
                            .unwrap_or_else(|| VarBind::new(oid.clone(), Value::NoSuchObject))
                    })
                    .collect())
            })
        }

        fn get_next<'a>(&'a self, oids: &'a [Oid]) -> BoxFuture<'a, Result<Vec<VarBind>>> {
            Box::pin(async move {
                Ok(oids
                    .iter()
                    .map(|oid| {
                        self.entries
                            .iter()
                            .find(|(o, _)| o > oid)
                            .map(|(o, v)| VarBind::new(o.clone(), v.clone()))
                            .unwrap_or_else(|| VarBind::new(oid.clone(), Value::EndOfMibView))
                    })
                    .collect())
            })
        }
    }

    /// Upstream that always times out.
    struct DeadUpstream;

    impl ManagerClient for DeadUpstream {
        fn get<'a>(&'a self, _oids: &'a [Oid]) -> BoxFuture<'a, Result<Vec<VarBind>>> {
            Box::pin(async {
                Err(Error::Timeout {
                    target: None,
                    elapsed: Duration::from_secs(5),
                    request_id: 1,
                    retries: 3,
                })
            })
        }

        fn get_next<'a>(&'a self, _oids: &'a [Oid]) -> BoxFuture<'a, Result<Vec<VarBind>>> {
            Box::pin(async {
                Err(Error::Timeout {
                    target: None,
                    elapsed: Duration::from_secs(5),
                    request_id: 1,
                    retries: 3,
                })
            })
        }
    }

    fn table_proxy() -> Proxy {
        let upstream = TableUpstream {
            entries: vec![
                (oid!(1, 3, 6, 1, 1), Value::Integer(11)),
                (oid!(1, 3, 6, 1, 2), Value::Integer(12)),
                (oid!(1, 3, 6, 2), Value::Integer(20)),
            ],
        };
        Proxy::new(oid!(1, 3, 6), Arc::new(upstream))
    }

    #[tokio::test]
    async fn lookup_prefixes_base() {
        let proxy = table_proxy();
        assert_eq!(
            proxy.lookup(&[1, 1]).await,
            LookupResult::Scalar(Value::Integer(11))
        );
        assert_eq!(proxy.lookup(&[9]).await, LookupResult::Absent);
    }

    #[tokio::test]
    async fn successor_strips_base() {
        let proxy = table_proxy();
        assert_eq!(proxy.successor(&[]).await, Some(oid!(1, 1)));
        assert_eq!(proxy.successor(&[1, 1]).await, Some(oid!(1, 2)));
        assert_eq!(proxy.successor(&[1, 2]).await, Some(oid!(2)));
        assert_eq!(proxy.successor(&[2]).await, None);
    }

    #[tokio::test]
    async fn out_of_subtree_answer_is_end_of_view() {
        // Base deeper than anything the upstream serves: every answer is
        // outside the subtree.
        let upstream = TableUpstream {
            entries: vec![(oid!(9, 9), Value::Integer(1))],
        };
        let proxy = Proxy::new(oid!(1, 3, 6), Arc::new(upstream));
        assert_eq!(proxy.successor(&[]).await, None);
    }

    #[tokio::test]
    async fn upstream_failure_is_absent_and_end_of_view() {
        let proxy = Proxy::new(oid!(1, 3, 6), Arc::new(DeadUpstream));
        assert_eq!(proxy.lookup(&[1]).await, LookupResult::Absent);
        assert_eq!(proxy.successor(&[1]).await, None);
    }

    #[tokio::test]
    async fn v1_no_such_name_is_end_of_view() {
        struct NoSuchNameUpstream;
        impl ManagerClient for NoSuchNameUpstream {
            fn get<'a>(&'a self, _oids: &'a [Oid]) -> BoxFuture<'a, Result<Vec<VarBind>>> {
                Box::pin(async {
                    Err(Error::Snmp {
                        target: None,
                        status: ErrorStatus::NoSuchName,
                        index: 1,
                    })
                })
            }
            fn get_next<'a>(&'a self, _oids: &'a [Oid]) -> BoxFuture<'a, Result<Vec<VarBind>>> {
                Box::pin(async {
                    Err(Error::Snmp {
                        target: None,
                        status: ErrorStatus::NoSuchName,
                        index: 1,
                    })
                })
            }
        }
        let proxy = Proxy::new(oid!(1, 3, 6), Arc::new(NoSuchNameUpstream));
        assert_eq!(proxy.successor(&[5]).await, None);
        assert_eq!(proxy.lookup(&[5]).await, LookupResult::Absent);
    }
}
