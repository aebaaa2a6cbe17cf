//! Object identifier type.
//!
//! An [`Oid`] is an immutable sequence of non-negative integer arcs. The MIB
//! tree is keyed by arbitrary arc values, so no X.660 arc-range validation is
//! applied; ordering is lexicographic arc-by-arc, with a strict prefix sorting
//! before any of its extensions.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::{Error, OidErrorKind, Result};

/// Inline capacity covers every OID in the standard MIB-2 tree.
type Arcs = SmallVec<[u32; 12]>;

/// An SNMP object identifier.
///
/// Immutable by construction: every transforming operation ([`concat`],
/// [`child`], [`suffix`], ...) returns a new `Oid`, so callers handing an
/// OID to a lookup can never observe it change.
///
/// The empty OID is a legal value; it renders as `""` and sorts before every
/// other OID, which makes it the natural seed for a full-tree walk.
///
/// [`concat`]: Oid::concat
/// [`child`]: Oid::child
/// [`suffix`]: Oid::suffix
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Oid {
    arcs: Arcs,
}

impl Oid {
    /// The empty OID.
    pub fn empty() -> Self {
        Self { arcs: Arcs::new() }
    }

    /// Build an OID from an iterator of arcs.
    pub fn from_arcs(arcs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            arcs: arcs.into_iter().collect(),
        }
    }

    /// Parse dotted notation (`"1.3.6.1.2.1"`).
    ///
    /// A single leading dot is accepted and ignored. The empty string parses
    /// to the empty OID. Any component that is not a base-10 `u32` fails with
    /// [`OidErrorKind::InvalidComponent`].
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.strip_prefix('.').unwrap_or(s);
        if s.is_empty() {
            return Ok(Self::empty());
        }
        let arcs: Arcs = s
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| Error::invalid_oid_with_input(OidErrorKind::InvalidComponent, s))
            })
            .collect::<Result<_>>()?;
        Ok(Self { arcs })
    }

    /// The arcs as a slice.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Whether this is the empty OID.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// The arc at position `i`, if any.
    pub fn get(&self, i: usize) -> Option<u32> {
        self.arcs.get(i).copied()
    }

    /// A new OID holding the first `n` arcs (all of them if `n` exceeds the
    /// length).
    pub fn prefix(&self, n: usize) -> Oid {
        Self::from_arcs(self.arcs.iter().take(n).copied())
    }

    /// A new OID holding the arcs from position `from` onward.
    pub fn suffix(&self, from: usize) -> Oid {
        Self::from_arcs(self.arcs.iter().skip(from).copied())
    }

    /// Concatenation: `self` followed by every arc of `other`.
    pub fn concat(&self, other: &Oid) -> Oid {
        self.concat_arcs(other.arcs())
    }

    /// Concatenation with a raw arc slice.
    pub fn concat_arcs(&self, tail: &[u32]) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.extend_from_slice(tail);
        Self { arcs }
    }

    /// A new OID with `arc` appended.
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        Self { arcs }
    }

    /// Whether `prefix` is a (non-strict) prefix of this OID.
    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.arcs.starts_with(&prefix.arcs)
    }

    /// The remainder after removing `prefix`, or `None` if `prefix` does not
    /// prefix this OID.
    pub fn strip_prefix(&self, prefix: &Oid) -> Option<Oid> {
        self.arcs
            .strip_prefix(prefix.arcs.as_slice())
            .map(Self::from_arcs_slice)
    }

    fn from_arcs_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Encode the OID content octets (X.690 §8.19).
    ///
    /// The first two arcs pack into one subidentifier. A single-arc OID is
    /// encoded as if followed by 0: BER cannot represent it exactly, and
    /// this is what deployed stacks do.
    pub fn to_ber(&self) -> SmallVec<[u8; 24]> {
        let mut out = SmallVec::new();
        if self.arcs.is_empty() {
            return out;
        }
        let first = u64::from(self.arcs[0]) * 40 + u64::from(self.arcs.get(1).copied().unwrap_or(0));
        push_subid(&mut out, first);
        for &arc in self.arcs.iter().skip(2) {
            push_subid(&mut out, u64::from(arc));
        }
        out
    }

    /// Decode OID content octets (the bytes inside an OBJECT IDENTIFIER TLV).
    pub fn from_ber(data: &[u8]) -> Result<Self> {
        let mut arcs = Arcs::new();
        let mut iter = data.iter().copied().peekable();
        let mut first = true;
        while iter.peek().is_some() {
            let mut subid: u64 = 0;
            loop {
                let byte = iter
                    .next()
                    .ok_or_else(|| Error::invalid_oid(OidErrorKind::TruncatedSubidentifier))?;
                subid = (subid << 7) | u64::from(byte & 0x7F);
                // The first subidentifier packs two arcs and may exceed
                // u32::MAX by the 80 bias; everything else must fit a u32.
                let cap = if first {
                    u64::from(u32::MAX) + 80
                } else {
                    u64::from(u32::MAX)
                };
                if subid > cap {
                    return Err(Error::invalid_oid(OidErrorKind::SubidentifierOverflow));
                }
                if byte & 0x80 == 0 {
                    break;
                }
            }
            if first {
                first = false;
                // Unpack the combined first subidentifier.
                let (a, b) = match subid {
                    0..=39 => (0, subid),
                    40..=79 => (1, subid - 40),
                    _ => (2, subid - 80),
                };
                arcs.push(a as u32);
                arcs.push(b as u32);
            } else {
                arcs.push(subid as u32);
            }
        }
        Ok(Self { arcs })
    }
}

/// Base-128 big-endian with continuation bits.
fn push_subid(out: &mut SmallVec<[u8; 24]>, subid: u64) {
    let mut chunks = SmallVec::<[u8; 10]>::new();
    let mut v = subid;
    loop {
        chunks.push((v & 0x7F) as u8);
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    while let Some(chunk) = chunks.pop() {
        if chunks.is_empty() {
            out.push(chunk);
        } else {
            out.push(chunk | 0x80);
        }
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut arcs = self.arcs.iter();
        if let Some(first) = arcs.next() {
            write!(f, "{first}")?;
            for arc in arcs {
                write!(f, ".{arc}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({self})")
    }
}

impl FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self::from_arcs_slice(arcs)
    }
}

impl<const N: usize> From<[u32; N]> for Oid {
    fn from(arcs: [u32; N]) -> Self {
        Self::from_arcs(arcs)
    }
}

/// Construct an [`Oid`] from literal arcs: `oid!(1, 3, 6, 1, 2, 1)`.
#[macro_export]
macro_rules! oid {
    ($($arc:expr),* $(,)?) => {
        $crate::oid::Oid::from_arcs([$($arc as u32),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_basic() {
        let oid = Oid::parse("1.3.6.1.2.1").unwrap();
        assert_eq!(oid.arcs(), &[1, 3, 6, 1, 2, 1]);
    }

    #[test]
    fn parse_leading_dot() {
        assert_eq!(Oid::parse(".1.3.6").unwrap(), oid!(1, 3, 6));
    }

    #[test]
    fn parse_empty_is_empty_oid() {
        let oid = Oid::parse("").unwrap();
        assert!(oid.is_empty());
        assert_eq!(oid.to_string(), "");
    }

    #[test]
    fn parse_rejects_junk() {
        for bad in ["1.x.3", "1..3", "-1.2", "1.2.", "4294967296"] {
            assert!(Oid::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn display_round_trip() {
        let oid = oid!(27068, 2, 2, 7);
        assert_eq!(oid.to_string(), "27068.2.2.7");
        assert_eq!(Oid::parse(&oid.to_string()).unwrap(), oid);
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = oid!(1, 3, 6, 1);
        let b = oid!(1, 3, 6, 1, 0);
        let c = oid!(1, 3, 6, 2);
        assert!(a < b, "strict prefix sorts first");
        assert!(b < c);
        assert!(Oid::empty() < a);
    }

    #[test]
    fn slicing_and_concat() {
        let oid = oid!(1, 3, 6, 1, 2, 1);
        assert_eq!(oid.prefix(3), oid!(1, 3, 6));
        assert_eq!(oid.suffix(3), oid!(1, 2, 1));
        assert_eq!(oid.prefix(3).concat(&oid.suffix(3)), oid);
        assert_eq!(oid.child(1), oid!(1, 3, 6, 1, 2, 1, 1));
        // The original is untouched.
        assert_eq!(oid, oid!(1, 3, 6, 1, 2, 1));
    }

    #[test]
    fn prefix_relations() {
        let base = oid!(1, 2, 3);
        let deep = oid!(1, 2, 3, 4, 5);
        assert!(deep.starts_with(&base));
        assert!(!base.starts_with(&deep));
        assert_eq!(deep.strip_prefix(&base), Some(oid!(4, 5)));
        assert_eq!(base.strip_prefix(&deep), None);
        assert!(deep.starts_with(&Oid::empty()));
    }

    #[test]
    fn ber_round_trip() {
        for oid in [
            oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
            oid!(0, 0),
            oid!(2, 999, 3),
            oid!(1, 3, 6, 1, 4, 1, 4294967295u32),
        ] {
            let ber = oid.to_ber();
            assert_eq!(Oid::from_ber(&ber).unwrap(), oid);
        }
    }

    #[test]
    fn ber_multibyte_subid() {
        // 1.3.6.1.4.1.2680.1 -> 2680 = 0x94 0x78
        let oid = oid!(1, 3, 6, 1, 4, 1, 2680, 1);
        let ber = oid.to_ber();
        assert_eq!(&ber[..], &[0x2B, 0x06, 0x01, 0x04, 0x01, 0x94, 0x78, 0x01]);
    }

    #[test]
    fn ber_truncated_subid() {
        assert!(Oid::from_ber(&[0x2B, 0x86]).is_err());
    }

    proptest! {
        #[test]
        fn prop_parse_display_round_trip(arcs in proptest::collection::vec(any::<u32>(), 0..20)) {
            let oid = Oid::from_arcs(arcs.iter().copied());
            let rendered = oid.to_string();
            prop_assert_eq!(Oid::parse(&rendered).unwrap(), oid);
        }

        #[test]
        fn prop_order_matches_arc_slices(
            a in proptest::collection::vec(0u32..10, 0..6),
            b in proptest::collection::vec(0u32..10, 0..6),
        ) {
            let oa = Oid::from_arcs(a.iter().copied());
            let ob = Oid::from_arcs(b.iter().copied());
            prop_assert_eq!(oa.cmp(&ob), a.cmp(&b));
        }

        #[test]
        fn prop_ber_round_trip(mut arcs in proptest::collection::vec(any::<u32>(), 2..16)) {
            // First two arcs must fit the combined-subidentifier packing.
            arcs[0] %= 3;
            if arcs[0] < 2 {
                arcs[1] %= 40;
            }
            let oid = Oid::from_arcs(arcs.iter().copied());
            prop_assert_eq!(Oid::from_ber(&oid.to_ber()).unwrap(), oid);
        }
    }
}
