//! The left-hand side of a comparison node: tag selector, transaction-level
//! qualifier, record prefix, and field index.

use std::num::NonZeroU32;

use fixedbitset::FixedBitSet;

/// How a transaction-level qualifier (`{N}`, `{N+}`, `{N-}`) constrains the
/// level a record must appear at.
///
/// Corresponds to the original's `-1`/`0`/`+1` encoding; any downstream
/// query-evaluation engine consuming this AST must agree with this mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelMatch {
    /// `{N-}` — record level must be at most `N`.
    AtMost,
    /// `{N}` — record level must be exactly `N`.
    Exact,
    /// `{N+}` — record level must be at least `N`.
    AtLeast,
}

/// A parsed left-hand side.
///
/// `vxid_count` and `taglist_count` are parse-time bookkeeping for the
/// VXID mutual-exclusion check (§4.3); they are not part of the meaningful
/// post-parse surface other than through [`Lhs::is_vxid`].
#[derive(Debug, Clone)]
pub struct Lhs {
    tags: FixedBitSet,
    level: Option<u32>,
    level_match: LevelMatch,
    prefix: Option<Vec<u8>>,
    field: Option<NonZeroU32>,
    vxid_count: u32,
    taglist_count: u32,
}

impl Lhs {
    pub(crate) fn empty(tag_universe: usize) -> Self {
        Lhs {
            tags: FixedBitSet::with_capacity(tag_universe),
            level: None,
            level_match: LevelMatch::Exact,
            prefix: None,
            field: None,
            vxid_count: 0,
            taglist_count: 0,
        }
    }

    pub(crate) fn mark_vxid(&mut self) {
        self.vxid_count += 1;
    }

    pub(crate) fn add_tag(&mut self, index: usize) {
        self.tags.insert(index);
        self.taglist_count += 1;
    }

    pub(crate) fn union_tags(&mut self, other: &FixedBitSet) {
        self.tags.union_with(other);
        self.taglist_count += 1;
    }

    pub(crate) fn set_level(&mut self, level: u32, level_match: LevelMatch) {
        self.level = Some(level);
        self.level_match = level_match;
    }

    pub(crate) fn set_prefix(&mut self, prefix: Vec<u8>) {
        self.prefix = Some(prefix);
    }

    pub(crate) fn set_field(&mut self, field: NonZeroU32) {
        self.field = Some(field);
    }

    pub(crate) fn vxid_count(&self) -> u32 {
        self.vxid_count
    }

    pub(crate) fn taglist_count(&self) -> u32 {
        self.taglist_count
    }

    /// Whether this LHS has the VXID (transaction-id) selector set.
    pub fn is_vxid(&self) -> bool {
        self.vxid_count > 0
    }

    /// Whether the tag at `index` into the parser's tag table is selected.
    pub fn has_tag(&self, index: usize) -> bool {
        self.tags.contains(index)
    }

    /// Iterates the indices of every selected tag, in ascending order.
    pub fn tag_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.tags.ones()
    }

    pub fn level(&self) -> Option<u32> {
        self.level
    }

    pub fn level_match(&self) -> LevelMatch {
        self.level_match
    }

    pub fn prefix(&self) -> Option<&[u8]> {
        self.prefix.as_deref()
    }

    pub fn field(&self) -> Option<NonZeroU32> {
        self.field
    }
}
