//! The parsed query abstract syntax tree.

use crate::config::VexOptions;

use super::lhs::Lhs;
use super::rhs::Rhs;
use super::token::Token;

/// One node of a parsed query tree.
///
/// Internal nodes (`And`, `Or`, `Not`) leave `lhs`/`rhs` unset and use `a`
/// (and, for `And`/`Or`, `b`) for their operands. Leaf comparison nodes set
/// `lhs` and, unless the operator is a bare tag presence (`Token::True`),
/// `rhs` as well.
///
/// Ownership is ordinary Rust tree ownership: dropping the root recursively
/// drops every child, `lhs`, and `rhs`. There is no analogue of the
/// original's manual free routine to get wrong.
#[derive(Debug, Clone)]
pub struct Vex {
    pub op: Token,
    pub a: Option<Box<Vex>>,
    pub b: Option<Box<Vex>>,
    pub lhs: Option<Box<Lhs>>,
    pub rhs: Option<Box<Rhs>>,
    pub options: VexOptions,
}

impl Vex {
    pub(crate) fn leaf(op: Token, lhs: Lhs, rhs: Option<Rhs>, options: VexOptions) -> Self {
        Vex {
            op,
            a: None,
            b: None,
            lhs: Some(Box::new(lhs)),
            rhs: rhs.map(Box::new),
            options,
        }
    }

    pub(crate) fn unary(op: Token, a: Vex, options: VexOptions) -> Self {
        Vex {
            op,
            a: Some(Box::new(a)),
            b: None,
            lhs: None,
            rhs: None,
            options,
        }
    }

    pub(crate) fn binary(op: Token, a: Vex, b: Vex, options: VexOptions) -> Self {
        Vex {
            op,
            a: Some(Box::new(a)),
            b: Some(Box::new(b)),
            lhs: None,
            rhs: None,
            options,
        }
    }
}

#[cfg(feature = "debug-print")]
impl Vex {
    /// Dumps an indented representation of this tree via `tracing::debug!`.
    ///
    /// Intended for interactively inspecting a parsed query; not part of
    /// the library's stable data model.
    pub fn print_tree(&self) {
        self.print_at(0);
    }

    fn print_at(&self, depth: usize) {
        let pad = "  ".repeat(depth);
        if let Some(lhs) = &self.lhs {
            let tags: Vec<usize> = lhs.tag_indices().collect();
            tracing::debug!(
                "{pad}{:?} lhs=(level={:?}, tags={:?}, prefix={:?}, field={:?}) rhs={:?}",
                self.op.kind,
                lhs.level(),
                tags,
                lhs.prefix(),
                lhs.field(),
                self.rhs,
            );
        } else {
            tracing::debug!("{pad}{:?}", self.op.kind);
        }
        if let Some(a) = &self.a {
            a.print_at(depth + 1);
        }
        if let Some(b) = &self.b {
            b.print_at(depth + 1);
        }
    }
}
