//! Small configuration structs shared by the parser core.
//!
//! Mirrors the `Options`-struct-per-subcommand convention used elsewhere in
//! this codebase, but as plain library configuration rather than CLI flags.

/// Flags passed to `regex::bytes::RegexBuilder` when compiling a
/// [`crate::vxp::Rhs::Regex`] right-hand side.
#[derive(Clone, Copy, Debug)]
pub struct RegexOptions {
    /// Compile the pattern case-insensitively.
    pub case_insensitive: bool,
    /// Cap on the compiled program's size, forwarded to
    /// `RegexBuilder::size_limit`. Guards against pathological patterns in
    /// untrusted queries.
    pub size_limit: usize,
}

impl Default for RegexOptions {
    fn default() -> Self {
        RegexOptions {
            case_insensitive: false,
            size_limit: 10 * (1 << 20),
        }
    }
}

/// A small bag of caller-chosen values copied verbatim into every [`crate::vxp::Vex`]
/// node built during a parse. The grammar itself never inspects these
/// fields; they exist so a downstream query-evaluation engine can carry
/// per-query context through the tree without a side channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct VexOptions {
    /// Whether tag names were matched case-insensitively during this parse.
    pub case_insensitive_tags: bool,
}

/// Configuration consumed by [`crate::vxp::parse`] for a single parse.
#[derive(Clone, Copy, Debug)]
pub struct ParserOptions<'a> {
    /// The finite set of known record tags a tag glob may expand against.
    pub tags: &'a [&'static str],
    /// Flags forwarded to the regex compiler for `~`/`!~` right-hand sides.
    pub regex: RegexOptions,
    /// Payload copied into every node built by this parse; see [`VexOptions`].
    pub vex_options: VexOptions,
}

impl<'a> ParserOptions<'a> {
    /// Builds options over the given tag table with default regex options
    /// and default (zeroed) vex options.
    pub fn new(tags: &'a [&'static str]) -> Self {
        ParserOptions {
            tags,
            regex: RegexOptions::default(),
            vex_options: VexOptions::default(),
        }
    }
}
