//! Property-name rewriting.
//!
//! Captured property names become storage keys and, later, segments of dotted
//! paths. A name containing the separator, the delegation literal itself, or
//! the empty name would make a path ambiguous, so names pass through a
//! [`NameRewriter`] before they are stored.
//!
//! [`EscapingRewriter`] uses percent escapes:
//! - `%` becomes `%25` and `.` becomes `%2E`
//! - the delegation literal `__proto__` becomes `%5F_proto__`
//! - the empty name becomes `%`
//!
//! The mapping is injective, and no rewritten key contains `.`.

use std::borrow::Cow;

/// Path segment that follows a delegation link instead of a property.
pub const PROTO_SEGMENT: &str = "__proto__";

/// Maps a property name to a collision-safe storage key.
pub trait NameRewriter {
    /// Rewrite a name. Must be pure and injective.
    fn rewrite<'a>(&self, name: &'a str) -> Cow<'a, str>;
}

/// Default percent-escaping rewriter.
#[derive(Clone, Copy, Debug, Default)]
pub struct EscapingRewriter;

impl NameRewriter for EscapingRewriter {
    fn rewrite<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if name.is_empty() {
            return Cow::Borrowed("%");
        }
        if name == PROTO_SEGMENT {
            return Cow::Borrowed("%5F_proto__");
        }
        if !name.contains(&['%', '.'][..]) {
            return Cow::Borrowed(name);
        }
        let mut out = String::with_capacity(name.len() + 4);
        for ch in name.chars() {
            match ch {
                '%' => out.push_str("%25"),
                '.' => out.push_str("%2E"),
                other => out.push(other),
            }
        }
        Cow::Owned(out)
    }
}
