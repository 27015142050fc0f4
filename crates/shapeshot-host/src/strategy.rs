//! Property-name enumeration strategies.
//!
//! The capture engine asks a strategy for the names to record on each
//! object. [`OwnPropertyNames`] is the default. Overrides select themselves
//! through [`EnumerationStrategy::applies_to`], so an environment-specific
//! quirk is expressed as one more strategy instead of a different graph type.

use std::collections::HashSet;

use tracing::debug;

use crate::object::HostObject;

/// Lists the property names to capture for an object.
pub trait EnumerationStrategy {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Returns `true` if this strategy should handle `obj`.
    fn applies_to(&self, obj: &dyn HostObject) -> bool;

    /// The names to capture, without duplicates, in capture order.
    fn property_names(&self, obj: &dyn HostObject) -> Vec<String>;
}

/// Default strategy: exactly the host's own property names.
#[derive(Clone, Copy, Debug, Default)]
pub struct OwnPropertyNames;

impl EnumerationStrategy for OwnPropertyNames {
    fn name(&self) -> &str {
        "own-property-names"
    }

    fn applies_to(&self, _obj: &dyn HostObject) -> bool {
        true
    }

    fn property_names(&self, obj: &dyn HostObject) -> Vec<String> {
        let mut seen = HashSet::new();
        obj.own_property_names()
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }
}

/// Synthesizes vendor-prefixed aliases of listed names.
///
/// Some hosts expose `webkitTransform`-style duplicates of standard accessor
/// names that a plain own-name listing never reports. For every listed name
/// `n` and prefix `p`, the alias `p` + `N` (first letter upper-cased) is
/// probed with a read. A defined value is evidence of the alias; so is a
/// failed read, since a throwing getter still means the property exists.
#[derive(Clone, Debug)]
pub struct VendorAliasStrategy {
    class_names: Vec<String>,
    prefixes: Vec<String>,
}

impl VendorAliasStrategy {
    /// Default vendor prefixes.
    pub const DEFAULT_PREFIXES: [&'static str; 3] = ["webkit", "moz", "ms"];

    /// A strategy for objects whose class name is one of `class_names`.
    pub fn new<I, S>(class_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            class_names: class_names.into_iter().map(Into::into).collect(),
            prefixes: Self::DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Replace the probed prefixes.
    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    fn alias(prefix: &str, name: &str) -> Option<String> {
        let mut chars = name.chars();
        let first = chars.next()?;
        if !first.is_ascii_lowercase() {
            return None;
        }
        Some(format!("{prefix}{}{}", first.to_ascii_uppercase(), chars.as_str()))
    }
}

impl EnumerationStrategy for VendorAliasStrategy {
    fn name(&self) -> &str {
        "vendor-alias"
    }

    fn applies_to(&self, obj: &dyn HostObject) -> bool {
        self.class_names.iter().any(|c| c == obj.class_name())
    }

    fn property_names(&self, obj: &dyn HostObject) -> Vec<String> {
        let mut names = OwnPropertyNames.property_names(obj);
        let mut known: HashSet<String> = names.iter().cloned().collect();
        let base = names.clone();

        for name in &base {
            for prefix in &self.prefixes {
                let Some(alias) = Self::alias(prefix, name) else {
                    continue;
                };
                if known.contains(&alias) {
                    continue;
                }
                let present = match obj.get(&alias) {
                    Ok(value) => !value.is_undefined(),
                    Err(_) => true,
                };
                if present {
                    debug!(class = obj.class_name(), alias = %alias, "found vendor alias");
                    known.insert(alias.clone());
                    names.push(alias);
                }
            }
        }

        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemObject;
    use crate::value::HostValue;

    #[test]
    fn own_names_are_deduplicated() {
        let obj = MemObject::new("Object");
        obj.set("a", 1);
        obj.set("b", 2);
        assert_eq!(OwnPropertyNames.property_names(&*obj), vec!["a", "b"]);
        assert!(OwnPropertyNames.applies_to(&*obj));
    }

    #[test]
    fn alias_strategy_selects_by_class() {
        let strategy = VendorAliasStrategy::new(["CSSStyleDeclaration"]);
        assert!(strategy.applies_to(&*MemObject::new("CSSStyleDeclaration")));
        assert!(!strategy.applies_to(&*MemObject::new("Object")));
    }

    #[test]
    fn alias_probe_finds_defined_and_throwing_aliases() {
        let style = MemObject::new("CSSStyleDeclaration");
        style.set("transform", "");
        style.set("color", "");
        style.define_hidden("webkitTransform", "none");
        style.define_hidden_throwing("mozColor", "unsupported");

        let strategy = VendorAliasStrategy::new(["CSSStyleDeclaration"]);
        let names = strategy.property_names(&*style);
        assert_eq!(
            names,
            vec!["transform", "color", "webkitTransform", "mozColor"]
        );
    }

    #[test]
    fn alias_probe_skips_undefined_and_listed() {
        let style = MemObject::new("CSSStyleDeclaration");
        style.set("filter", "");
        style.set("webkitFilter", "");
        style.define_hidden("msFilter", HostValue::Undefined);

        let strategy = VendorAliasStrategy::new(["CSSStyleDeclaration"]);
        let names = strategy.property_names(&*style);
        assert_eq!(names, vec!["filter", "webkitFilter"]);
    }

    #[test]
    fn custom_prefixes() {
        let style = MemObject::new("Style");
        style.set("opacity", "");
        style.define_hidden("oOpacity", "1");
        let strategy = VendorAliasStrategy::new(["Style"]).with_prefixes(["o"]);
        assert_eq!(
            strategy.property_names(&*style),
            vec!["opacity", "oOpacity"]
        );
    }

    #[test]
    fn alias_requires_lowercase_start() {
        assert_eq!(
            VendorAliasStrategy::alias("webkit", "transform").as_deref(),
            Some("webkitTransform")
        );
        assert_eq!(VendorAliasStrategy::alias("webkit", "Transform"), None);
        assert_eq!(VendorAliasStrategy::alias("webkit", ""), None);
    }
}
