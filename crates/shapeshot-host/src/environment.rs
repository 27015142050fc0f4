//! Environment description from a user-agent string.
//!
//! Captured graphs carry the user agent of the environment they came from and
//! a normalized [`PlatformInfo`] derived from it, so two snapshots can be
//! labelled and compared without re-parsing raw strings.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Normalized environment descriptor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    /// Browser or runtime name (`"Chrome"`, `"Firefox"`, ...), or `"unknown"`.
    pub name: String,
    /// Version of `name`, if one was found.
    pub version: Option<String>,
    /// Operating system family, if one was found.
    pub os: Option<String>,
    /// Operating system version, if one was found.
    pub os_version: Option<String>,
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(version) = &self.version {
            write!(f, " {version}")?;
        }
        if let Some(os) = &self.os {
            write!(f, " on {os}")?;
            if let Some(os_version) = &self.os_version {
                write!(f, " {os_version}")?;
            }
        }
        Ok(())
    }
}

struct Pattern {
    name: &'static str,
    regex: Regex,
}

fn pattern(name: &'static str, re: &str) -> Pattern {
    Pattern {
        name,
        regex: Regex::new(re).expect("static pattern"),
    }
}

// Order matters: Edge and Opera also advertise Chrome and Safari, and Chrome
// also advertises Safari.
static BROWSERS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        pattern("Edge", r"Edg(?:e|A|iOS)?/([\d.]+)"),
        pattern("Opera", r"OPR/([\d.]+)"),
        pattern("Firefox", r"(?:Firefox|FxiOS)/([\d.]+)"),
        pattern("Chrome", r"(?:Chrome|CriOS)/([\d.]+)"),
        pattern("Safari", r"Version/([\d.]+).*Safari/"),
        pattern("Node.js", r"Node\.js/v?([\d.]+)"),
        pattern("shapeshot", r"shapeshot/([\d.]+)"),
    ]
});

static SYSTEMS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        pattern("Windows", r"Windows NT ([\d.]+)"),
        pattern("iOS", r"(?:iPhone|iPad|iPod).*? OS ([\d_]+)"),
        pattern("Android", r"Android ([\d.]+)"),
        pattern("macOS", r"Mac OS X ([\d_.]+)"),
        pattern("Chrome OS", r"CrOS \S+ ([\d.]+)"),
        pattern("Linux", r"Linux()"),
    ]
});

fn first_match(patterns: &[Pattern], ua: &str) -> Option<(&'static str, Option<String>)> {
    patterns.iter().find_map(|p| {
        p.regex.captures(ua).map(|caps| {
            let version = caps
                .get(1)
                .map(|m| m.as_str().replace('_', "."))
                .filter(|v| !v.is_empty());
            (p.name, version)
        })
    })
}

/// Derive a [`PlatformInfo`] from a user-agent string.
pub fn describe_environment(user_agent: &str) -> PlatformInfo {
    let (name, version) = first_match(&BROWSERS, user_agent)
        .map(|(name, version)| (name.to_string(), version))
        .unwrap_or_else(|| ("unknown".to_string(), None));
    let (os, os_version) = match first_match(&SYSTEMS, user_agent) {
        Some((os, version)) => (Some(os.to_string()), version),
        None => (None, None),
    };
    PlatformInfo {
        name,
        version,
        os,
        os_version,
    }
}
