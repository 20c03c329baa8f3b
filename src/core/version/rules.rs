// ─── Rule Evaluation ───
// Allow/deny gates attached to manifest libraries.

use serde::{Deserialize, Serialize};

/// Target operating system, named the way manifests name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Osx,
    Linux,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Osx
        } else {
            Platform::Linux
        }
    }

    pub fn manifest_name(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Osx => "osx",
            Platform::Linux => "linux",
        }
    }

    /// Case-insensitive match against an `os.name` value.
    pub fn matches_name(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(self.manifest_name())
            || (*self == Platform::Osx && name.eq_ignore_ascii_case("macos"))
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    #[serde(alias = "deny")]
    Disallow,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    /// Parsed but not evaluated.
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
}

impl Rule {
    pub fn allow() -> Self {
        Self {
            action: RuleAction::Allow,
            os: None,
        }
    }

    pub fn for_os(action: RuleAction, platform: Platform) -> Self {
        Self {
            action,
            os: Some(OsRule {
                name: Some(platform.manifest_name().to_string()),
                ..OsRule::default()
            }),
        }
    }

    /// A rule without an OS name applies everywhere.
    pub fn applies_to(&self, platform: Platform) -> bool {
        match self.os.as_ref().and_then(|os| os.name.as_deref()) {
            None => true,
            Some(name) => platform.matches_name(name),
        }
    }
}

/// Decide whether a rule-gated entry is included on `platform`.
///
/// - No rule list → allowed.
/// - Otherwise start denied and walk the list top to bottom; every rule that
///   applies overwrites the verdict, so the LAST matching rule decides. An
///   unconditional allow placed after an OS-specific disallow therefore wins.
/// - A present but empty list stays denied.
pub fn evaluate(rules: Option<&[Rule]>, platform: Platform) -> bool {
    let Some(rules) = rules else {
        return true;
    };

    let mut allowed = false;
    for rule in rules {
        if rule.applies_to(platform) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}
