pub mod manifest;
pub mod rules;

pub use manifest::{ArgumentTemplate, Arguments, DependencyManifest, LibraryEntry};
pub use rules::{evaluate, OsRule, Platform, Rule, RuleAction};
