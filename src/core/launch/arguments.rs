// ─── Argument Templates ───
// `${token}` substitution for manifest argument lists.

use std::collections::BTreeMap;

use crate::core::version::ArgumentTemplate;

/// Token table supplied once per launch. Tokens are stored without the
/// surrounding `${` `}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderContext {
    values: BTreeMap<String, String>,
}

impl PlaceholderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(token, value);
        self
    }

    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.values.insert(token.into(), value.into());
    }

    /// Fill `token` only when the caller did not provide it.
    pub fn insert_if_absent(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.values.entry(token.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.values.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace every known `${token}` in `template`. Unknown tokens and an
    /// unterminated `${` are copied through untouched. Substituted values are
    /// never rescanned.
    pub fn substitute(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = match (after.find('}'), after.find("${")) {
                (Some(end), Some(next)) if next < end => None,
                (end, _) => end,
            };
            // Unterminated opener: copy it and rescan from the next `${`.
            let Some(end) = end else {
                out.push_str("${");
                rest = after;
                continue;
            };

            let token = &after[..end];
            match self.values.get(token) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[start..start + 2 + end + 1]),
            }
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        out
    }
}

impl<K, V> FromIterator<(K, V)> for PlaceholderContext
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Self::new();
        for (k, v) in iter {
            context.insert(k, v);
        }
        context
    }
}

impl<K, V> Extend<(K, V)> for PlaceholderContext
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

/// Expand the literal entries of `templates` in order. Structured
/// (rule-gated) entries are skipped, not evaluated.
pub fn expand(templates: &[ArgumentTemplate], context: &PlaceholderContext) -> Vec<String> {
    templates
        .iter()
        .filter_map(|template| match template {
            ArgumentTemplate::Literal(raw) => Some(context.substitute(raw)),
            ArgumentTemplate::Conditional(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_tokens_anywhere_in_the_string() {
        let ctx = PlaceholderContext::new()
            .with("library_directory", "/games/libraries")
            .with("classpath_separator", ":");
        assert_eq!(
            ctx.substitute("-p ${library_directory}/a.jar${classpath_separator}${library_directory}/b.jar"),
            "-p /games/libraries/a.jar:/games/libraries/b.jar"
        );
    }

    #[test]
    fn unknown_tokens_are_left_verbatim() {
        let ctx = PlaceholderContext::new().with("auth_player_name", "Steve");
        assert_eq!(ctx.substitute("${user_properties}"), "${user_properties}");
        assert_eq!(
            ctx.substitute("${auth_player_name}-${missing}"),
            "Steve-${missing}"
        );
        assert_eq!(ctx.substitute("broken ${auth_player_name"), "broken ${auth_player_name");
        assert_eq!(ctx.substitute("$ {x} and $"), "$ {x} and $");
    }

    #[test]
    fn unterminated_opener_does_not_swallow_the_next_token() {
        let ctx = PlaceholderContext::new().with("auth_player_name", "Steve");
        assert_eq!(ctx.substitute("${a ${auth_player_name}"), "${a Steve");
        assert_eq!(ctx.substitute("${${auth_player_name}}"), "${Steve}");
        assert_eq!(ctx.substitute("x ${ y ${"), "x ${ y ${");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let ctx = PlaceholderContext::new()
            .with("a", "${b}")
            .with("b", "nope");
        assert_eq!(ctx.substitute("${a}"), "${b}");
    }

    #[test]
    fn expand_skips_structured_entries() {
        let templates = vec![
            ArgumentTemplate::from("--user"),
            ArgumentTemplate::from("${auth_player_name}"),
            ArgumentTemplate::Conditional(serde_json::json!({
                "rules": [{"action": "allow", "features": {"is_demo_user": true}}],
                "value": "--demo"
            })),
            ArgumentTemplate::from("--width"),
        ];
        let ctx = PlaceholderContext::new().with("auth_player_name", "Steve");

        assert_eq!(expand(&templates, &ctx), vec!["--user", "Steve", "--width"]);
    }

    #[test]
    fn insert_if_absent_keeps_caller_value() {
        let mut ctx: PlaceholderContext = [("version_name", "custom")].into_iter().collect();
        ctx.insert_if_absent("version_name", "1.20.1");
        ctx.insert_if_absent("assets_index_name", "5");
        assert_eq!(ctx.get("version_name"), Some("custom"));
        assert_eq!(ctx.get("assets_index_name"), Some("5"));
        assert_eq!(ctx.len(), 2);
    }
}
