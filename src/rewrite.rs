//! Carrier URL normalization.
//!
//! Some carriers still hand out plain-HTTP authentication URLs. Before the
//! auth leg is dispatched, the target URL is run through an ordered
//! [`RewriteTable`]; the first matching rule decides the outcome and an
//! unmatched URL passes through unchanged.

/// A single entry of the rewrite table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RewriteRule {
    /// URLs beginning with `prefix` get their `http` scheme swapped for `https`.
    UpgradeScheme { prefix: String },
    /// URLs containing `marker` are left alone and no later rule is consulted.
    Preserve { marker: String },
    /// URLs beginning with `from` get that prefix replaced by `to`.
    ReplacePrefix { from: String, to: String },
}

impl RewriteRule {
    #[must_use]
    pub fn upgrade_scheme(prefix: impl Into<String>) -> Self {
        Self::UpgradeScheme {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn preserve(marker: impl Into<String>) -> Self {
        Self::Preserve {
            marker: marker.into(),
        }
    }

    #[must_use]
    pub fn replace_prefix(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::ReplacePrefix {
            from: from.into(),
            to: to.into(),
        }
    }

    fn matches(&self, url: &str) -> bool {
        match self {
            Self::UpgradeScheme { prefix } => url.starts_with(prefix.as_str()),
            Self::Preserve { marker } => url.contains(marker.as_str()),
            Self::ReplacePrefix { from, .. } => url.starts_with(from.as_str()),
        }
    }

    fn apply(&self, url: &str) -> String {
        match self {
            Self::UpgradeScheme { .. } => match url.strip_prefix("http:") {
                Some(rest) => format!("https:{rest}"),
                None => url.to_owned(),
            },
            Self::Preserve { .. } => url.to_owned(),
            Self::ReplacePrefix { from, to } => format!("{to}{}", &url[from.len()..]),
        }
    }
}

/// Ordered list of rewrite rules; first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteTable {
    rules: Vec<RewriteRule>,
}

impl RewriteTable {
    #[must_use]
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule after the existing ones.
    #[must_use]
    pub fn with_rule(mut self, rule: RewriteRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// Rewrites `url` with the first matching rule. Never fails.
    #[must_use]
    pub fn rewrite(&self, url: &str) -> String {
        self.rules
            .iter()
            .find(|rule| rule.matches(url))
            .map_or_else(|| url.to_owned(), |rule| rule.apply(url))
    }
}

impl Default for RewriteTable {
    /// Known legacy carrier templates.
    ///
    /// 1. Template A (`http://oap7.*`): scheme upgrade only.
    /// 2. `pfflow=` URLs: carrier encodes its own flow, never touched.
    /// 3. Template B production and staging: moved to their secure hosts.
    fn default() -> Self {
        Self::new(vec![
            RewriteRule::upgrade_scheme("http://oap7."),
            RewriteRule::preserve("pfflow="),
            RewriteRule::replace_prefix(
                "http://mobile.carrierb.net/auth/",
                "https://secure.carrierb.net/auth/",
            ),
            RewriteRule::replace_prefix(
                "http://mobile-staging.carrierb.net/auth/",
                "https://secure-staging.carrierb.net/auth/",
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_a_swaps_scheme_only() {
        let table = RewriteTable::default();
        assert_eq!(
            table.rewrite("http://oap7.example/auth?x=1"),
            "https://oap7.example/auth?x=1"
        );
    }

    #[test]
    fn template_a_wins_over_pfflow_marker() {
        let table = RewriteTable::default();
        assert_eq!(
            table.rewrite("http://oap7.example/auth?pfflow=2&data=abc"),
            "https://oap7.example/auth?pfflow=2&data=abc"
        );
    }

    #[test]
    fn pfflow_urls_are_preserved() {
        let table = RewriteTable::default();
        let url = "http://mobile.carrierb.net/auth/start?pfflow=2&data=abc";
        assert_eq!(table.rewrite(url), url);
    }

    #[test]
    fn template_b_production_is_moved() {
        let table = RewriteTable::default();
        assert_eq!(
            table.rewrite("http://mobile.carrierb.net/auth/v2/session?id=9"),
            "https://secure.carrierb.net/auth/v2/session?id=9"
        );
    }

    #[test]
    fn template_b_staging_is_moved() {
        let table = RewriteTable::default();
        assert_eq!(
            table.rewrite("http://mobile-staging.carrierb.net/auth/x"),
            "https://secure-staging.carrierb.net/auth/x"
        );
    }

    #[test]
    fn unknown_urls_pass_through() {
        let table = RewriteTable::default();
        let url = "http://carrier.example/auth?vfp=1";
        assert_eq!(table.rewrite(url), url);
    }

    #[test]
    fn rewriting_is_idempotent() {
        let table = RewriteTable::default();
        for url in [
            "http://oap7.example/auth?x=1",
            "http://mobile.carrierb.net/auth/a",
            "http://mobile-staging.carrierb.net/auth/b",
            "https://carrier.example/auth",
        ] {
            let once = table.rewrite(url);
            assert_eq!(table.rewrite(&once), once, "not idempotent for {url}");
        }
    }

    #[test]
    fn empty_table_is_identity() {
        let url = "http://oap7.example/auth";
        assert_eq!(RewriteTable::empty().rewrite(url), url);
    }

    #[test]
    fn custom_rules_append_in_order() {
        let table = RewriteTable::empty()
            .with_rule(RewriteRule::preserve("keep"))
            .with_rule(RewriteRule::replace_prefix("http://a/", "https://b/"));
        assert_eq!(table.rewrite("http://a/keep"), "http://a/keep");
        assert_eq!(table.rewrite("http://a/x"), "https://b/x");
        assert_eq!(table.rules().len(), 2);
    }
}
