//! Binding keys and routing keys, AMQP-topic-like: tokens separated by
//! `.`, with `*` matching exactly one token and `#` (tail-only) matching
//! zero or more trailing tokens.

use std::fmt;

/// One token of a [`BindingKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingToken {
    /// A literal token that must match exactly.
    Literal(String),
    /// `*` — matches any single token at this position.
    Star,
    /// `#` — matches zero or more trailing tokens. Only valid as the
    /// last token of a `BindingKey`.
    Sharp,
}

impl fmt::Display for BindingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "{s}"),
            Self::Star => write!(f, "*"),
            Self::Sharp => write!(f, "#"),
        }
    }
}

/// A routing-key pattern, possibly wildcarded. An empty token list means
/// "match all".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BindingKey(Vec<BindingToken>);

impl BindingKey {
    /// The "match everything" key.
    #[must_use]
    pub fn match_all() -> Self {
        Self(Vec::new())
    }

    /// Build a binding key from explicit tokens.
    #[must_use]
    pub fn from_tokens(tokens: Vec<BindingToken>) -> Self {
        Self(tokens)
    }

    /// Parse a dot-delimited textual binding key, e.g. `"a.*.#"`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Self::match_all();
        }
        let tokens = text
            .split('.')
            .map(|tok| match tok {
                "*" => BindingToken::Star,
                "#" => BindingToken::Sharp,
                literal => BindingToken::Literal(literal.to_string()),
            })
            .collect();
        Self(tokens)
    }

    /// Tokens of this binding key.
    #[must_use]
    pub fn tokens(&self) -> &[BindingToken] {
        &self.0
    }

    /// Whether this is the "match all" key.
    #[must_use]
    pub fn is_match_all(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this binding key matches the given routing key.
    #[must_use]
    pub fn matches(&self, routing_key: &RoutingKey) -> bool {
        if self.0.is_empty() {
            return true;
        }
        Self::matches_tokens(&self.0, routing_key.tokens())
    }

    fn matches_tokens(pattern: &[BindingToken], routing: &[String]) -> bool {
        match pattern.first() {
            None => routing.is_empty(),
            Some(BindingToken::Sharp) => true, // only valid as last token
            Some(BindingToken::Star) => {
                !routing.is_empty() && Self::matches_tokens(&pattern[1..], &routing[1..])
            }
            Some(BindingToken::Literal(lit)) => {
                !routing.is_empty()
                    && &routing[0] == lit
                    && Self::matches_tokens(&pattern[1..], &routing[1..])
            }
        }
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(std::string::ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{rendered}")
    }
}

/// A concrete routing key derived from a message's routable fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RoutingKey(Vec<String>);

impl RoutingKey {
    /// Build a routing key from explicit tokens.
    #[must_use]
    pub fn from_tokens(tokens: Vec<String>) -> Self {
        Self(tokens)
    }

    /// Parse a dot-delimited textual routing key.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Self(Vec::new());
        }
        Self(text.split('.').map(str::to_string).collect())
    }

    /// Tokens of this routing key.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_binding_key_matches_all() {
        let key = BindingKey::match_all();
        assert!(key.matches(&RoutingKey::parse("a.b.c")));
        assert!(key.matches(&RoutingKey::parse("")));
    }

    #[test]
    fn literal_tokens_match_pairwise() {
        let key = BindingKey::parse("a.b");
        assert!(key.matches(&RoutingKey::parse("a.b")));
        assert!(!key.matches(&RoutingKey::parse("a.c")));
        assert!(!key.matches(&RoutingKey::parse("a.b.c")));
    }

    #[test]
    fn star_matches_single_token() {
        let key = BindingKey::parse("x.*");
        assert!(key.matches(&RoutingKey::parse("x.y")));
        assert!(!key.matches(&RoutingKey::parse("x")));
        assert!(!key.matches(&RoutingKey::parse("x.y.z")));
    }

    #[test]
    fn sharp_matches_zero_or_more_trailing_tokens() {
        let key = BindingKey::parse("x.#");
        assert!(key.matches(&RoutingKey::parse("x")));
        assert!(key.matches(&RoutingKey::parse("x.y")));
        assert!(key.matches(&RoutingKey::parse("x.y.z")));
        assert!(!key.matches(&RoutingKey::parse("w")));
    }

    #[test]
    fn scenario_routing_key_match_from_spec() {
        // Peer A: {T, [x,*]}; Peer B: {T, [x,#]}
        let a = BindingKey::parse("x.*");
        let b = BindingKey::parse("x.#");

        assert!(a.matches(&RoutingKey::parse("x.y")));
        assert!(b.matches(&RoutingKey::parse("x.y")));

        assert!(!a.matches(&RoutingKey::parse("x.y.z")));
        assert!(b.matches(&RoutingKey::parse("x.y.z")));

        assert!(!a.matches(&RoutingKey::parse("w")));
        assert!(!b.matches(&RoutingKey::parse("w")));
    }
}
