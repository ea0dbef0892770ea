//! Static destructiveness check for proposed commands.
//!
//! This is a heuristic over the command text, never a guarantee: it only decides whether the
//! preview carries a warning. It does not consult the backend and does not block execution.

/// Verbs that mark a command as potentially mutating or deleting cluster resources.
pub const DEFAULT_DESTRUCTIVE_VERBS: &[&str] = &[
    "delete", "remove", "scale", "patch", "apply", "edit", "replace", "drain",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestructiveVocabulary {
    verbs: Vec<String>,
}

impl Default for DestructiveVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_DESTRUCTIVE_VERBS.iter().copied())
    }
}

impl DestructiveVocabulary {
    pub fn new<I, S>(verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut verbs: Vec<String> = verbs
            .into_iter()
            .map(|verb| verb.as_ref().trim().to_ascii_lowercase())
            .filter(|verb| !verb.is_empty())
            .collect();
        verbs.sort();
        verbs.dedup();
        Self { verbs }
    }

    pub fn verbs(&self) -> &[String] {
        &self.verbs
    }

    /// Whole-token, case-insensitive match: `kubectl logs pod-remover` is not destructive.
    pub fn is_destructive(&self, command_text: &str) -> bool {
        command_text
            .split(|c: char| c.is_whitespace() || c == '/' || c == '=')
            .filter(|token| !token.is_empty())
            .any(|token| {
                let token = token.to_ascii_lowercase();
                self.verbs.iter().any(|verb| *verb == token)
            })
    }
}
