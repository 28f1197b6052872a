use std::fmt;

use tracing::warn;

/// Whether a model is reached through the hosted service or a local server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Remote model that requires a bearer token and has a dashboard page.
    Hosted,
    /// Model served locally without authentication.
    Local,
}

impl ModelKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hosted => "hosted",
            Self::Local => "local",
        }
    }

    fn required_fields(&self) -> usize {
        match self {
            Self::Hosted => 3,
            Self::Local => 2,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One configured model: `(identifier, baseUrl, credential?)`.
#[derive(Clone, PartialEq, Eq)]
pub struct ModelEntry {
    /// Full identifier, possibly namespaced (`owner/model`).
    pub identifier: String,
    pub base_url: String,
    /// Bearer token for hosted models; absent for local ones.
    pub credential: Option<String>,
}

impl ModelEntry {
    pub fn hosted(identifier: impl Into<String>, base_url: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            base_url: base_url.into(),
            credential: Some(credential.into()),
        }
    }

    pub fn local(identifier: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            base_url: base_url.into(),
            credential: None,
        }
    }

    /// A blank credential counts as no credential.
    pub fn kind(&self) -> ModelKind {
        match self.credential.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => ModelKind::Hosted,
            _ => ModelKind::Local,
        }
    }

    pub fn is_local(&self) -> bool {
        self.kind() == ModelKind::Local
    }

    /// Identifier after the last `/`.
    pub fn short_name(&self) -> &str {
        self.identifier.rsplit('/').next().unwrap_or(&self.identifier)
    }
}

impl fmt::Debug for ModelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelEntry")
            .field("identifier", &self.identifier)
            .field("base_url", &self.base_url)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Parse a model list file.
///
/// Each line is trimmed and empty lines are skipped. Fields are separated by
/// commas, trimmed, and empty fields are dropped. Hosted lines need
/// `identifier, baseUrl, token`; local lines need `identifier, baseUrl` and
/// ignore anything after. Lines with too few fields are skipped with a
/// warning.
///
/// ```rust
/// use runway_registry::{ModelKind, parse_model_lines};
///
/// let entries = parse_model_lines("owner/gpt-2, https://gpt-2.hosted-models.runwayml.cloud/v1/, s3cret\n", ModelKind::Hosted);
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].short_name(), "gpt-2");
/// ```
pub fn parse_model_lines(text: &str, kind: ModelKind) -> Vec<ModelEntry> {
    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).filter(|field| !field.is_empty()).collect();
        if fields.len() < kind.required_fields() {
            warn!(
                line = index + 1,
                kind = %kind,
                found = fields.len(),
                expected = kind.required_fields(),
                "skipping malformed model line"
            );
            continue;
        }

        let entry = match kind {
            ModelKind::Hosted => ModelEntry::hosted(fields[0], fields[1], fields[2]),
            ModelKind::Local => ModelEntry::local(fields[0], fields[1]),
        };
        entries.push(entry);
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hosted_lines_with_tokens() {
        let text = "  owner/style-transfer , https://style.hosted-models.runwayml.cloud/v1/ ,  tok  \r\n\r\n";
        let entries = parse_model_lines(text, ModelKind::Hosted);

        assert_eq!(
            entries,
            vec![ModelEntry::hosted(
                "owner/style-transfer",
                "https://style.hosted-models.runwayml.cloud/v1/",
                "tok"
            )]
        );
        assert_eq!(entries[0].kind(), ModelKind::Hosted);
        assert_eq!(entries[0].short_name(), "style-transfer");
    }

    #[test]
    fn parses_local_lines_and_ignores_extra_fields() {
        let text = "face-landmarks, http://localhost:8000\nposenet, http://localhost:8001, ignored\n";
        let entries = parse_model_lines(text, ModelKind::Local);

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(ModelEntry::is_local));
        assert_eq!(entries[1].base_url, "http://localhost:8001");
        assert_eq!(entries[0].short_name(), "face-landmarks");
    }

    #[test]
    fn skips_lines_with_missing_fields() {
        let text = "only-a-name\nowner/model, https://model.example.com/, \nowner/ok, https://ok.example.com/, t\n";
        let entries = parse_model_lines(text, ModelKind::Hosted);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].identifier, "owner/ok");
    }

    #[test]
    fn blank_credential_means_local() {
        let entry = ModelEntry::hosted("m", "http://localhost:1", "  ");
        assert_eq!(entry.kind(), ModelKind::Local);
    }

    #[test]
    fn debug_output_hides_credentials() {
        let entry = ModelEntry::hosted("m", "https://m.example.com/", "super-secret");
        let debug = format!("{entry:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
