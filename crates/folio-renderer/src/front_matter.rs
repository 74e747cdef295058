//! YAML front matter at the top of a markdown document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Page-level metadata declared between `---` lines at the top of a file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    /// Page title (overrides the first H1 heading).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Page description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Any other keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Error type for front matter parsing.
#[derive(Debug, thiserror::Error)]
pub enum FrontMatterError {
    /// Invalid YAML.
    #[error("Invalid front matter: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl FrontMatter {
    /// Parse front matter YAML. Empty content yields the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed.
    pub fn from_yaml(content: &str) -> Result<Self, FrontMatterError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(trimmed)?)
    }
}

/// Source split into front matter and body.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct SplitSource<'a> {
    /// YAML between the delimiters, if present.
    pub yaml: Option<&'a str>,
    /// Remaining markdown.
    pub body: &'a str,
    /// 1-based line number of the first body line.
    pub body_line: usize,
}

/// Split leading `---` delimited front matter from the body.
///
/// An unterminated block is treated as regular markdown.
pub(crate) fn split(source: &str) -> SplitSource<'_> {
    let no_front_matter = SplitSource {
        yaml: None,
        body: source,
        body_line: 1,
    };

    let Some(rest) = source
        .strip_prefix("---\n")
        .or_else(|| source.strip_prefix("---\r\n"))
    else {
        return no_front_matter;
    };

    let mut offset = 0;
    for (index, line) in rest.split_inclusive('\n').enumerate() {
        if line.trim_end() == "---" {
            return SplitSource {
                yaml: Some(&rest[..offset]),
                body: &rest[offset + line.len()..],
                body_line: index + 3,
            };
        }
        offset += line.len();
    }

    no_front_matter
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_front_matter() {
        let source = "---\ntitle: Hello\n---\n# Body\n";
        let split = split(source);

        assert_eq!(split.yaml, Some("title: Hello\n"));
        assert_eq!(split.body, "# Body\n");
        assert_eq!(split.body_line, 4);
    }

    #[test]
    fn test_split_without_front_matter() {
        let split = split("# Title\n");
        assert_eq!(split.yaml, None);
        assert_eq!(split.body_line, 1);
    }

    #[test]
    fn test_unterminated_front_matter_is_body() {
        let source = "---\ntitle: Hello\n";
        let split = split(source);
        assert_eq!(split.yaml, None);
        assert_eq!(split.body, source);
    }

    #[test]
    fn test_from_yaml_keeps_extra_keys() {
        let fm = FrontMatter::from_yaml("title: Install\nnavigation_title: Setup\n").unwrap();
        assert_eq!(fm.title.as_deref(), Some("Install"));
        assert!(fm.extra.contains_key("navigation_title"));
    }

    #[test]
    fn test_from_yaml_invalid() {
        assert!(FrontMatter::from_yaml("title: [unclosed").is_err());
    }
}
