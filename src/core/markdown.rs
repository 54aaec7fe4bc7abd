//! Markdown conventions shared by the analyzer, converter and validator.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

/// Conventional primary document names, highest priority first.
pub const PRIMARY_DOCUMENT_CANDIDATES: &[&str] = &[
    "SKILL.md",
    "AGENT.md",
    "README.md",
    "readme.md",
    "index.md",
    "main.md",
];

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid regex"));
static PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").expect("valid regex"));

/// Fields recognized in the leading `---` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrontMatter {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFence {
    /// Info string after the opening backticks, lowercased.
    pub lang: String,
    pub body: String,
}

#[must_use]
pub fn is_markup(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.ends_with(".md") || lower.ends_with(".markdown")
}

/// Pick the primary document among `files` (relative to `root`).
///
/// Order: the conventional names at the top level, then the largest markup
/// file at the top level, then the first markup file anywhere.
#[must_use]
pub fn select_primary_document(root: &Path, files: &[String]) -> Option<String> {
    for candidate in PRIMARY_DOCUMENT_CANDIDATES {
        if files.iter().any(|f| f == candidate) {
            return Some((*candidate).to_string());
        }
    }

    let largest = files
        .iter()
        .filter(|f| !f.contains('/') && is_markup(f))
        .map(|f| {
            let size = std::fs::metadata(root.join(f)).map_or(0, |m| m.len());
            (f, size)
        })
        // ties go to the alphabetically first name
        .max_by(|(a_name, a_size), (b_name, b_size)| {
            a_size.cmp(b_size).then_with(|| b_name.cmp(a_name))
        })
        .map(|(f, _)| f.clone());
    if largest.is_some() {
        return largest;
    }

    files.iter().find(|f| is_markup(f)).cloned()
}

/// Split a leading YAML front-matter block from the body.
#[must_use]
pub fn split_front_matter(content: &str) -> (Option<FrontMatter>, &str) {
    let trimmed = content.trim_start_matches('\u{feff}');
    let Some(rest) = trimmed
        .strip_prefix("---\n")
        .or_else(|| trimmed.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let parsed = match serde_yaml::from_str::<FrontMatter>(yaml) {
                Ok(front) => Some(front),
                Err(err) => {
                    tracing::debug!("ignoring unparseable front matter: {err}");
                    None
                }
            };
            return (parsed, body);
        }
        offset += line.len();
    }

    (None, content)
}

/// Text of the first level-one heading, with link and parenthetical syntax
/// removed.
#[must_use]
pub fn title(content: &str) -> Option<String> {
    let (_, body) = split_front_matter(content);
    let raw = body
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))?;
    let text = LINK_RE.replace_all(raw, "$1");
    let text = PAREN_RE.replace_all(&text, "");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Value of a `- Field: value` line (either list marker, case-insensitive).
#[must_use]
pub fn field_value(content: &str, field: &str) -> Option<String> {
    let pattern = format!(r"(?mi)[-*]\s*{}:[ \t]*(\S.*)$", regex::escape(field));
    let re = Regex::new(&pattern).ok()?;
    re.captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Fenced code blocks in document order. An unterminated fence runs to the end.
#[must_use]
pub fn code_fences(content: &str) -> Vec<CodeFence> {
    let mut fences = Vec::new();
    let mut current: Option<CodeFence> = None;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if let Some(info) = trimmed.strip_prefix("```") {
            match current.take() {
                Some(fence) => fences.push(fence),
                None => {
                    current = Some(CodeFence {
                        lang: info.trim().to_lowercase(),
                        body: String::new(),
                    });
                }
            }
            continue;
        }
        if let Some(fence) = current.as_mut() {
            fence.body.push_str(line);
            fence.body.push('\n');
        }
    }

    fences.extend(current);
    fences
}

/// `deploying-service` -> `Deploying Service`.
#[must_use]
pub fn title_case(name: &str) -> String {
    name.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn primary_prefers_conventional_names() {
        let dir = TempDir::new().unwrap();
        let files = names(&["notes.md", "README.md", "SKILL.md"]);
        assert_eq!(
            select_primary_document(dir.path(), &files).as_deref(),
            Some("SKILL.md")
        );
    }

    #[test]
    fn primary_falls_back_to_largest_top_level_markup() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("small.md"), "# a").unwrap();
        std::fs::write(dir.path().join("large.md"), "# a\n".repeat(50)).unwrap();
        let files = names(&["large.md", "small.md", "script.sh"]);
        assert_eq!(
            select_primary_document(dir.path(), &files).as_deref(),
            Some("large.md")
        );
    }

    #[test]
    fn primary_falls_back_to_nested_markup() {
        let dir = TempDir::new().unwrap();
        let files = names(&["run.sh", "docs/guide.md"]);
        assert_eq!(
            select_primary_document(dir.path(), &files).as_deref(),
            Some("docs/guide.md")
        );
        assert_eq!(select_primary_document(dir.path(), &names(&["a.txt"])), None);
    }

    #[test]
    fn front_matter_is_split_and_parsed() {
        let doc = "---\nname: lint-fixer\ndescription: Fixes lint\nallowed-tools: Bash\n---\n# Lint Fixer\n";
        let (front, body) = split_front_matter(doc);
        let front = front.unwrap();
        assert_eq!(front.name.as_deref(), Some("lint-fixer"));
        assert_eq!(front.description.as_deref(), Some("Fixes lint"));
        assert_eq!(body, "# Lint Fixer\n");
    }

    #[test]
    fn unterminated_front_matter_is_left_alone() {
        let doc = "---\nname: x\n# Title\n";
        let (front, body) = split_front_matter(doc);
        assert!(front.is_none());
        assert_eq!(body, doc);
    }

    #[test]
    fn title_strips_links_and_parentheticals() {
        let doc = "intro\n# [Deploy Service](https://x.dev) (beta)\nbody";
        assert_eq!(title(doc).as_deref(), Some("Deploy Service"));
        assert_eq!(title("## Only h2"), None);
    }

    #[test]
    fn field_value_requires_content() {
        let doc = "# T\n\n- Purpose: Ship it\n* scope:   repo wide\n- Owner:\n";
        assert_eq!(field_value(doc, "Purpose").as_deref(), Some("Ship it"));
        assert_eq!(field_value(doc, "Scope").as_deref(), Some("repo wide"));
        assert_eq!(field_value(doc, "Owner"), None);
    }

    #[test]
    fn code_fences_capture_lang_and_body() {
        let doc = "text\n```bash\ngh pr list\n```\n\n```Python\nimport yaml\n";
        let fences = code_fences(doc);
        assert_eq!(fences.len(), 2);
        assert_eq!(fences[0].lang, "bash");
        assert_eq!(fences[0].body, "gh pr list\n");
        assert_eq!(fences[1].lang, "python");
        assert_eq!(fences[1].body, "import yaml\n");
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("deploying-service"), "Deploying Service");
        assert_eq!(title_case("api_GATEWAY"), "Api Gateway");
    }
}
