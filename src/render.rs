//! README rendering for a validated [`DocPack`].
//!
//! Sentinel values render as placeholders: empty lists become `_None_`,
//! `- Unknown`, or `1. Unknown` depending on the section, and each section
//! is followed by its cited sources when the model supplied any.

use pulldown_cmark::{html, Options, Parser};
use repodoc_core::DocPack;

/// Render the document as GitHub-flavoured Markdown.
pub fn render_readme_markdown(doc: &DocPack) -> String {
    let title = if doc.summary.name.is_empty() {
        &doc.meta.repo
    } else {
        &doc.summary.name
    };

    let mut md = String::new();
    md.push_str(&format!("# {}\n\n", title));
    md.push_str(&format!("> {}\n\n", doc.summary.one_liner));
    md.push_str(&format!("{}\n\n", doc.summary.description));

    md.push_str("## Features\n");
    md.push_str(&bullets(&doc.features, "_None_"));
    md.push_str(&sources(doc, "features"));

    md.push_str("\n## How to Run\n**Prerequisites**\n");
    md.push_str(&bullets(&doc.how_to_run.prerequisites, "- Unknown"));
    md.push_str("\n**Install**\n");
    md.push_str(&numbered(&doc.how_to_run.install_steps));
    md.push_str("\n**Run**\n");
    md.push_str(&numbered(&doc.how_to_run.run_steps));
    md.push_str(&sources(doc, "how_to_run"));

    md.push_str("\n## Tech Stack\n");
    md.push_str(&format!("- **Languages**: {}\n", comma_list(&doc.tech_stack.languages)));
    md.push_str(&format!("- **Frameworks**: {}\n", comma_list(&doc.tech_stack.frameworks)));
    md.push_str(&format!("- **Libraries**: {}\n", comma_list(&doc.tech_stack.libraries)));
    md.push_str(&sources(doc, "tech_stack"));

    md.push_str(&format!("\n## Architecture\n{}\n\n**Key Components**\n", doc.architecture.overview));
    if doc.architecture.key_components.is_empty() {
        md.push_str("- Unknown\n");
    } else {
        for k in &doc.architecture.key_components {
            md.push_str(&format!("- **{}**: {}\n", k.name, k.description));
        }
    }
    md.push_str(&sources(doc, "architecture"));

    md.push_str("\n## Security Notes\n");
    md.push_str(&bullets(&doc.security_notes, "- Unknown"));
    md.push_str(&sources(doc, "security_notes"));

    md.push_str("\n## Limitations\n");
    md.push_str(&bullets(&doc.limitations, "- Unknown"));
    md.push_str(&sources(doc, "limitations"));

    let commit = doc
        .meta
        .commit_sha
        .as_deref()
        .map(|sha| format!(" (commit {})", sha))
        .unwrap_or_default();
    md.push_str(&format!(
        "\n---\n\n_Generated at {} for `{}/{}` @ `{}`{}._\n",
        doc.meta.generated_at_iso, doc.meta.owner, doc.meta.repo, doc.meta.git_ref, commit
    ));

    md
}

/// Convert Markdown to an HTML fragment.
pub fn markdown_to_html(md: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let mut out = String::with_capacity(md.len() * 2);
    html::push_html(&mut out, Parser::new_ext(md, options));
    out
}

fn bullets(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        return format!("{}\n", empty);
    }
    items.iter().map(|i| format!("- {}\n", i)).collect()
}

fn numbered(items: &[String]) -> String {
    if items.is_empty() {
        return "1. Unknown\n".to_string();
    }
    items.iter().map(|i| format!("1. {}\n", i)).collect()
}

fn comma_list(items: &[String]) -> String {
    if items.is_empty() {
        "Unknown".to_string()
    } else {
        items.join(", ")
    }
}

fn sources(doc: &DocPack, section: &str) -> String {
    let cited = doc.sources_for(section);
    if cited.is_empty() {
        return String::new();
    }
    let lines: String = cited
        .iter()
        .map(|s| format!("- `{}:{}-{}`\n", s.path, s.start_line, s.end_line))
        .collect();
    format!("\n**Sources**:\n{}", lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use repodoc_core::models::{Citation, CitationSource, KeyComponent};
    use repodoc_core::DocMeta;

    fn doc() -> DocPack {
        DocPack::skeleton(DocMeta {
            owner: "octo".into(),
            repo: "demo".into(),
            git_ref: "main".into(),
            commit_sha: Some("abc1234".into()),
            generated_at_iso: "2024-05-01T12:30:00Z".into(),
        })
    }

    #[test]
    fn test_skeleton_renders_placeholders() {
        let md = render_readme_markdown(&doc());
        assert!(md.starts_with("# Unknown\n\n> Unknown\n"));
        assert!(md.contains("## Features\n_None_\n"));
        assert!(md.contains("**Install**\n1. Unknown\n"));
        assert!(md.contains("- **Languages**: Unknown\n"));
        assert!(md.contains("**Key Components**\n- Unknown\n"));
        assert!(!md.contains("**Sources**"));
        assert!(md.ends_with("for `octo/demo` @ `main` (commit abc1234)._\n"));
    }

    #[test]
    fn test_filled_sections_and_sources() {
        let mut d = doc();
        d.summary.name = String::new();
        d.features = vec!["Fast".into(), "Small".into()];
        d.tech_stack.languages = vec!["Rust".into(), "TypeScript".into()];
        d.architecture.key_components = vec![KeyComponent {
            name: "Chunker".into(),
            description: "Splits text".into(),
        }];
        d.citations = Some(vec![Citation {
            section: "features".into(),
            sources: vec![CitationSource {
                path: "README.md".into(),
                start_line: 1,
                end_line: 20,
            }],
        }]);

        let md = render_readme_markdown(&d);
        assert!(md.starts_with("# demo\n"));
        assert!(md.contains("- Fast\n- Small\n"));
        assert!(md.contains("\n**Sources**:\n- `README.md:1-20`\n"));
        assert!(md.contains("- **Languages**: Rust, TypeScript\n"));
        assert!(md.contains("- **Chunker**: Splits text\n"));
    }

    #[test]
    fn test_markdown_to_html() {
        let html = markdown_to_html("# Title\n\n- one\n- two\n");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<li>one</li>"));
    }
}
