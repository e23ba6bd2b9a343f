//! Repository acquisition: GitHub zipball download and local checkouts.
//!
//! Both paths funnel raw files through the same eligibility rules:
//!
//! 1. Path must match the extension allow-list and sit outside excluded
//!    directories (`node_modules`, `.git`, `dist`, …).
//! 2. File must be at most `max_file_bytes`.
//! 3. File must not look binary (null byte, or no newline, in the first 1 KiB).
//! 4. Decoded text must not be blank.
//! 5. Collection stops once `max_total_bytes` would be exceeded or
//!    `max_files` files were kept.

use std::io::{Cursor, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use reqwest::Url;
use repodoc_core::FileEntry;
use walkdir::WalkDir;

use crate::config::SourceConfig;

const BINARY_SNIFF_BYTES: usize = 1024;

const ALLOWED_EXTENSIONS: &[&str] = &[
    "md", "txt", "json", "yml", "yaml", "toml", "ini", "env.example", "js", "jsx", "ts", "tsx",
    "py", "java", "kt", "rb", "go", "rs", "php", "c", "h", "cpp", "cs", "sql", "sh", "ps1", "bat",
    "gradle", "xml", "ipynb",
];

const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".github",
    "dist",
    "build",
    ".next",
    "coverage",
];

/// A GitHub repository and the ref to document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub git_ref: String,
}

/// Parse `https://github.com/owner/repo[.git][/tree/<ref>]`.
pub fn parse_github_url(url: &str) -> Result<RepoRef> {
    let parsed = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
    if parsed.host_str() != Some("github.com") {
        bail!("Only github.com URLs are supported");
    }

    let parts: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    if parts.len() < 2 {
        bail!("URL must include /owner/repo");
    }

    let owner = parts[0].to_string();
    let repo = parts[1].trim_end_matches(".git").to_string();
    let git_ref = parts
        .iter()
        .position(|p| *p == "tree")
        .and_then(|i| parts.get(i + 1))
        .map(|r| r.to_string())
        .unwrap_or_else(|| "HEAD".to_string());

    Ok(RepoRef {
        owner,
        repo,
        git_ref,
    })
}

/// Download the repository archive for `repo_ref`.
pub async fn fetch_zipball(
    client: &reqwest::Client,
    api_base: &str,
    repo_ref: &RepoRef,
    token: Option<&str>,
) -> Result<Vec<u8>> {
    let mut url = Url::parse(api_base).with_context(|| format!("Invalid GitHub API base: {}", api_base))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("GitHub API base cannot have path segments"))?
        .pop_if_empty()
        .extend([
            "repos",
            repo_ref.owner.as_str(),
            repo_ref.repo.as_str(),
            "zipball",
            repo_ref.git_ref.as_str(),
        ]);

    let mut request = client.get(url).header("User-Agent", "repodoc");
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await.context("GitHub download failed")?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("GitHub download failed: {} {}", status.as_u16(), body);
    }

    Ok(response.bytes().await?.to_vec())
}

/// Size and count caps applied during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLimits {
    pub max_files: usize,
    pub max_file_bytes: usize,
    pub max_total_bytes: usize,
}

impl From<&SourceConfig> for SourceLimits {
    fn from(c: &SourceConfig) -> Self {
        Self {
            max_files: c.max_files,
            max_file_bytes: c.max_file_bytes,
            max_total_bytes: c.max_total_bytes,
        }
    }
}

/// Files extracted from an archive, plus the commit recovered from its folder name.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub files: Vec<FileEntry>,
    pub commit_sha: Option<String>,
}

/// Decides which repository paths are eligible.
pub struct PathFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl PathFilter {
    pub fn new() -> Result<Self> {
        let include: Vec<String> = ALLOWED_EXTENSIONS
            .iter()
            .map(|ext| format!("**/*.{}", ext))
            .collect();
        let exclude: Vec<String> = EXCLUDED_DIRS
            .iter()
            .map(|dir| format!("**/{}/**", dir))
            .collect();
        Ok(Self {
            include: build_globset(&include)?,
            exclude: build_globset(&exclude)?,
        })
    }

    pub fn allows(&self, path: &str) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
    }
    Ok(builder.build()?)
}

/// Null byte or missing newline within the first KiB.
pub fn is_likely_binary(data: &[u8]) -> bool {
    let prefix = &data[..data.len().min(BINARY_SNIFF_BYTES)];
    prefix.contains(&0) || !prefix.contains(&b'\n')
}

enum Flow {
    Continue,
    Stop,
}

/// Applies size, binary, and count rules while accumulating files.
struct Collector {
    limits: SourceLimits,
    files: Vec<FileEntry>,
    total: usize,
}

impl Collector {
    fn new(limits: SourceLimits) -> Self {
        Self {
            limits,
            files: Vec::new(),
            total: 0,
        }
    }

    fn offer(&mut self, path: String, data: &[u8]) -> Flow {
        if data.len() > self.limits.max_file_bytes || is_likely_binary(data) {
            return Flow::Continue;
        }
        let content = String::from_utf8_lossy(data);
        if content.trim().is_empty() {
            return Flow::Continue;
        }

        self.total += data.len();
        if self.total > self.limits.max_total_bytes {
            tracing::warn!(max_total_bytes = self.limits.max_total_bytes, "total size cap reached");
            return Flow::Stop;
        }

        self.files.push(FileEntry::from_text(path, content.into_owned(), data.len()));
        if self.files.len() >= self.limits.max_files {
            tracing::warn!(max_files = self.limits.max_files, "file count cap reached");
            return Flow::Stop;
        }
        Flow::Continue
    }
}

/// Extract eligible text files from a GitHub zipball.
///
/// Paths are reported relative to the archive's single top-level folder.
pub fn extract_text_files(zip_bytes: &[u8], limits: SourceLimits) -> Result<Extracted> {
    let filter = PathFilter::new()?;
    let mut archive = zip::ZipArchive::new(Cursor::new(zip_bytes)).context("Invalid zip archive")?;
    let mut collector = Collector::new(limits);
    let mut top_folder: Option<String> = None;

    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if top_folder.is_none() {
            top_folder = name.split_once('/').map(|(top, _)| top.to_string());
        }
        if entry.is_dir() {
            continue;
        }

        let path = match name.split_once('/') {
            Some((_, rest)) => rest.to_string(),
            None => name,
        };
        if path.is_empty() || !filter.allows(&path) {
            continue;
        }
        if entry.size() > limits.max_file_bytes as u64 {
            continue;
        }

        let mut data = Vec::new();
        entry
            .take(limits.max_file_bytes as u64 + 1)
            .read_to_end(&mut data)
            .with_context(|| format!("Failed to read {} from archive", path))?;

        if let Flow::Stop = collector.offer(path, &data) {
            break;
        }
    }

    Ok(Extracted {
        files: collector.files,
        commit_sha: top_folder.as_deref().and_then(commit_from_folder),
    })
}

/// GitHub names the archive folder `owner-repo-<short sha>`.
fn commit_from_folder(folder: &str) -> Option<String> {
    let (_, sha) = folder.rsplit_once('-')?;
    if sha.len() >= 7 && sha.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(sha.to_string())
    } else {
        None
    }
}

/// Collect eligible text files from a local checkout, in sorted path order.
pub fn scan_local_dir(root: &Path, limits: SourceLimits) -> Result<Vec<FileEntry>> {
    if !root.is_dir() {
        bail!("Source directory does not exist: {}", root.display());
    }
    let filter = PathFilter::new()?;
    let mut collector = Collector::new(limits);

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !EXCLUDED_DIRS.iter().any(|d| e.file_name().eq_ignore_ascii_case(d))
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root)?;
        let path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !filter.allows(&path) {
            continue;
        }
        if entry.metadata()?.len() > limits.max_file_bytes as u64 {
            continue;
        }

        let data = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        if let Flow::Stop = collector.offer(path, &data) {
            break;
        }
    }

    Ok(collector.files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn limits() -> SourceLimits {
        SourceLimits::from(&SourceConfig::default())
    }

    fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut w = zip::ZipWriter::new(&mut buf);
            let opts = SimpleFileOptions::default();
            w.add_directory("octo-demo-abc1234/", opts).unwrap();
            for (name, data) in entries {
                w.start_file(format!("octo-demo-abc1234/{}", name), opts).unwrap();
                w.write_all(data).unwrap();
            }
            w.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_parse_github_url_variants() {
        let r = parse_github_url("https://github.com/octo/demo").unwrap();
        assert_eq!(
            r,
            RepoRef {
                owner: "octo".into(),
                repo: "demo".into(),
                git_ref: "HEAD".into()
            }
        );
        let r = parse_github_url("https://github.com/octo/demo.git").unwrap();
        assert_eq!(r.repo, "demo");
        let r = parse_github_url("https://github.com/octo/demo/tree/v1.2/src").unwrap();
        assert_eq!(r.git_ref, "v1.2");
    }

    #[test]
    fn test_parse_github_url_rejects() {
        assert!(parse_github_url("https://gitlab.com/octo/demo").is_err());
        let err = parse_github_url("https://github.com/octo").unwrap_err();
        assert!(err.to_string().contains("/owner/repo"));
        assert!(parse_github_url("not a url").is_err());
    }

    #[test]
    fn test_path_filter() {
        let f = PathFilter::new().unwrap();
        assert!(f.allows("README.md"));
        assert!(f.allows("src/Main.RS"));
        assert!(f.allows(".env.example"));
        assert!(!f.allows("logo.png"));
        assert!(!f.allows("node_modules/left-pad/index.js"));
        assert!(!f.allows("web/dist/app.js"));
        assert!(!f.allows(".github/workflows/ci.yml"));
    }

    #[test]
    fn test_binary_heuristic() {
        assert!(is_likely_binary(b"abc\0def\n"));
        assert!(is_likely_binary(b"single line without newline"));
        assert!(!is_likely_binary(b"line one\nline two"));
    }

    #[test]
    fn test_extract_applies_filters() {
        let big = format!("{}\n", "x".repeat(600_000));
        let zip = zip_of(&[
            ("README.md", b"# Demo\nHello\n"),
            ("src/lib.rs", b"pub fn f() {}\n"),
            ("image.png", b"\x89PNG\n"),
            ("blank.txt", b"   \n  \n"),
            ("bin.txt", b"abc\0\n"),
            ("huge.txt", big.as_bytes()),
            ("node_modules/x/index.js", b"module.exports = 1;\n"),
        ]);
        let extracted = extract_text_files(&zip, limits()).unwrap();
        let paths: Vec<&str> = extracted.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/lib.rs"]);
        assert_eq!(extracted.commit_sha.as_deref(), Some("abc1234"));
        assert_eq!(extracted.files[0].lines, vec!["# Demo", "Hello", ""]);
        assert_eq!(extracted.files[0].size, 14);
    }

    #[test]
    fn test_extract_stops_at_file_cap() {
        let zip = zip_of(&[("a.md", b"a\n"), ("b.md", b"b\n"), ("c.md", b"c\n")]);
        let limits = SourceLimits {
            max_files: 2,
            ..limits()
        };
        assert_eq!(extract_text_files(&zip, limits).unwrap().files.len(), 2);
    }

    #[test]
    fn test_extract_stops_at_total_cap() {
        let zip = zip_of(&[("a.md", b"aaaa\n"), ("b.md", b"bbbb\n"), ("c.md", b"c\n")]);
        let limits = SourceLimits {
            max_total_bytes: 8,
            ..limits()
        };
        let files = extract_text_files(&zip, limits).unwrap().files;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "a.md");
    }

    #[test]
    fn test_commit_from_folder() {
        assert_eq!(commit_from_folder("octo-my-repo-0a1b2c3").as_deref(), Some("0a1b2c3"));
        assert_eq!(commit_from_folder("octo-demo-main"), None);
        assert_eq!(commit_from_folder("nodash"), None);
    }

    #[test]
    fn test_scan_local_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("README.md"), "# Local\nDocs\n").unwrap();
        std::fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
        std::fs::write(root.join("node_modules/pkg/index.js"), "x\n").unwrap();
        std::fs::write(root.join("photo.jpg"), "not really\n").unwrap();

        let files = scan_local_dir(root, limits()).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/main.rs"]);
    }

    #[test]
    fn test_scan_missing_dir() {
        assert!(scan_local_dir(Path::new("/nonexistent/repo"), limits()).is_err());
    }
}
