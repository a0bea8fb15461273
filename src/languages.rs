//! Filename-extension -> language lookup (§1: explicitly an external
//! collaborator). Kept intentionally small; it's a boundary the ingestor
//! calls through, not a target of this crate's engineering.

/// Map a changed filename to a language name, or `None` for extensions the
/// table doesn't recognize (dotfiles, extensionless files, binaries).
pub fn language_for_filename(path: &str) -> Option<&'static str> {
    let ext = path.rsplit('.').next()?;
    if ext == path {
        return None;
    }
    Some(match ext.to_ascii_lowercase().as_str() {
        "rs" => "Rust",
        "py" => "Python",
        "js" | "mjs" | "cjs" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "go" => "Go",
        "java" => "Java",
        "kt" | "kts" => "Kotlin",
        "rb" => "Ruby",
        "c" | "h" => "C",
        "cpp" | "cc" | "cxx" | "hpp" => "C++",
        "cs" => "C#",
        "php" => "PHP",
        "swift" => "Swift",
        "sh" | "bash" => "Shell",
        "html" | "htm" => "HTML",
        "css" | "scss" | "sass" => "CSS",
        "md" | "markdown" => "Markdown",
        "yml" | "yaml" => "YAML",
        "json" => "JSON",
        "toml" => "TOML",
        "sql" => "SQL",
        _ => return None,
    })
}
