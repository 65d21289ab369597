use migrate_core::{ScriptParams, TransformEntries};
use serde_json::Value;

pub const FILE: &str = file!();

/// Sets every blog entry's `url` to `<url_prefix><slug of title>`.
/// `url_prefix` defaults to `/blog/`.
pub async fn run(params: ScriptParams) -> anyhow::Result<()> {
    let prefix = params
        .config
        .get_str("url_prefix")
        .unwrap_or("/blog/")
        .to_string();

    params.migration.transform_entries(
        TransformEntries::new("blog", move |entry, _locale| {
            let Some(title) = entry.get("title").and_then(Value::as_str) else {
                return false;
            };
            let url = format!("{prefix}{}", slugify(title));
            if entry.get("url").and_then(Value::as_str) == Some(url.as_str()) {
                return false;
            }
            entry.set("url", Value::String(url));
            true
        })
        .from_fields(["title"])
        .to_fields(["url"]),
    );
    Ok(())
}

fn slugify(title: &str) -> String {
    title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust 2024 -- what's new "), "rust-2024-what-s-new");
        assert_eq!(slugify("***"), "");
    }
}
