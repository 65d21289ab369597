use migrate_core::{DeriveLinkedEntries, Entry, ScriptParams};
use serde_json::{json, Value};

pub const FILE: &str = file!();

/// Creates `author`, adds a reference field to `blog`, then turns each
/// blog entry's free-text `author_name` into a linked author entry.
pub async fn run(params: ScriptParams) -> anyhow::Result<()> {
    let author = params.migration.create_content_type(
        "author",
        json!({ "title": "Author", "description": "People who write for the blog" }),
    );
    author
        .create_field("title")
        .display_name("Name")
        .data_type("text")
        .mandatory(true)
        .unique(true);

    let blog = params.migration.edit_content_type("blog", json!({ "title": "Blog" }));
    blog.create_field("author")
        .display_name("Author")
        .data_type("reference")
        .reference_to(["author"])
        .ref_multiple(false);

    params.migration.derive_linked_entries(
        DeriveLinkedEntries::new("blog", ["author_name"], "author", "author").derive_entry(
            |entry, _locale| {
                let name = entry.get("author_name")?.as_str()?.trim();
                if name.is_empty() {
                    return None;
                }
                let mut author = Entry::default();
                author.set("title", Value::String(name.to_string()));
                Some(author)
            },
        ),
    );
    Ok(())
}
