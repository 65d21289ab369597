use migrate_core::{SchemaOptionsSetter, ScriptParams};
use serde_json::json;

pub const FILE: &str = file!();

/// `blog_title` in the script config overrides the display title.
pub async fn run(params: ScriptParams) -> anyhow::Result<()> {
    let title = params.config.get_str("blog_title").unwrap_or("Blog");
    let blog = params.migration.create_content_type(
        "blog",
        json!({ "title": title, "description": "Articles published on the site" }),
    );
    blog.is_page(true);

    blog.create_field("title")
        .display_name("Title")
        .data_type("text")
        .mandatory(true)
        .unique(true);
    blog.create_field("body")
        .display_name("Body")
        .data_type("text")
        .field_metadata("multiline", true);
    blog.create_field("url")
        .display_name("URL")
        .data_type("text")
        .unique(true)
        .field_metadata("_default", true);
    blog.create_field("author_name")
        .display_name("Author")
        .data_type("text");

    blog.move_field("url").after_field("title")?;
    Ok(())
}
