use migrate_core::ScriptParams;
use serde_json::json;

pub const FILE: &str = file!();

pub async fn run(params: ScriptParams) -> anyhow::Result<()> {
    let blog = params.migration.edit_content_type("blog", json!({ "title": "Blog" }));
    blog.description("Articles and announcements");

    blog.create_field("summary")
        .display_name("Summary")
        .data_type("text")
        .field_metadata("multiline", true);
    blog.edit_field("title").display_name("Headline");

    blog.move_field("summary").after_field("title")?;
    Ok(())
}
