/// Envelope and error-body parsing against payloads shaped like the ones the
/// content management API returns.
#[cfg(test)]
mod unit {
    use crate::types::{ContentTypeEnvelope, EntriesPage, ErrorBody, LocalesEnvelope};
    use crate::{connect, DEFAULT_HOST};
    use migrate_core::StackSettings;

    #[test]
    fn parse_content_type_envelope() {
        let json = r#"{
            "content_type": {
                "uid": "author",
                "title": "Author",
                "description": "",
                "options": { "singleton": false, "is_page": false, "title": "title" },
                "schema": [
                    {
                        "uid": "title",
                        "display_name": "Name",
                        "data_type": "text",
                        "mandatory": true,
                        "unique": true
                    },
                    {
                        "uid": "posts",
                        "display_name": "Posts",
                        "data_type": "reference",
                        "reference_to": ["blog"]
                    }
                ],
                "_version": 4
            }
        }"#;
        let envelope: ContentTypeEnvelope = serde_json::from_str(json).unwrap();
        let ct = envelope.content_type;
        assert_eq!(ct.uid, "author");
        assert_eq!(ct.schema.len(), 2);
        assert!(ct.has_field("posts"));
        assert_eq!(ct.extra["_version"], 4);
    }

    #[test]
    fn parse_locales_with_fallbacks() {
        let json = r#"{
            "locales": [
                { "code": "en-us", "name": "English - United States", "fallback_locale": null },
                {
                    "code": "fr-fr",
                    "name": "French - France",
                    "fallback_locale": "en-us",
                    "uid": "blt1"
                }
            ]
        }"#;
        let envelope: LocalesEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.locales.len(), 2);
        assert_eq!(envelope.locales[0].fallback_locale, None);
        assert_eq!(envelope.locales[1].fallback_locale.as_deref(), Some("en-us"));
    }

    #[test]
    fn entries_page_without_count() {
        let page: EntriesPage =
            serde_json::from_str(r#"{ "entries": [{ "uid": "e1", "title": "Hello" }] }"#).unwrap();
        assert_eq!(page.count, None);
        assert_eq!(page.entries[0].uid(), Some("e1"));
    }

    #[test]
    fn error_body_prefers_error_message() {
        let body: ErrorBody = serde_json::from_str(
            r#"{ "error_message": "Access denied.", "error_code": 161 }"#,
        )
        .unwrap();
        let err = body.into_api_error(401, "ignored");
        assert_eq!(err.status, Some(401));
        assert_eq!(err.message, "Access denied.");
        assert_eq!(err.code, Some(161));
        assert_eq!(err.errors, None);
    }

    #[test]
    fn empty_error_body_uses_status() {
        let err = ErrorBody::default().into_api_error(500, "   ");
        assert_eq!(err.message, "request failed with status 500");
    }

    #[test]
    fn connect_defaults_to_public_host() {
        let client = connect(None, &StackSettings::new("blt_key")).unwrap();
        assert_eq!(client.base_url(), DEFAULT_HOST);
    }
}
