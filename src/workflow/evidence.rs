// Evidence source resolution for submit requests.

use regex::Regex;
use std::sync::OnceLock;

use super::ValidationError;

/// An uploaded file as reported by the chat gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    /// Declared media type, e.g. `image/png`. Gateways omit it for some
    /// upload paths.
    pub content_type: Option<String>,
    pub filename: String,
}

fn image_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\.(png|jpe?g|gif|webp|bmp)(\?\S*)?$")
            .expect("image extension pattern is valid")
    })
}

/// Picks the single evidence source out of an explicit URL and the
/// attachment list, validating that it points at an image. Exactly one
/// source must be present.
pub(crate) fn resolve_evidence(
    evidence_url: Option<&str>,
    attachments: &[Attachment],
) -> Result<String, ValidationError> {
    match (evidence_url, attachments) {
        (None, []) => Err(ValidationError::MissingEvidence),
        (Some(_), [_, ..]) => Err(ValidationError::ConflictingEvidence),
        (Some(url), []) => {
            if image_url_pattern().is_match(url.trim()) {
                Ok(url.trim().to_string())
            } else {
                Err(ValidationError::NotAnImageUrl {
                    url: url.to_string(),
                })
            }
        }
        (None, [attachment]) => {
            let content_type = attachment.content_type.as_deref().unwrap_or("");
            if content_type.starts_with("image/") {
                Ok(attachment.url.clone())
            } else {
                Err(ValidationError::NotAnImageAttachment {
                    content_type: if content_type.is_empty() {
                        "unknown".to_string()
                    } else {
                        content_type.to_string()
                    },
                })
            }
        }
        (None, _) => Err(ValidationError::TooManyAttachments),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_attachment() -> Attachment {
        Attachment {
            url: "https://cdn.example/upload/1.png".to_string(),
            content_type: Some("image/png".to_string()),
            filename: "1.png".to_string(),
        }
    }

    #[test]
    fn accepts_image_urls_case_insensitively() {
        assert!(resolve_evidence(Some("http://x.com/a.png"), &[]).is_ok());
        assert!(resolve_evidence(Some("http://x.com/a.JPEG"), &[]).is_ok());
        assert!(resolve_evidence(Some("http://x.com/a.webp?w=640"), &[]).is_ok());
    }

    #[test]
    fn rejects_non_image_urls() {
        let err = resolve_evidence(Some("http://x.com/a.pdf"), &[]).unwrap_err();
        assert!(matches!(err, ValidationError::NotAnImageUrl { .. }));
        assert!(matches!(
            resolve_evidence(Some("http://x.com/png"), &[]),
            Err(ValidationError::NotAnImageUrl { .. })
        ));
    }

    #[test]
    fn accepts_a_single_image_attachment() {
        let evidence = resolve_evidence(None, &[png_attachment()]).unwrap();
        assert_eq!(evidence, "https://cdn.example/upload/1.png");
    }

    #[test]
    fn rejects_attachment_without_image_media_type() {
        let mut attachment = png_attachment();
        attachment.content_type = Some("application/pdf".to_string());
        assert!(matches!(
            resolve_evidence(None, &[attachment]),
            Err(ValidationError::NotAnImageAttachment { .. })
        ));

        let mut unknown = png_attachment();
        unknown.content_type = None;
        assert!(matches!(
            resolve_evidence(None, &[unknown]),
            Err(ValidationError::NotAnImageAttachment { .. })
        ));
    }

    #[test]
    fn requires_exactly_one_source() {
        assert!(matches!(
            resolve_evidence(None, &[]),
            Err(ValidationError::MissingEvidence)
        ));
        assert!(matches!(
            resolve_evidence(Some("http://x.com/a.png"), &[png_attachment()]),
            Err(ValidationError::ConflictingEvidence)
        ));
        assert!(matches!(
            resolve_evidence(None, &[png_attachment(), png_attachment()]),
            Err(ValidationError::TooManyAttachments)
        ));
    }
}
