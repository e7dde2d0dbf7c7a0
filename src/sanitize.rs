//! Content sanitizer seam
//!
//! Posted message content is rich text restricted to a small tag
//! allow-list with no attributes; everything else is stripped, not
//! escaped. The sanitizer itself is a collaborator contract — production
//! deployments inject their own — but the crate ships [`BasicSanitizer`],
//! a conservative tag-level filter, as the default and for tests.

/// Tags allowed in posted chat content
///
/// Inline emphasis, lists, and preformatted blocks. Attributes are never
/// allowed on any tag.
pub const ALLOWED_TAGS: &[&str] = &["ul", "ol", "b", "i", "em", "strike", "pre", "strong", "li"];

/// Tags whose inner content is discarded along with the tag itself
///
/// Matches the conventional sanitizer treatment of non-text containers:
/// dropping a `<script>` tag but keeping its body would leak the payload
/// as visible text.
const NON_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "option"];

/// Collaborator contract for rich-text sanitization
pub trait Sanitizer: Send + Sync {
    /// Return `html` restricted to `allowed_tags`
    ///
    /// Disallowed tags are stripped (not escaped); attributes are dropped
    /// even on allowed tags.
    fn sanitize(&self, html: &str, allowed_tags: &[&str]) -> String;
}

/// Conservative tag-level allow-list filter
///
/// Scans for `<...>` tokens: allowed tags are re-emitted bare (attributes
/// dropped), disallowed tags are removed, and the content of non-text
/// containers (`script`, `style`, ...) is removed with them. Text outside
/// tags and malformed tag fragments pass through untouched. This is a
/// tag-level filter, not a full HTML sanitizer — embedders with stricter
/// requirements should inject their own [`Sanitizer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicSanitizer;

impl Sanitizer for BasicSanitizer {
    fn sanitize(&self, html: &str, allowed_tags: &[&str]) -> String {
        let mut out = String::with_capacity(html.len());
        let mut rest = html;

        while let Some(open) = rest.find('<') {
            out.push_str(&rest[..open]);
            rest = &rest[open..];

            let Some(close) = rest.find('>') else {
                // No closing bracket until end of input: not a tag
                out.push_str(rest);
                return out;
            };

            let body = &rest[1..close];
            let (is_closing, body) = match body.strip_prefix('/') {
                Some(stripped) => (true, stripped),
                None => (false, body),
            };

            // A bracket not followed by a tag name is ordinary text
            if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
                out.push('<');
                rest = &rest[1..];
                continue;
            }

            rest = &rest[close + 1..];

            let name: String = body
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase();

            if allowed_tags.iter().any(|tag| *tag == name) {
                // Re-emit bare: attributes are never allowed
                if is_closing {
                    out.push_str("</");
                } else {
                    out.push('<');
                }
                out.push_str(&name);
                out.push('>');
            } else if !is_closing && NON_TEXT_TAGS.iter().any(|tag| *tag == name) {
                // Drop the container's content along with the tag
                let closing = format!("</{}", name);
                match rest.to_ascii_lowercase().find(&closing) {
                    Some(end) => {
                        let after = &rest[end..];
                        rest = match after.find('>') {
                            Some(gt) => &after[gt + 1..],
                            None => "",
                        };
                    }
                    None => rest = "",
                }
            }
            // Any other tag token is stripped; its surrounding text stays
        }

        out.push_str(rest);
        out
    }
}
