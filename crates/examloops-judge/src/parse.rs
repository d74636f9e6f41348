//! Extraction of JSON payloads from free-form model replies.

/// Outcome of looking for a `<tag>...</tag>` block
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Block<'a> {
    Found(&'a str),
    Malformed,
    Missing,
}

pub(crate) fn tagged_block<'a>(output: &'a str, tag: &str) -> Block<'a> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    // Models sometimes restate the format before answering; the last block wins.
    match (output.rfind(&open), output.rfind(&close)) {
        (Some(start), Some(end)) if start < end => {
            Block::Found(strip_fence(output[start + open.len()..end].trim()))
        }
        (Some(_), _) | (_, Some(_)) => Block::Malformed,
        (None, None) => Block::Missing,
    }
}

/// Fallback when no tagged block exists: a reply that is itself one JSON object
pub(crate) fn bare_object(output: &str) -> Option<&str> {
    let body = strip_fence(output.trim());
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

fn strip_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_block_found() {
        let out = "analysis...\n<verdict>\n{\"a\": 1}\n</verdict>\n";
        assert_eq!(tagged_block(out, "verdict"), Block::Found("{\"a\": 1}"));
    }

    #[test]
    fn test_last_block_wins() {
        let out = "<verdict>{\"a\": 0}</verdict> then <verdict>{\"a\": 2}</verdict>";
        assert_eq!(tagged_block(out, "verdict"), Block::Found("{\"a\": 2}"));
    }

    #[test]
    fn test_fenced_block() {
        let out = "<question>\n```json\n{\"q\": 1}\n```\n</question>";
        assert_eq!(tagged_block(out, "question"), Block::Found("{\"q\": 1}"));
    }

    #[test]
    fn test_unclosed_block_is_malformed() {
        assert_eq!(tagged_block("<verdict>{}", "verdict"), Block::Malformed);
        assert_eq!(tagged_block("no tags here", "verdict"), Block::Missing);
    }

    #[test]
    fn test_bare_object() {
        assert_eq!(bare_object("```json\n{\"x\": 1}\n```"), Some("{\"x\": 1}"));
        assert_eq!(bare_object("Sure! {\"x\": 1} done"), Some("{\"x\": 1}"));
        assert_eq!(bare_object("nothing"), None);
    }
}
