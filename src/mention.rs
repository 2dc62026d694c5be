//! User mention resolution
//!
//! Message content carries user references as `<@1234567890>`. Overlays
//! want readable names, so each token is swapped for `@name` at read time.
//! Lookups that fail leave the token as it was.

use std::ops::Range;
use std::sync::LazyLock;

use futures::future::join_all;
use regex::Regex;

use crate::platform::UserDirectory;

static USER_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@([0-9]+)>").expect("mention pattern is valid"));

/// A mention token found in message content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention<'a> {
    /// Byte span of the whole token, brackets included
    pub span: Range<usize>,
    /// The referenced user ID
    pub user_id: &'a str,
}

/// Locate every user mention token, left to right and non-overlapping
pub fn find_mentions(content: &str) -> Vec<Mention<'_>> {
    USER_MENTION
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let id = caps.get(1)?;
            Some(Mention {
                span: whole.range(),
                user_id: id.as_str(),
            })
        })
        .collect()
}

/// Replace every mention token with `@<display name>`.
///
/// Lookups run concurrently. A failed lookup keeps the original token and is
/// logged; this function never fails.
pub async fn resolve_mentions<D>(content: &str, directory: &D) -> String
where
    D: UserDirectory + ?Sized,
{
    let mentions = find_mentions(content);
    if mentions.is_empty() {
        return content.to_string();
    }

    let names = join_all(
        mentions
            .iter()
            .map(|m| directory.display_name(m.user_id)),
    )
    .await;

    let mut resolved = String::with_capacity(content.len());
    let mut cursor = 0;
    for (mention, name) in mentions.iter().zip(names) {
        resolved.push_str(&content[cursor..mention.span.start]);
        match name {
            Ok(name) => {
                resolved.push('@');
                resolved.push_str(&name);
            }
            Err(e) => {
                tracing::warn!("Error fetching user {}: {}", mention.user_id, e);
                resolved.push_str(&content[mention.span.clone()]);
            }
        }
        cursor = mention.span.end;
    }
    resolved.push_str(&content[cursor..]);

    resolved
}
