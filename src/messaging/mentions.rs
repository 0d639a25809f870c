// src/messaging/mentions.rs
// @name token extraction from message content (spec §4.4). The markdown/
// text parsing itself is a boundary Non-goal; we only need the `@token`
// grammar, not a full markdown parser.

/// Extract `@name` or `@name@project_id` tokens from `content`. A token
/// starts at `@` and runs through ASCII alnum, `_`, `-`, and a single `@`
/// separating name from project id.
pub fn extract_mentions(content: &str) -> Vec<String> {
    let mut mentions = Vec::new();
    let bytes: Vec<char> = content.chars().collect();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == '@' && (i == 0 || !bytes[i - 1].is_alphanumeric()) {
            let start = i + 1;
            let mut j = start;
            let mut seen_second_at = false;
            while j < bytes.len() {
                let c = bytes[j];
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    j += 1;
                } else if c == '@' && !seen_second_at && j > start {
                    seen_second_at = true;
                    j += 1;
                } else {
                    break;
                }
            }
            if j > start {
                let token: String = bytes[start..j].iter().collect();
                mentions.push(token);
                i = j;
                continue;
            }
        }
        i += 1;
    }
    mentions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_and_scoped_mentions() {
        let mentions = extract_mentions("hey @alice and @bob@proj_alpha, check this");
        assert_eq!(mentions, vec!["alice", "bob@proj_alpha"]);
    }

    #[test]
    fn ignores_email_like_text_mid_word() {
        let mentions = extract_mentions("contact me at foo@bar.com");
        assert_eq!(mentions, Vec::<String>::new());
    }

    #[test]
    fn handles_mention_at_start_of_string() {
        let mentions = extract_mentions("@alice ping");
        assert_eq!(mentions, vec!["alice"]);
    }
}
