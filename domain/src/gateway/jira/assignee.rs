//! Matching a free-text assignee against Jira users.

use crate::integration::Member;

/// Name tokens that mark service accounts rather than people.
const NON_HUMAN_TOKENS: [&str; 6] = ["bot", "automation", "app", "addon", "integration", "system"];

/// Account id prefixes used by Atlassian apps and automation.
const NON_HUMAN_ID_PREFIXES: [&str; 2] = ["557058:", "qm:"];

/// Jira Cloud account ids are long opaque strings, often containing `:`.
pub(crate) fn is_account_id(value: &str) -> bool {
    value.len() >= 20 || value.contains(':')
}

/// First member whose display name equals `query`, then starts with it, then contains
/// it. Case-insensitive.
pub(crate) fn best_match<'a>(query: &str, members: &'a [Member]) -> Option<&'a Member> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    let names: Vec<(String, &Member)> = members
        .iter()
        .filter_map(|m| m.display_name.as_ref().map(|n| (n.to_lowercase(), m)))
        .collect();

    let matchers: [fn(&str, &str) -> bool; 3] = [
        |name, query| name == query,
        |name, query| name.starts_with(query),
        |name, query| name.contains(query),
    ];

    matchers.iter().find_map(|matches| {
        names
            .iter()
            .find(|(name, _)| matches(name, &query))
            .map(|(_, member)| *member)
    })
}

/// False for apps, bots and other non-`atlassian` accounts.
pub(crate) fn is_human(member: &Member) -> bool {
    if let Some(account_type) = &member.account_type {
        if account_type != "atlassian" {
            return false;
        }
    }

    if NON_HUMAN_ID_PREFIXES
        .iter()
        .any(|prefix| member.id.starts_with(prefix))
    {
        return false;
    }

    let name = member.display_name.as_deref().unwrap_or_default().to_lowercase();
    !name
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| NON_HUMAN_TOKENS.contains(&token))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, name: &str) -> Member {
        Member {
            id: id.to_string(),
            display_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_opaque_ids_are_recognized() {
        assert!(is_account_id("5b10ac8d82e05b22cc7d4ef5"));
        assert!(is_account_id("712020:3f1c2d"));
        assert!(!is_account_id("Alice"));
    }

    #[test]
    fn test_exact_match_beats_prefix_and_substring() {
        let members = vec![
            member("1", "Annabel Lee"),
            member("2", "Ann Smith"),
            member("3", "Ann"),
        ];
        assert_eq!(best_match("ann", &members).map(|m| m.id.as_str()), Some("3"));
    }

    #[test]
    fn test_prefix_beats_substring() {
        let members = vec![member("1", "Joanna Ray"), member("2", "Anna Bell")];
        assert_eq!(best_match("Anna", &members).map(|m| m.id.as_str()), Some("2"));
        assert_eq!(best_match("ray", &members).map(|m| m.id.as_str()), Some("1"));
    }

    #[test]
    fn test_no_match_is_none() {
        let members = vec![member("1", "Alice")];
        assert!(best_match("bob", &members).is_none());
        assert!(best_match("  ", &members).is_none());
    }

    #[test]
    fn test_non_human_accounts_are_filtered() {
        assert!(is_human(&member("abc", "Alice Doe")));
        assert!(!is_human(&member("abc", "Deploy Bot")));
        assert!(!is_human(&member("abc", "Jira Automation")));
        assert!(!is_human(&member("557058:f58131cb", "Alice")));
        assert!(!is_human(&member("qm:1234", "Alice")));

        let mut app = member("abc", "Alice");
        app.account_type = Some("app".to_string());
        assert!(!is_human(&app));

        // "Botticelli" is not the token "bot"
        assert!(is_human(&member("abc", "Sandro Botticelli")));
    }
}
