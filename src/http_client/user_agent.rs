//! User agent handling for registry requests.
//!
//! SEC fair-access rules require a descriptive agent with a contact address;
//! requests without one are throttled or refused.

pub const USER_AGENT: &str = "minefile/0.3 (mining filings research; set MINEFILE_USER_AGENT to include a contact email)";

/// Resolve the user agent from config; None uses [`USER_AGENT`].
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config.map(str::trim) {
        None | Some("") => USER_AGENT.to_string(),
        Some(custom) => custom.to_string(),
    }
}

/// Whether the agent carries a contact address.
pub fn has_contact(user_agent: &str) -> bool {
    user_agent
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')' || c == ';')
        .any(|token| {
            let mut parts = token.splitn(2, '@');
            matches!((parts.next(), parts.next()), (Some(user), Some(host)) if !user.is_empty() && host.contains('.'))
        })
}
