//! Notification message rendering.

use livewatch_core::traits::LiveAnnouncement;

/// Render the channel message for a live announcement.
///
/// `<@member> is now live on Twitch! **title**` followed by the channel URL
/// on its own line. The bold title is left out when there is none.
pub fn render_announcement(announcement: &LiveAnnouncement) -> String {
    let platform = announcement.platform;
    let mut message = format!(
        "<@{}> is now live on {}!",
        announcement.member,
        platform.display_name()
    );
    if let Some(title) = announcement
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        message.push_str(&format!(" **{}**", escape_markdown(title)));
    }
    message.push('\n');
    message.push_str(&platform.channel_url(&announcement.handle));
    message
}

fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '*' | '_' | '~' | '`' | '|' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use livewatch_core::types::{MemberId, Platform};

    use super::*;

    fn announcement(platform: Platform, handle: &str, title: Option<&str>) -> LiveAnnouncement {
        LiveAnnouncement {
            member: MemberId::new(1234),
            platform,
            handle: handle.into(),
            title: title.map(String::from),
        }
    }

    #[test]
    fn test_render_with_title() {
        let text = render_announcement(&announcement(
            Platform::Twitch,
            "alice",
            Some("Ranked grind"),
        ));
        assert_eq!(
            text,
            "<@1234> is now live on Twitch! **Ranked grind**\nhttps://twitch.tv/alice"
        );
    }

    #[test]
    fn test_render_without_title() {
        let text = render_announcement(&announcement(Platform::YouTube, "UC42", None));
        assert_eq!(
            text,
            "<@1234> is now live on YouTube!\nhttps://www.youtube.com/channel/UC42/live"
        );
    }

    #[test]
    fn test_title_markdown_is_escaped() {
        let text = render_announcement(&announcement(
            Platform::Twitch,
            "bob",
            Some("**not bold**"),
        ));
        assert!(text.contains(r"**\*\*not bold\*\***"));
    }
}
