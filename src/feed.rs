use crate::error::ScrapeError;
use crate::Showing;
use chrono::{Local, TimeZone};
use rss::{ChannelBuilder, Guid, ItemBuilder};

/// Generate an RSS feed with one item per showing
pub fn generate_rss(
    showings: &[Showing],
    channel_title: &str,
    channel_link: &str,
    channel_description: &str,
) -> Result<String, ScrapeError> {
    let mut items = Vec::new();

    for showing in showings {
        let mut description_parts = Vec::new();

        if !showing.cinema.is_empty() {
            description_parts.push(format!("Cinema: {}", showing.cinema));
        }
        if !showing.cert.is_empty() {
            description_parts.push(format!("Certificate: {}", showing.cert));
        }
        if !showing.runtime.is_empty() {
            description_parts.push(format!("Runtime: {}", showing.runtime));
        }
        if !showing.format.is_empty() {
            description_parts.push(format!("Format: {}", showing.format));
        }
        if !showing.tags.is_empty() {
            let tags: Vec<String> = showing
                .tags
                .iter()
                .map(|t| format!("{}: {}", t.kind, t.text))
                .collect();
            description_parts.push(format!("Tags: {}", tags.join(", ")));
        }
        if let Some(ratings) = showing.ratings.as_ref().filter(|r| r.is_scored()) {
            description_parts.push(format!("Score: {}/100", ratings.composite_score));
        }

        let description = if description_parts.is_empty() {
            format!("Film: {}", showing.title)
        } else {
            description_parts.join("<br/>\n")
        };

        let guid = Guid {
            value: format!("{}|{}|{}|{}", showing.cinema, showing.title, showing.date, showing.time),
            permalink: false,
        };

        // Unresolved dates and unreadable times get no pubDate
        let pub_date = showing
            .starts_at()
            .and_then(|start| Local.from_local_datetime(&start).earliest())
            .map(|start| start.to_rfc2822());

        let mut item_builder = ItemBuilder::default();
        item_builder.title(format!("{} - {} {}", showing.title, showing.date, showing.time));
        item_builder.link(channel_link.to_string());
        item_builder.description(description);
        item_builder.guid(guid);
        if let Some(date) = pub_date {
            item_builder.pub_date(date);
        }

        items.push(item_builder.build());
    }

    let channel = ChannelBuilder::default()
        .title(channel_title)
        .link(channel_link)
        .description(channel_description)
        .items(items)
        .build();

    let mut buf = Vec::new();
    channel
        .write_to(&mut buf)
        .map_err(|e| ScrapeError::Feed(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| ScrapeError::Feed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{aggregate, RawRatings};
    use crate::tags::{Tag, TagKind};
    use crate::{ShowDate, Source};

    #[test]
    fn test_feed_items() {
        let mut jaws = Showing::new("Jaws", "19:00", ShowDate::from_key("20250115"), Source::Structured);
        jaws.cinema = "The Light".to_string();
        jaws.cert = "12A".to_string();
        jaws.tags = vec![Tag::new(TagKind::Anniversary, "50th Anniversary")];
        jaws.ratings = Some(aggregate(&RawRatings {
            rotten_tomatoes: Some("97%".to_string()),
            ..Default::default()
        }));

        let xml = generate_rss(&[jaws], "Cinema Times", "https://example.com", "Listings").unwrap();
        let channel = rss::Channel::read_from(xml.as_bytes()).unwrap();
        assert_eq!(channel.title(), "Cinema Times");
        assert_eq!(channel.items().len(), 1);

        let item = &channel.items()[0];
        assert_eq!(item.title(), Some("Jaws - 2025-01-15 19:00"));
        assert!(item.pub_date().is_some());
        let description = item.description().unwrap();
        assert!(description.contains("Certificate: 12A"));
        assert!(description.contains("anniversary: 50th Anniversary"));
        assert!(description.contains("Score: 97/100"));
        assert!(!item.guid().unwrap().is_permalink());
    }

    #[test]
    fn test_unresolved_date_has_no_pub_date() {
        let showing = Showing::new("Alien", "21:00", ShowDate::from_key("bad"), Source::Structured);
        let xml = generate_rss(&[showing], "Cinema Times", "https://example.com", "Listings").unwrap();
        let channel = rss::Channel::read_from(xml.as_bytes()).unwrap();
        let item = &channel.items()[0];
        assert!(item.pub_date().is_none());
        assert_eq!(item.description(), Some("Film: Alien"));
    }
}
