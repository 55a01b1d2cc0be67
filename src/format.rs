//! Display helpers for episode lists and the player

use chrono::{DateTime, Datelike, Utc};

use crate::model::PodcastEpisode;

/// Format seconds as `MM:SS`, or `HH:MM:SS` from one hour up
///
/// Fractions are truncated and negative or non-finite input reads as zero.
pub fn format_time(seconds: f64) -> String {
    let (hours, minutes, seconds) = split_seconds(seconds);

    if hours == 0 {
        format!("{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Remove markup from a feed description and decode its entities
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        text.push_str(&rest[..start]);
        let tag = &rest[start + 1..];

        // Only `<x` and `</x` open a tag; a lone `<` stays text
        let opens_tag = tag
            .trim_start_matches('/')
            .starts_with(|c: char| !c.is_whitespace() && c != '>');
        if !opens_tag {
            text.push('<');
            rest = tag;
            continue;
        }

        rest = match tag.find('>') {
            Some(end) => &tag[end + 1..],
            None => "",
        };
    }
    text.push_str(rest);

    html_escape::decode_html_entities(&text).into_owned()
}

/// Short progress label for an episode row
///
/// `"Played"` once completed, `"H:MM:SS remaining"` when partly played and
/// empty otherwise.
pub fn remaining_text(episode: &PodcastEpisode) -> String {
    if episode.is_completed {
        return "Played".to_string();
    }
    if episode.time == 0.0 {
        return String::new();
    }

    let (hours, minutes, seconds) = split_seconds(episode.duration - episode.time);
    format!("{hours}:{minutes:02}:{seconds:02} remaining")
}

/// Publishing date as `DD Month`, with the year appended unless it is `now`'s
pub fn release_date_text(published: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if published.year() == now.year() {
        published.format("%d %B").to_string()
    } else {
        published.format("%d %B %Y").to_string()
    }
}

fn split_seconds(seconds: f64) -> (u64, u64, u64) {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };

    (total / 3600, total % 3600 / 60, total % 60)
}
