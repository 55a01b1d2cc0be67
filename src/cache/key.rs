use std::fmt;

const POSITION_SUFFIX: &str = "|position";
const CURRENT_SUFFIX: &str = "|current";
const CATEGORIES_SUFFIX: &str = "|categories";
const PODCASTS_SUFFIX: &str = "|podcasts";
const FEED_SUFFIX: &str = "|feed";

/// Named grouping a list of podcasts is cached under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Top,
    Category(i64),
    Subscriptions,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Top => f.write_str("top"),
            Bucket::Category(id) => write!(f, "{id}"),
            Bucket::Subscriptions => f.write_str("subscriptions"),
        }
    }
}

/// A key in the flat cache namespace
///
/// Every key renders as `<identifier><suffix>`; the suffix tells record
/// types apart. Singletons have an empty identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Categories,
    Podcasts(Bucket),
    Feed(String),
    Position(String),
    CurrentEpisode,
}

impl CacheKey {
    pub fn feed(rss_url: impl Into<String>) -> Self {
        CacheKey::Feed(rss_url.into())
    }

    pub fn position(episode_url: impl Into<String>) -> Self {
        CacheKey::Position(episode_url.into())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Categories => f.write_str(CATEGORIES_SUFFIX),
            CacheKey::Podcasts(bucket) => write!(f, "{bucket}{PODCASTS_SUFFIX}"),
            CacheKey::Feed(rss_url) => write!(f, "{rss_url}{FEED_SUFFIX}"),
            CacheKey::Position(episode_url) => write!(f, "{episode_url}{POSITION_SUFFIX}"),
            CacheKey::CurrentEpisode => f.write_str(CURRENT_SUFFIX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_keys_are_bare_suffixes() {
        assert_eq!(CacheKey::Categories.to_string(), "|categories");
        assert_eq!(CacheKey::CurrentEpisode.to_string(), "|current");
    }

    #[test]
    fn bucket_keys_use_bucket_name() {
        assert_eq!(CacheKey::Podcasts(Bucket::Top).to_string(), "top|podcasts");
        assert_eq!(
            CacheKey::Podcasts(Bucket::Category(12)).to_string(),
            "12|podcasts"
        );
        assert_eq!(
            CacheKey::Podcasts(Bucket::Subscriptions).to_string(),
            "subscriptions|podcasts"
        );
    }

    #[test]
    fn url_keys_keep_identifier_verbatim() {
        assert_eq!(
            CacheKey::feed("https://example.com/feed.xml").to_string(),
            "https://example.com/feed.xml|feed"
        );
        assert_eq!(
            CacheKey::position("https://example.com/ep1.mp3").to_string(),
            "https://example.com/ep1.mp3|position"
        );
    }

    #[test]
    fn same_identifier_with_different_suffix_does_not_collide() {
        assert_ne!(
            CacheKey::feed("x").to_string(),
            CacheKey::position("x").to_string()
        );
    }
}
