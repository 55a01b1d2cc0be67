mod episode;
mod feed;
mod listen;
mod podcast;

pub use episode::PodcastEpisode;
pub use feed::PodcastFeed;
pub use listen::Listen;
pub use podcast::{Category, Podcast};
