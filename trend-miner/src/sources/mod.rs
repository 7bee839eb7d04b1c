pub mod rotation;
pub mod rss_feed;

pub use rotation::FeedSelection;
pub use rss_feed::{RssTrendSource, StaticTrendSource};
