pub mod client;
pub mod fetcher;
pub mod window;

pub use crate::client::{DailyViews, PageviewError, PageviewProvider, WikimediaClient};
pub use crate::fetcher::PageviewFetcher;
