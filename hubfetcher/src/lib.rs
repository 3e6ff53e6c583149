pub mod client;
pub mod fetcher;

pub use crate::client::{HubClient, HubError, HubModel, ListingQuery, ModelListing};
pub use crate::fetcher::HubFetcher;
