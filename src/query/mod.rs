pub mod locations;
pub mod pager;
pub mod search;

pub use locations::{LocationIndex, LocationIndexer, LocationList, LOCATION_INDEX_KEY};
pub use pager::{paginate, Page, Pagination};
pub use search::{SearchEngine, SearchRequest, SearchResponse, TaggedListing};
