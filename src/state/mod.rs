pub mod watchlist_store;

pub use watchlist_store::{MemoryWatchlist, WatchlistStore};
