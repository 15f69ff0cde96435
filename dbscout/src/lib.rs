pub mod config;
pub mod directory;
pub mod errors;
pub mod index;
pub mod metrics;
pub mod parsers;
pub mod results;
pub mod search;

pub use config::{ConfigOverrides, SearchConfig};
pub use directory::{DirectoryEntry, DirectoryProvider, FsDirectory};
pub use errors::{SearchError, SearchResult};
pub use index::FileIndex;
pub use metrics::{MetricsSnapshot, SearchMetrics};
pub use results::{format_size, FileDescriptor, FileFormat, SearchMatch, SearchOutput, SearchStats};
pub use search::SearchEngine;
