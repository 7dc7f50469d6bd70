pub mod aggregator;
pub mod filesystem;
pub mod partition;

pub use aggregator::PartitionAggregator;
pub use filesystem::{BlobStore, BlobStoreClient, FilesystemError, VersionedObject, WritePrecondition};
pub use partition::{build_key, kind_prefix, sanitize, PartitionKey};
