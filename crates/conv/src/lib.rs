pub mod api;
pub mod cache;
pub mod command;
pub mod config;
pub mod entry;
pub mod error;
pub mod executor;
pub mod listing;
pub mod media;
pub mod resolver;
pub mod scan;

pub use api::{MetadataSource, Owner, VideoInfoClient};
pub use cache::OwnerCache;
pub use command::{Command, Invocation};
pub use config::ConvConfig;
pub use entry::{EntryDescriptor, VideoInfo};
pub use error::{ConvError, ConvResult};
pub use executor::{Dispatcher, Executor, PrintDispatcher, ReplaceDispatcher};
pub use media::MediaType;
pub use resolver::Resolver;
pub use scan::{ScanSummary, Scanner};
