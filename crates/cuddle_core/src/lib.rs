pub mod aggregator;
pub mod barrier;
pub mod config;
pub mod error;
pub mod memory;
pub mod notifications;
pub mod random;
pub mod registry;
pub mod scheduler;
pub mod section;

pub use crate::aggregator::{Completion, DataChanged, NotificationDataSource};
pub use crate::config::CuddleConfig;
pub use crate::memory::MemoryNotificationStore;
pub use crate::notifications::NotificationStore;
pub use crate::registry::SectionRegistry;
pub use crate::scheduler::{BatchReport, BatchScheduler, IdentifierPolicy};
pub use crate::section::{CellContent, SectionKey, SectionProvider, TableSection};
