pub mod backend;
pub mod mock;
pub mod provider;
pub mod realtime;

pub use backend::{ApiResponse, BackendClient, BackendError, BackendSource, Table};
pub use mock::MockSource;
pub use provider::{DataSourceStatus, PortfolioSource};
pub use realtime::{ChangeEvent, RealtimeFeed, RowChange};
