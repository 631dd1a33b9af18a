//! Transport boundary: graph data retrieval and change notifications.

pub mod graph_api;
pub mod notifications;

pub use graph_api::{FetchCallback, GraphSource, XhrGraphSource};
pub use notifications::{Frame, NotificationChannel, parse_frame};
