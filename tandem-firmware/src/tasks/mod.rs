//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod app;
pub mod line;
pub mod transport;

pub use app::app_task;
pub use line::line_task;
pub use transport::transport_task;
