//! Scene controllers. Each one submits its queries to the executor, builds
//! its scene off the UI thread, and hands the result to a UI callback.

pub mod borough;
pub mod graph;
pub mod map;
pub mod statistics;
pub mod welcome;

pub use borough::request_borough_detail;
pub use graph::{request_bar_chart, request_graph, request_line_chart};
pub use map::request_map;
pub use statistics::request_stats;
pub use welcome::request_welcome;
