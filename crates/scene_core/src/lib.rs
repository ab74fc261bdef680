//! Asynchronous scene loading for the London COVID-19 dashboard.
//!
//! Queries run on a bounded worker pool ([`executor`]); their results come
//! back to the single UI thread through [`dispatcher`]. The [`gate`] holds
//! date-dependent scenes until a valid range is chosen, and the [`registry`]
//! caches finished scenes. [`app::Application`] wires it all together.

pub mod app;
pub mod controllers;
pub mod dispatcher;
pub mod executor;
pub mod gate;
pub mod registry;
pub mod scenes;

pub use app::{AppState, Application};
pub use dispatcher::{ui_channel, UiDispatcher, UiQueue};
pub use executor::{AsyncExecutor, AsyncHandle, ExecutorConfig, ExecutorHandle};
pub use gate::{CommittedRange, DateRangeGate, GateListener, GateState, GateTransition};
pub use registry::SceneRegistry;
pub use scenes::Scene;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
