use shared::error::LoadError;
use storage::{queries, Database, ResultSet};

use crate::{dispatcher::UiDispatcher, scenes::WelcomeScene};

/// Loads the dates available for selection.
pub fn request_welcome<S, F>(dispatcher: &UiDispatcher<S>, database: &Database, on_done: F)
where
    S: 'static,
    F: FnOnce(&mut S, Result<WelcomeScene, LoadError>) + Send + 'static,
{
    let executor = dispatcher.executor().clone();
    let database = database.clone();
    dispatcher.dispatch_when_ready(
        async move {
            let rows = executor.submit(queries::available_dates(&database))?.await?;
            build_welcome_scene(&rows)
        },
        on_done,
    );
}

pub fn build_welcome_scene(rows: &ResultSet) -> Result<WelcomeScene, LoadError> {
    Ok(WelcomeScene {
        dates: queries::decode_dates(rows)?,
        loading: false,
    })
}
