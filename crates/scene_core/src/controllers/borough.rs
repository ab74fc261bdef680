use shared::error::LoadError;
use storage::{queries, Database};

use crate::{dispatcher::UiDispatcher, gate::CommittedRange, scenes::BoroughDetailScene};

pub fn request_borough_detail<S, F>(
    dispatcher: &UiDispatcher<S>,
    database: &Database,
    committed: CommittedRange,
    borough: String,
    on_done: F,
) where
    S: 'static,
    F: FnOnce(&mut S, Result<BoroughDetailScene, LoadError>) + Send + 'static,
{
    let executor = dispatcher.executor().clone();
    let database = database.clone();
    dispatcher.dispatch_when_ready(
        async move {
            let rows = executor
                .submit(queries::borough_records(&database, committed.range, &borough))?
                .await?;
            Ok::<_, LoadError>(BoroughDetailScene {
                range: committed.range,
                generation: committed.generation,
                records: queries::decode_covid_records(&rows)?,
                borough,
            })
        },
        on_done,
    );
}
