use axum::{extract::State, Json};

use crate::database::AppState;
use crate::error::{ApiResult, StoreResultExt};
use crate::model::SweepReport;

/// Runs the orphan sweep on demand and reports what it removed
pub async fn sweep_orphans(State(state): State<AppState>) -> ApiResult<Json<SweepReport>> {
    let report = state.store.sweep_orphans().or_fail("Failed to sweep orphans")?;
    tracing::info!(
        orphan_chapters = report.orphan_chapters,
        dangling_index_entries = report.dangling_index_entries,
        "manual orphan sweep finished"
    );
    Ok(Json(report))
}
