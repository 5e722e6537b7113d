use axum::{
    extract::{Multipart, State},
    routing::post,
    Router,
    Json,
};
use bytes::Bytes;
use std::sync::Arc;
use crate::{
    AppState,
    error::AppError,
    models::{AnalysisResult, AskRequest, AskResponse, DatasetAnalysis},
    services::csv::{analyze_dataframe, load_csv},
};

const FILE_FIELD: &str = "file";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analyze", post(analyze_csv))
        .route("/ask", post(ask))
}

struct Upload {
    file_name: Option<String>,
    data: Bytes,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await?;
        return Ok(Upload { file_name, data });
    }
    Err(AppError::MissingFile)
}

#[axum::debug_handler]
async fn analyze_csv(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>, AppError> {
    let start = std::time::Instant::now();
    let upload = read_upload(&mut multipart).await?;
    tracing::info!(
        "Analyzing upload: {}, size: {}KB",
        upload.file_name.as_deref().unwrap_or("<unnamed>"),
        upload.data.len() / 1024
    );

    let analysis = tokio::task::spawn_blocking(move || -> Result<DatasetAnalysis, AppError> {
        let df = load_csv(upload.data)?;
        analyze_dataframe(&df)
    })
    .await
    .map_err(|e| AppError::Internal(format!("analysis task failed: {}", e)))??;

    tracing::info!(
        "Statistics computed in {:?}: {} rows, {} columns, {} numeric columns analyzed",
        start.elapsed(),
        analysis.row_count,
        analysis.columns.len(),
        analysis.reports.len()
    );

    let llm_summary = state.llm
        .summarize(&analysis.stats(), &analysis.trends(), &analysis.outliers())
        .await;

    tracing::info!("Total processing completed in {:?}", start.elapsed());

    Ok(Json(AnalysisResult::new(analysis, llm_summary)))
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Json<AskResponse> {
    tracing::info!("Answering question ({} chars)", request.question.len());
    let answer = state.llm.answer(&request.question, &request.context).await;
    Json(AskResponse { answer })
}
