use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use fnd_core::{
    ArticleRequest, BatchItemResult, BatchRequest, Error, ImagePrediction, PredictionResult,
};
use fnd_inference::info::model_info as describe_model;
use fnd_inference::ocr::OcrStatus;
use fnd_inference::ImageUpload;

use crate::error::ApiError;
use crate::AppState;

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub result: PredictionResult,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItemResult>,
    pub total: usize,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    #[serde(flatten)]
    pub prediction: ImagePrediction,
    pub message: &'static str,
}

fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| Error::input(format!("Invalid JSON body: {}", rejection.body_text())).into())
}

pub async fn home(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.store().await;
    Json(json!({
        "status": "running",
        "message": "Fake News Detection API is active",
        "model_loaded": store.model_loaded(),
        "vectorizer_loaded": store.vectorizer_loaded(),
        "image_support": state.image_support(),
        "endpoints": {
            "text_analysis": "/api/predict",
            "batch_analysis": "/api/batch-predict",
            "image_analysis": "/api/predict-image",
            "model_info": "/api/model-info",
            "ocr_check": "/api/check-ocr",
            "reload": "/api/reload",
        }
    }))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<ArticleRequest>, JsonRejection>,
) -> ApiResult<Json<PredictResponse>> {
    let predictor = state.predictor().await;
    predictor.ensure_available()?;
    let result = predictor.predict_one(json_body(body)?)?;
    Ok(Json(PredictResponse {
        result,
        message: "Prediction completed successfully",
    }))
}

pub async fn batch_predict(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<BatchRequest>, JsonRejection>,
) -> ApiResult<Json<BatchResponse>> {
    let predictor = state.predictor().await;
    predictor.ensure_available()?;
    let entries = json_body(body)?.into_entries()?;
    let results = predictor.predict_batch(entries)?;
    Ok(Json(BatchResponse {
        total: results.len(),
        results,
        message: "Batch prediction completed",
    }))
}

pub async fn predict_image(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ImageResponse>> {
    let predictor = state.predictor().await;
    predictor.ensure_available()?;
    let mut multipart = multipart
        .map_err(|e| Error::input(format!("Expected a multipart form upload: {}", e.body_text())))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::input(format!("Invalid multipart body: {}", e.body_text())))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::input(format!("Could not read uploaded image: {}", e.body_text())))?;
        upload = Some(ImageUpload {
            filename,
            bytes: bytes.to_vec(),
        });
        break;
    }
    let upload = upload
        .ok_or_else(|| Error::input("No image file provided. Please upload an image file."))?;

    let prediction = state.image_pipeline(predictor).process(upload).await?;
    Ok(Json(ImageResponse {
        prediction,
        message: "Image analysis completed successfully",
    }))
}

pub async fn model_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.store().await;
    Json(describe_model(&store, state.image_support()))
}

pub async fn check_ocr(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(OcrStatus::from(state.ocr_resolution()))
}

pub async fn reload(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let store = state.reload().await?;
    let status = if store.is_available() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok((
        status,
        Json(json!({
            "available": store.is_available(),
            "model_loaded": store.model_loaded(),
            "vectorizer_loaded": store.vectorizer_loaded(),
            "failure_reason": store.failure_reason(),
        })),
    ))
}
