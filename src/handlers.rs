// src/handlers.rs
use crate::project::Project;
use crate::services::convert_to_project_data;
use crate::{AppState, errors::StitchyError};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures_util::TryStreamExt;
use log::{error, info};
use serde::Deserialize;
use uuid::Uuid;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/generate", web::post().to(start_generation))
            .route("/jobs/{job_id}", web::get().to(get_job))
            .route("/projects", web::get().to(list_projects))
            .route("/projects/{project_id}", web::get().to(get_project))
            .route("/projects/{project_id}", web::delete().to(delete_project))
            .route(
                "/projects/{project_id}/rows/{row_id}",
                web::put().to(update_row),
            ),
    )
    .route("/health", web::get().to(health_check));
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "stitchy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Accepts a photo upload and starts a generation job in the background.
pub async fn start_generation(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let mut image_data = Vec::new();

    if let Some(mut field) = payload.try_next().await? {
        while let Some(chunk) = field.try_next().await? {
            if image_data.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(StitchyError::Validation(format!(
                    "Upload exceeds {} bytes",
                    MAX_UPLOAD_BYTES
                ))
                .into());
            }
            image_data.extend_from_slice(&chunk);
        }
    }

    if image_data.is_empty() {
        return Err(StitchyError::Validation("No image provided".to_string()).into());
    }

    let image_reference = data.image_processor.prepare_for_analysis(&image_data)?;

    let job_id = data.jobs.create();
    info!("Starting generation job {}", job_id);

    let state = data.get_ref().clone();
    actix_web::rt::spawn(async move {
        run_generation(state, job_id, image_reference).await;
    });

    Ok(HttpResponse::Accepted().json(serde_json::json!({
        "job_id": job_id,
        "status_url": format!("/api/v1/jobs/{}", job_id)
    })))
}

async fn run_generation(state: AppState, job_id: Uuid, image_reference: String) {
    let observer = state.jobs.observer(job_id);

    // failures are already recorded on the job by the observer
    let Ok(result) = state
        .pipeline
        .generate_project_from_image(&image_reference, &observer)
        .await
    else {
        return;
    };

    let project = Project::from_data(convert_to_project_data(&result));
    match state.redis_service.store_project(&project).await {
        Ok(()) => {
            info!("Job {} stored project {}", job_id, project.id);
            state.jobs.set_project(job_id, project.id);
        }
        Err(e) => {
            error!("Job {} could not store project: {}", job_id, e);
            state.jobs.fail(job_id, &e);
        }
    }
}

pub async fn get_job(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let job_id = path.into_inner();

    let status = data
        .jobs
        .get(&job_id)
        .ok_or_else(|| StitchyError::NotFound(format!("job {}", job_id)))?;

    Ok(HttpResponse::Ok().json(&status))
}

pub async fn list_projects(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let projects = data.redis_service.list_projects().await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "projects": projects,
        "count": projects.len()
    })))
}

pub async fn get_project(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let project = data.redis_service.get_project(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(&project))
}

pub async fn delete_project(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.redis_service.delete_project(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
pub struct RowUpdate {
    pub completed: bool,
}

pub async fn update_row(
    path: web::Path<(Uuid, String)>,
    data: web::Data<AppState>,
    body: web::Json<RowUpdate>,
) -> Result<HttpResponse, Error> {
    let (project_id, row_id) = path.into_inner();

    let project = data
        .redis_service
        .set_row_completed(&project_id, &row_id, body.completed)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "project_id": project.id,
        "row_id": row_id,
        "completed": body.completed,
        "progress_percentage": project.progress_percentage,
        "status": project.status
    })))
}
