use crate::data::{Conflict, Room, ScheduleEntry, SchedulingInput, SchedulingOutput, UnscheduledClass};
use crate::reconcile::{Mode, Placement, ReconcileError, Reassignment, Timetable};
use crate::solver;
use crate::verify::verify;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use clap::Parser;
use log::info;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Server settings, from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "section_scheduler", about = "Section timetabling service")]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "SCHEDULER_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: SocketAddr,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub entries: Vec<ScheduleEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub conflicts: Vec<Conflict>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceAssignRequest {
    pub timetable: Timetable,
    #[serde(default)]
    pub rooms: Vec<Room>,
    pub conflict: UnscheduledClass,
    pub placement: Placement,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignRequest {
    pub timetable: Timetable,
    #[serde(default)]
    pub rooms: Vec<Room>,
    pub conflict: Conflict,
    pub entry_index: usize,
    #[serde(default)]
    pub change: Reassignment,
    #[serde(default)]
    pub forced: bool,
}

async fn solve_handler(Json(input): Json<SchedulingInput>) -> Json<SchedulingOutput> {
    Json(solver::solve(&input))
}

async fn verify_handler(Json(request): Json<VerifyRequest>) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        conflicts: verify(&request.entries),
    })
}

async fn force_assign_handler(Json(request): Json<ForceAssignRequest>) -> Json<Timetable> {
    let mut timetable = request.timetable;
    let applied = timetable.force_assign(&request.conflict, request.placement, &request.rooms);
    if applied.needs_verification {
        timetable.reverify();
    }
    Json(timetable)
}

async fn reassign_handler(
    Json(request): Json<ReassignRequest>,
) -> Result<Json<Timetable>, (StatusCode, String)> {
    let mode = if request.forced {
        Mode::Forced
    } else {
        Mode::Checked
    };
    let mut timetable = request.timetable;

    match timetable.reassign(
        &request.conflict,
        request.entry_index,
        request.change,
        mode,
        &request.rooms,
    ) {
        Ok(applied) => {
            if applied.needs_verification {
                timetable.reverify();
            }
            Ok(Json(timetable))
        }
        Err(e @ ReconcileError::Rejected(_)) => Err((StatusCode::CONFLICT, e.to_string())),
        Err(e) => Err((StatusCode::UNPROCESSABLE_ENTITY, e.to_string())),
    }
}

pub fn router() -> Router {
    Router::new()
        .route("/v1/schedule/solve", post(solve_handler))
        .route("/v1/schedule/verify", post(verify_handler))
        .route("/v1/schedule/force-assign", post(force_assign_handler))
        .route("/v1/schedule/reassign", post(reassign_handler))
}

pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, router()).await
}
