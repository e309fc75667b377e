use std::convert::Infallible;

use serde::{Deserialize, Serialize};
use warp::http::StatusCode;

use crate::core::registrant::{NewRegistrant, Status};
use crate::core::session::SessionRequest;
use crate::error::Error;
use crate::{send_message, Directory};

/// A Json struct addressing a single registrant
#[derive(Serialize, Deserialize, Debug)]
pub struct Id {
    pub id: i64,
}

/// A Json struct for a status transition
#[derive(Serialize, Deserialize, Debug)]
pub struct SetStatus {
    pub id: i64,
    pub status: Status,
}

/// A Json struct for a remarks edit; omitted or null remarks clear them
#[derive(Serialize, Deserialize, Debug)]
pub struct SetRemarks {
    pub id: i64,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// A Json struct for a delete request. `confirmed` must be set or the
/// request is rejected before it reaches the store.
#[derive(Serialize, Deserialize, Debug)]
pub struct DeleteRegistrant {
    pub id: i64,
    #[serde(default)]
    pub confirmed: bool,
}

/// A Json struct applying one check-in state to the whole selection
#[derive(Serialize, Deserialize, Debug)]
pub struct BatchCheckIn {
    pub checked_in: bool,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ExportQuery {
    #[serde(default)]
    pub selection_only: bool,
}

fn status_for(error: &anyhow::Error) -> StatusCode {
    match error.downcast_ref::<Error>() {
        Some(Error::DuplicateEmail(_)) => StatusCode::CONFLICT,
        Some(Error::RegistrantNotFound(_)) => StatusCode::NOT_FOUND,
        Some(
            Error::EmptySelection
            | Error::UnconfirmedDelete
            | Error::Validation(_)
            | Error::UnknownColumn(_),
        ) => StatusCode::BAD_REQUEST,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn to_http_none_or_error(result: anyhow::Result<()>) -> Result<impl warp::Reply, Infallible> {
    match result {
        Ok(_) => Ok(warp::reply::with_status(
            "Success".to_string(),
            StatusCode::OK,
        )),
        Err(e) => {
            log::warn!("{}", e);
            Ok(warp::reply::with_status(e.to_string(), status_for(&e)))
        }
    }
}

pub fn to_http_output<T: Serialize>(
    result: anyhow::Result<T>,
) -> Result<impl warp::Reply, Infallible> {
    match result {
        Ok(data) => match serde_json::to_string::<T>(&data) {
            Ok(body) => Ok(warp::reply::with_status(body, StatusCode::OK)),
            Err(e) => Ok(warp::reply::with_status(
                e.to_string(),
                StatusCode::INTERNAL_SERVER_ERROR,
            )),
        },
        Err(e) => {
            log::warn!("{}", e);
            Ok(warp::reply::with_status(e.to_string(), status_for(&e)))
        }
    }
}

pub async fn submit_registration(
    entry: NewRegistrant,
    directory: Directory,
) -> Result<impl warp::Reply, Infallible> {
    to_http_output(send_message!(
        directory.session_actor,
        SessionRequest,
        Submit,
        entry
    ))
}

pub async fn update_status(
    request: SetStatus,
    directory: Directory,
) -> Result<impl warp::Reply, Infallible> {
    to_http_none_or_error(send_message!(
        directory.session_actor,
        SessionRequest,
        UpdateStatus,
        request.id,
        request.status
    ))
}

pub async fn toggle_check_in(
    request: Id,
    directory: Directory,
) -> Result<impl warp::Reply, Infallible> {
    to_http_none_or_error(send_message!(
        directory.session_actor,
        SessionRequest,
        ToggleCheckIn,
        request.id
    ))
}

pub async fn update_remarks(
    request: SetRemarks,
    directory: Directory,
) -> Result<impl warp::Reply, Infallible> {
    to_http_none_or_error(send_message!(
        directory.session_actor,
        SessionRequest,
        UpdateRemarks,
        request.id,
        request.remarks
    ))
}

pub async fn delete_registrant(
    request: DeleteRegistrant,
    directory: Directory,
) -> Result<impl warp::Reply, Infallible> {
    to_http_none_or_error(send_message!(
        directory.session_actor,
        SessionRequest,
        Delete,
        request.id,
        request.confirmed
    ))
}

pub async fn batch_check_in(
    request: BatchCheckIn,
    directory: Directory,
) -> Result<impl warp::Reply, Infallible> {
    to_http_none_or_error(send_message!(
        directory.session_actor,
        SessionRequest,
        BatchCheckIn,
        request.checked_in
    ))
}

/// Serves the CSV export as a file attachment named for today's date.
pub async fn export_csv(
    query: ExportQuery,
    directory: Directory,
) -> Result<impl warp::Reply, Infallible> {
    let result = send_message!(
        directory.session_actor,
        SessionRequest,
        Export,
        query.selection_only
    );

    let response = match result {
        Ok((filename, content)) => warp::http::Response::builder()
            .header("Content-Type", "text/csv; charset=utf-8")
            .header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", filename),
            )
            .body(content),
        Err(e) => {
            log::warn!("CSV export failed: {}", e);
            warp::http::Response::builder()
                .status(status_for(&e))
                .body(e.to_string())
        }
    };

    Ok(response.unwrap_or_else(|e| {
        warp::http::Response::new(format!("Failed to build response: {}", e))
    }))
}
