use std::convert::Infallible;

use warp::{reject::Rejection, Filter};

use crate::core::session::{SessionRequest, ViewCommand};
use crate::{send_message, Directory};

use super::handlers::{
    self, batch_check_in, delete_registrant, export_csv, submit_registration, toggle_check_in,
    update_remarks, update_status,
};

pub fn with_directory(
    directory: Directory,
) -> impl Filter<Extract = (Directory,), Error = Infallible> + Clone {
    warp::any().map(move || directory.clone())
}

/// The public registration surface: form submission only.
fn registration_filters(
    directory: Directory,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    warp::path!("registration")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_directory(directory))
        .and_then(submit_registration)
}

/// Per-row admin mutations.
fn registrant_filters(
    directory: Directory,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let set_status = warp::path!("registrant" / "status")
        .and(warp::put())
        .and(warp::body::json())
        .and(with_directory(directory.clone()))
        .and_then(update_status);

    let check_in = warp::path!("registrant" / "check-in")
        .and(warp::put())
        .and(warp::body::json())
        .and(with_directory(directory.clone()))
        .and_then(toggle_check_in);

    let remarks = warp::path!("registrant" / "remarks")
        .and(warp::put())
        .and(warp::body::json())
        .and(with_directory(directory.clone()))
        .and_then(update_remarks);

    let delete = warp::path!("registrant")
        .and(warp::delete())
        .and(warp::body::json())
        .and(with_directory(directory.clone()))
        .and_then(delete_registrant);

    let batch = warp::path!("registrants" / "check-in")
        .and(warp::put())
        .and(warp::body::json())
        .and(with_directory(directory))
        .and_then(batch_check_in);

    set_status.or(check_in).or(remarks).or(delete).or(batch)
}

/// The table view: current page state plus declarative view commands.
fn view_filters(
    directory: Directory,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let get_view = warp::path!("view")
        .and(warp::get())
        .and(with_directory(directory.clone()))
        .and_then(|directory: Directory| async move {
            handlers::to_http_output(send_message!(
                directory.session_actor,
                SessionRequest,
                GetView
            ))
        });

    let apply_command = warp::path!("view")
        .and(warp::put())
        .and(warp::body::json())
        .and(with_directory(directory))
        .and_then(|command: ViewCommand, directory: Directory| async move {
            handlers::to_http_output(send_message!(
                directory.session_actor,
                SessionRequest,
                View,
                command
            ))
        });

    get_view.or(apply_command)
}

pub fn api_filters(
    directory: Directory,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let registrants = warp::path!("registrants")
        .and(warp::get())
        .and(with_directory(directory.clone()))
        .and_then(|directory: Directory| async move {
            handlers::to_http_output(send_message!(
                directory.session_actor,
                SessionRequest,
                GetSnapshot
            ))
        });

    let stats = warp::path!("stats")
        .and(warp::get())
        .and(with_directory(directory.clone()))
        .and_then(|directory: Directory| async move {
            handlers::to_http_output(send_message!(
                directory.session_actor,
                SessionRequest,
                GetStats
            ))
        });

    let refresh = warp::path!("refresh")
        .and(warp::post())
        .and(with_directory(directory.clone()))
        .and_then(|directory: Directory| async move {
            handlers::to_http_none_or_error(send_message!(
                directory.session_actor,
                SessionRequest,
                Refresh
            ))
        });

    let export = warp::path!("export")
        .and(warp::get())
        .and(warp::query::<handlers::ExportQuery>())
        .and(with_directory(directory.clone()))
        .and_then(export_csv);

    registrants
        .or(stats)
        .or(refresh)
        .or(export)
        .or(registration_filters(directory.clone()))
        .or(registrant_filters(directory.clone()))
        .or(view_filters(directory))
}
