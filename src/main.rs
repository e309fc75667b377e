use std::{fs::read_to_string, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, oneshot};

use crate::core::db::RegistrantDb;
use crate::core::session::{run_session_actor, AdminSession, SessionActor};
use crate::core::settings::Settings;
use crate::core::store::RegistrantStore;

mod core;
mod error;
mod web;

/// Reply-to handle carried inside an actor request; the actor answers
/// exactly once through it.
pub struct Rto<T> {
    tx: oneshot::Sender<anyhow::Result<T>>,
}

impl<T> Rto<T> {
    pub fn channel() -> (Self, oneshot::Receiver<anyhow::Result<T>>) {
        let (tx, rx) = oneshot::channel();
        (Rto { tx }, rx)
    }

    pub fn reply(self, result: anyhow::Result<T>) {
        let _ = self.tx.send(result);
    }
}

/// Cloneable handle to an actor's request queue.
pub struct ActorRef<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> ActorRef<T> {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ActorRef { tx }, rx)
    }

    pub fn send(&self, message: T) {
        if self.tx.send(message).is_err() {
            log::error!("Actor request queue closed");
        }
    }
}

impl<T> Clone for ActorRef<T> {
    fn clone(&self) -> Self {
        ActorRef {
            tx: self.tx.clone(),
        }
    }
}

/// Sends a request to an actor and awaits its reply.
#[macro_export]
macro_rules! send_message {
    ($actor:expr, $request:ident, $variant:ident $(, $arg:expr)*) => {{
        let (rto, rx) = $crate::Rto::channel();
        $actor.send($request::$variant($($arg,)* rto));
        match rx.await {
            Ok(reply) => reply,
            Err(_) => Err(anyhow::anyhow!("Actor dropped the request")),
        }
    }};
}

/// Handles to the long-running actors.
#[derive(Clone)]
pub struct Directory {
    pub session_actor: SessionActor,
}

#[derive(Parser, Debug)]
#[command(name = "regdesk")]
#[command(about = "An event registration and check-in management service.", long_about = None)]
struct Args {
    /// Location of a JSON settings file.
    #[arg(short, long)]
    settings_file: Option<PathBuf>,

    #[command(subcommand)]
    command: RunType,
}

#[derive(Subcommand, Debug)]
enum RunType {
    /// Create and initialize a new registrant database.
    Init {
        /// The output path of the database file.
        database_file: PathBuf,
    },

    /// Serve the registration API and the admin console backend.
    Serve {
        /// Location of the registrant database. Overrides the settings
        /// file; created if it does not exist.
        #[arg(short, long)]
        database_file: Option<PathBuf>,
    },
}

fn load_settings(path: &Option<PathBuf>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => Ok(serde_json::from_str::<Settings>(&read_to_string(path)?)?),
        None => Ok(Settings::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let settings = load_settings(&args.settings_file)?;

    match args.command {
        RunType::Init { database_file } => {
            RegistrantDb::init(&database_file).await?;
            log::info!("Registrant database created at {}", database_file.display());
            Ok(())
        }
        RunType::Serve { database_file } => {
            let database_file = database_file
                .or_else(|| settings.database_file.clone())
                .unwrap_or_else(|| PathBuf::from("registrants.db"));

            let store: Arc<dyn RegistrantStore> =
                Arc::new(RegistrantDb::init(&database_file).await?);

            let mut session = AdminSession::new(store);
            if let Err(e) = session.refresh().await {
                // The admin console renders the failure with a retry
                // control; the server still comes up.
                log::warn!("Initial snapshot fetch failed: {}", e);
            }

            let (session_actor, session_rx) = ActorRef::channel();
            tokio::spawn(run_session_actor(session, session_rx));

            log::info!("regdesk initialized");

            web::run_http_server(
                Directory { session_actor },
                settings,
            )
            .await
        }
    }
}
