use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Json struct for deployment-independent settings
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    pub database_file: Option<PathBuf>,
    pub web_port: Option<u16>,
}
