pub mod db;
pub mod export;
pub mod registrant;
pub mod session;
pub mod settings;
pub mod stats;
pub mod store;
pub mod table;
