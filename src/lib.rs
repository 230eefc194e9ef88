pub mod audio;
pub mod db;
pub mod history;
pub mod intake;
pub mod report;
pub mod settings;
pub mod shell;
