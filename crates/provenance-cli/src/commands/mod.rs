//! Command implementations.

mod check;
mod history;
mod init;
mod recent;
mod upload;
mod verify;

pub use check::CheckCommand;
pub use history::HistoryCommand;
pub use init::InitCommand;
pub use recent::RecentCommand;
pub use upload::UploadCommand;
pub use verify::VerifyCommand;
