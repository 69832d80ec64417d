pub mod client;
pub mod error;
mod http;
pub mod traits;

pub use client::HttpRemote;
pub use error::NetworkError;
pub use traits::{
    ExpenseSubmission, ReceiptUpload, RemoteSubmitter, SyncReport, TimeEntrySubmission,
    UploadCompletion, UploadRequest, UploadTarget,
};
