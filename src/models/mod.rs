pub mod document;
pub mod requests;

pub use document::{Document, DocumentId, DocumentStatus, FileType, StudentId};
pub use requests::{
    DeleteReceipt, DownloadUrlRequest, ErrorBody, NewDocument, PresignedDownload,
    PresignedUpload, UploadUrlRequest,
};
