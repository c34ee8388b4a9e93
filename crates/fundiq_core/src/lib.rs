pub mod documents;
pub mod domain;
pub mod export;
pub mod ingestion;
pub mod ports;
pub mod queue;
pub mod review;

#[cfg(test)]
mod testing;

pub use documents::{DocumentListView, ListState};
pub use domain::{
    Anomaly, AnomalySeverity, Document, DocumentStatus, ExtractedRow, FileType, IncomingFile, NewDocument, ParseOutcome,
    ParseRequest, StatusUpdate, StoredObject, UploadProgress, UploadStatus, UserContext,
};
pub use export::{Export, ExportFormat};
pub use ingestion::{
    CloudStorageIngestion, DocumentIngestion, IngestionMode, LocalFirstIngestion, UploadError,
};
pub use ports::{DocumentStore, ObjectStorage, ParsingGateway, PortError, PortResult};
pub use queue::{BatchObserver, BatchSummary, ProgressBoard, QueueSettings, UploadQueue};
pub use review::{DataReview, ReviewContent, SortDirection, ViewMode};
