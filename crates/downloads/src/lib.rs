pub mod pipeline;
pub mod streaming;
pub mod ytdlp;

pub use pipeline::{
    AudioFetcher, DownloadPipeline, DownloadProgress, ProgressReporter, IDLE_PROGRESS,
    STARTING_PROGRESS,
};
pub use streaming::StreamingDownloader;
pub use ytdlp::YtDlpFetcher;
