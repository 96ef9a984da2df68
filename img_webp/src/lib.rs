pub mod aggregator;
pub mod codec;
pub mod fetch;
pub mod job;
pub mod output;
pub mod pool;

pub use aggregator::{ErrorLog, OutcomeAggregator};
pub use codec::{encode_settings, CodecError, DecodedImage, EncodeSettings, ImageCodec, WebpCodec};
pub use fetch::{FetchError, FetchResponse, Fetcher, HttpFetcher};
pub use job::{collect_jobs, parse_url_list, ConversionOptions, Job};
pub use output::{create_output_folder, downloads_dir, error_log_path, ERROR_LOG_NAME};
pub use pool::{effective_worker_count, Summary, WorkerPool, MAX_WORKERS, OUTPUT_EXTENSION};
