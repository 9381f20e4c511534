//! Transcode pipeline: decoder chunks → channel mixer → resampler →
//! bit-depth converter → sink.
//!
//! Processing inside one run is strictly sequential. The decoder's bounded
//! queues keep the number of buffers in flight small.

pub mod orchestrator;
pub mod sink;
pub mod state;
pub mod transform;

pub use orchestrator::{PipelineConfig, TranscodePipeline, TranscodeReport, TrimRange};
pub use sink::{CollectorSink, ContainerSink, PcmSink, WavFileSink};
pub use state::PipelineState;
pub use transform::ChunkTransformer;
