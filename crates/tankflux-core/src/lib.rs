pub mod alignment;
pub mod channels;
pub mod cleaning;
pub mod config;
pub mod energy;
pub mod error;
pub mod ingest;
pub mod parameters;
pub mod pipeline;
pub mod report;
pub mod smoothing;

pub use channels::{ChannelKind, RawChannels, TimeSeries};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use parameters::{ParameterSource, PhysicalParameters, ResolvedParameters};
pub use pipeline::{EnergyBalancePipeline, FilterVariant, PipelineOutput, PipelineStage};
pub use report::{ParquetPublisher, PlotFormat, Publisher};
