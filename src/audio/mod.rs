//! Live audio: capture sources, the pitch/loudness estimator, and the
//! channel that carries estimates to the render thread.

mod capture;
mod channel;
mod estimator;
mod history;

pub use capture::{list_input_devices, read_wav_mono, AudioCapture, CaptureSource, EstimatorWorker};
pub use channel::{latest_channel, EstimateReceiver, EstimateSender, LatestReceiver, LatestSender};
pub use estimator::{PitchEstimate, PitchEstimator};
pub use history::EstimateHistory;
