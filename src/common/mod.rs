pub mod capture_request;
pub mod frame;
pub mod landmark;
pub mod rounding;

pub use capture_request::CaptureRequest;
pub use frame::{Frame, FrameRecycler, Rotation};
pub use landmark::{GeoPoint, LandmarkCandidate, LandmarkResult};
pub use rounding::{format_coordinate, round_half_ceiling};
