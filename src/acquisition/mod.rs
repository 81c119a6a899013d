//! Sensor data acquisition module
//!
//! Handles the glove link (line framing with bounded reads) and turning each
//! line into a validated feature vector.

pub mod frame_parser;
pub mod link;
pub mod threaded;

pub use frame_parser::{parse_frame, FrameError};
pub use link::{open_link, LineReader, LineSource, LinkEndpoint, LinkError, LinkEvent, LinkStream};
pub use threaded::ThreadedReader;
