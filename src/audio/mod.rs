pub mod buffer;
pub mod click;
pub mod device;
pub mod output;
pub mod wav;

pub use buffer::SampleBuffer;
pub use output::ClickOutput;
pub use wav::{decode_wav, encode_to_wav, process_recording, CodecError, ProcessedRecording};
