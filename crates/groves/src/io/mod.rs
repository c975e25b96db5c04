//! Persistence: the binary model stream, the fixed-width array codec and the
//! text reports written by analysis runs.

mod array;
mod model_stream;
pub mod report;

pub use array::{read_array_into, write_array};
pub use model_stream::{
    read_block, write_block, ModelError, ModelHeader, ModelReader, ModelWriter, FRAME_SIZE, HEADER_SIZE,
};
