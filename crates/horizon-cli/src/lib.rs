//! Library side of the `icu-horizon` binary.

pub mod logging;
pub mod pipeline;
