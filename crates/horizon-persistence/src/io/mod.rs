mod hash;
mod load;
mod save;

pub use hash::{compute_file_hash, fingerprint_sources, verify_file_hash};
pub use load::load_bundle;
pub use save::save_bundle;
