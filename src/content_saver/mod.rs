//! Saving archives produced by the command line front end

// Module declarations
mod compression;
mod file_name;

// Re-export public API from compression module
pub use compression::{gzip_bytes, output_path, save_output};

// Re-export public API from file_name module
pub use file_name::{archive_file_name, resolve_output_path};
