pub mod identity;
pub mod scanner;
pub mod util;

pub use identity::{HASH_EXCLUDED_EXTENSIONS, RomIdentity, sha1_file};
pub use scanner::{extension_set, scan_rom_files};
