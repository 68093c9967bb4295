// Data module
// CSV loading of pedigrees and identifier mappings

pub mod idmap;
pub mod io;

pub use idmap::IdMapping;
pub use io::LoadOptions;
