// handlers/mod.rs - HTTP handlers
//
// h5p: content endpoints mounted under /api/h5p

pub mod h5p;
