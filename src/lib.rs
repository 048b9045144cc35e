// Pointer-reactive particle fields rendered through wgpu

pub mod engine;
