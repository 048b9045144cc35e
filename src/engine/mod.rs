// Engine module - simulation, pointer tracking and the two render adapters
// The frame driver in driver.rs ties them together for a host window

pub mod camera;
pub mod canvas;
pub mod components;
pub mod config;
pub mod driver;
pub mod egui_canvas;
pub mod fallback;
pub mod field;
pub mod gpu;
pub mod input;
pub mod integrate;
pub mod mesh;
pub mod pointer;
pub mod renderer;
pub mod scene;

// Re-export commonly used items
pub use components::*;
pub use config::{ConfigError, FieldBehavior, RendererKind, SimulationConfig};
pub use driver::{FrameDriver, FrameScheduler, FrameToken, HostContainer, Mount};
pub use field::{Bounds, Field};
pub use renderer::{FieldRenderer, FrameInfo, RenderError};
