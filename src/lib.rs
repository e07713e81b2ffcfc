pub mod capture;
pub mod compositor;
pub mod config;
pub mod countdown;
pub mod error;
pub mod events;
pub mod export;
pub mod navigation;
pub mod photo;
pub mod polls;
pub mod session;
pub mod store;
pub mod surface;
pub mod template;
pub mod text;
pub mod processing {
    pub mod color;
    pub mod fixed_image;
    pub mod layout;
}
pub mod tasks {
    pub mod board;
    pub mod loader;
}

pub use error::{Error, Result};
