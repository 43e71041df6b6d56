pub mod canvas;
pub mod config;
pub mod error;
pub mod events;
pub mod playback;
pub mod session;
pub mod mosaic {
    pub mod record;
    pub mod sampler;
    pub mod shuffle;
}
pub mod processing {
    pub mod blur;
    pub mod color;
    pub mod layout;
}
pub mod tasks {
    pub mod engine;
    pub mod files;
    pub mod input;
    pub mod loader;
}
