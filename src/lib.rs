pub mod config;
pub mod duration;
pub mod errors;
pub mod export;
pub mod keywords;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod quota;
pub mod trends;
pub mod tui;
pub mod youtube;
