pub mod channel_codec;
pub mod contrast;
pub mod filters;
pub mod intensity;
pub mod lame;
pub mod operator;
pub mod preprocess;
pub mod raster;
pub mod utils;
