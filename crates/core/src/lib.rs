pub mod analysis;
pub mod detection;
pub mod export;
pub mod identity;
pub mod media;
pub mod pipeline;
pub mod shared;
