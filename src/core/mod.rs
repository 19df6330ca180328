pub mod artwork;
pub mod matcher;
pub mod normalize;
pub mod similarity;
