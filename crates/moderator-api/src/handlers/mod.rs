pub mod analytics;
pub mod image_moderation;
pub mod summary;
pub mod text_moderation;
