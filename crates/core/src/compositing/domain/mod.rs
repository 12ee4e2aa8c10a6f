pub mod shot_compositor;
pub mod strip_layout;
