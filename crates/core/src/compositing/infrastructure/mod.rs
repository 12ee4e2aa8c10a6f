pub mod strip_compositor;
