mod deploy;
mod deps;
mod destroy;
mod render;

pub use deploy::cmd_deploy;
pub use deps::cmd_deps;
pub use destroy::cmd_destroy;
pub use render::cmd_render;
