pub mod equipment;
pub mod forecast;
pub mod home;
pub mod task;
pub mod template;

pub use equipment::*;
pub use forecast::*;
pub use home::*;
pub use task::*;
pub use template::*;
