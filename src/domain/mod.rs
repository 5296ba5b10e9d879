pub mod invitation;
pub mod guest;
pub mod payment;
pub mod gift;
pub mod wish;

pub use invitation::*;
pub use guest::*;
pub use payment::*;
pub use gift::*;
pub use wish::*;
