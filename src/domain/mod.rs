pub mod member;
pub mod activity;
pub mod membership;
pub mod payment;
pub mod renewal;

pub use member::*;
pub use activity::*;
pub use membership::*;
pub use payment::*;
pub use renewal::*;
