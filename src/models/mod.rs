pub mod user;
pub mod advertisement;
pub mod bid;
pub mod contract;
pub mod review;

pub use user::*;
pub use advertisement::*;
pub use bid::*;
pub use contract::*;
pub use review::*;
