pub mod categories;
pub mod credentials;
pub mod shares;
pub mod users;
