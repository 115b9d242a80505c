pub mod fetch;
pub mod inspect;
pub mod links;
pub mod remove;
pub mod status;
pub mod upload;
