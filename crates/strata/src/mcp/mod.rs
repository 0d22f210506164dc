pub mod handler;

pub use handler::StrataToolHandler;
