mod repository;

pub use repository::EventStore;
