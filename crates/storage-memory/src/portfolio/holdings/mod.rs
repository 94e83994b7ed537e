mod repository;

pub use repository::HoldingsRepository;
