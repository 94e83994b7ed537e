mod repository;

pub use repository::PortfolioRepository;
