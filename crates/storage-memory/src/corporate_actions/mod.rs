mod repository;

pub use repository::CorporateActionRepository;
