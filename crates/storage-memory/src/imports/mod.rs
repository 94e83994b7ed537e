mod repository;

pub use repository::ImportBatchRepository;
