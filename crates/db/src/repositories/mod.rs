pub mod book_repo;
pub mod user_repo;

pub use book_repo::BookRepo;
pub use user_repo::UserRepo;
