pub mod applicants;
pub mod assignment;
pub mod core;
pub mod personnel;
pub mod poscodes;
pub mod stats;
pub mod transactions;
pub mod vacancies;
