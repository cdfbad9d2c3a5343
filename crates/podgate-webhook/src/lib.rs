pub mod admission;
pub mod server;
pub mod validator;

pub use admission::{AdmissionReview, Pod};
pub use server::{router, AppState, TxRequest};
pub use validator::PodValidator;
