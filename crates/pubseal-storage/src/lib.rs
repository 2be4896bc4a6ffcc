//! pubseal-storage: content-addressed ciphertext store over OpenDAL
//!
//! The service only ever sees [`ContentStore`]; the OpenDAL operator behind
//! it may be S3 (SeaweedFS, MinIO, AWS), a local directory, or memory.

pub mod error;
pub mod health;
pub mod operator;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use health::{check_health, is_healthy};
pub use operator::{build_from_core_config, build_operator, S3Credentials};
pub use store::{address_for, ContentStore, ObjectContentStore};
