pub use crate::validation::UserCheck as ValidateUserReq;

// the sync-user success body, passed through as-is
pub type ValidateUserResp = serde_json::Value;
