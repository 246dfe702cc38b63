use crate::session::SessionUser;
use serde::{Deserialize, Serialize};

// what every successful sign-in returns
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user:  SessionUser,
}
