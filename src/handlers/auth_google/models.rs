use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct GoogleCallbackParams {
    pub code:  Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,              // set when the user declined
}
