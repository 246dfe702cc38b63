use crate::catalog::Category;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct GamesParams {
    #[serde(default)]
    pub category: Category,
    pub q:        Option<String>,
}
