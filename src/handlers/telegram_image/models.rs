use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct AvatarParams {
    pub id:  Option<String>,
    pub url: Option<String>,                // widget photo_url, tier 2
}
